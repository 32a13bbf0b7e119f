//! Network identifier.

use crate::params::ConsensusParams;
use serde::{Deserialize, Serialize};

/// Which rule set a node runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    #[default]
    Main,
    /// Local development network with trivial proof of work.
    Regtest,
}

impl NetworkId {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Main => 3006,
            Self::Regtest => 13006,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Regtest => "regtest",
        }
    }

    pub fn params(&self) -> ConsensusParams {
        match self {
            Self::Main => ConsensusParams::main(),
            Self::Regtest => ConsensusParams::regtest(),
        }
    }
}
