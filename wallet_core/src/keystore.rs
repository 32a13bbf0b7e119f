//! The wallet file: a single JSON record listing hex private keys.
//!
//! ```json
//! { "private_keys": ["<64 hex chars>", ...] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use denaro_crypto::{derive_address, generate_keypair, keypair_from_private, private_key_from_hex};
use denaro_types::{Address, KeyPair};

use crate::error::WalletError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WalletFile {
    #[serde(default)]
    pub private_keys: Vec<String>,
}

impl WalletFile {
    /// Load the wallet file. A missing file is an empty wallet.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| WalletError::WalletFile(format!("invalid wallet JSON: {e}")))
    }

    /// Write through a temporary file so a crash never leaves half a wallet.
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| WalletError::WalletFile(format!("JSON serialization failed: {e}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Decode every stored key.
    pub fn keys(&self) -> Result<Vec<KeyPair>, WalletError> {
        self.private_keys
            .iter()
            .map(|hex| {
                private_key_from_hex(hex.trim())
                    .map(keypair_from_private)
                    .map_err(|e| WalletError::Key(e.to_string()))
            })
            .collect()
    }

    /// Append a fresh key and return its address.
    pub fn add_new_key(&mut self) -> Address {
        let keys = generate_keypair();
        self.private_keys.push(keys.private.to_hex());
        derive_address(&keys.public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = WalletFile::load(&dir.path().join("wallet.json")).unwrap();
        assert!(wallet.private_keys.is_empty());
    }

    #[test]
    fn keys_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let mut wallet = WalletFile::default();
        let first = wallet.add_new_key();
        let second = wallet.add_new_key();
        wallet.save(&path).unwrap();

        let loaded = WalletFile::load(&path).unwrap();
        let addresses: Vec<Address> = loaded.keys().unwrap().iter().map(|k| derive_address(&k.public)).collect();
        assert_eq!(addresses, vec![first, second]);
    }

    #[test]
    fn file_is_a_plain_key_list() {
        let json = r#"{"private_keys": ["0101010101010101010101010101010101010101010101010101010101010101"]}"#;
        let wallet: WalletFile = serde_json::from_str(json).unwrap();
        assert_eq!(wallet.keys().unwrap().len(), 1);
    }

    #[test]
    fn bad_key_is_reported() {
        let wallet = WalletFile {
            private_keys: vec!["nothex".into()],
        };
        assert!(matches!(wallet.keys(), Err(WalletError::Key(_))));
    }
}
