//! Block hash type.

use crate::error::DenaroError;
use crate::hash::hash_newtype;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

hash_newtype!(BlockHash);
