//! Cryptographic primitives for the denaro node.
//!
//! - **SHA-256** for transaction hashes, block hashes and merkle nodes
//! - **Ed25519** for input signatures
//! - **Blake2b** for the address checksum
//! - Address derivation with the `dnr_` prefix and base32 encoding

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{decode_address, derive_address, validate_address};
pub use hash::{blake2b_256, hash_block, hash_transaction, sha256, sha256_pair};
pub use keys::{
    generate_keypair, keypair_from_private, keypair_from_seed, private_key_from_hex,
    public_from_private,
};
pub use sign::{sign_message, verify_signature};
