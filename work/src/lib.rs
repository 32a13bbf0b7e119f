//! Proof of work for denaro blocks.
//!
//! A block's proof hash is the SHA-256 of its 106-byte content. Difficulty
//! `w.f` asks for `w` leading zero hex digits followed by one digit below
//! `ceil(16 × (1 − f/10))`. The target is retargeted every
//! `retarget_interval` blocks from observed block times.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod validator;

pub use difficulty::{expected_work, retarget, ChainSample, DifficultyAdjuster};
pub use error::WorkError;
pub use generator::WorkGenerator;
pub use validator::{meets_difficulty, verify_pow};
