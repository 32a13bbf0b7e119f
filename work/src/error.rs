use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("no nonce in the 32-bit space meets difficulty {difficulty}")]
    Exhausted { difficulty: String },

    #[error("difficulty {declared} does not match expected {expected}")]
    WrongDifficulty { declared: String, expected: String },
}
