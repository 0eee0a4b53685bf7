use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid policy engine URL: {0}")]
    InvalidUrl(String),

    #[error("Policy engine request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Policy engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Policy engine answered {got} decisions for {expected} requests")]
    Misaligned { expected: usize, got: usize },
}
