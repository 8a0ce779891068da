use thiserror::Error;

/// Failures surfaced by an [`ImageSynthesizer`](crate::synth::ImageSynthesizer).
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("invalid model service URL: {0}")]
    InvalidUrl(String),
    #[error("model service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model service returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("model service reported a failure: {0}")]
    Failed(String),
    #[error("timed out waiting for the image after {0} polls")]
    Timeout(u32),
    #[error("model service finished without producing an image")]
    MissingOutput,
    #[error("failed to decode generated image: {0}")]
    Decode(String),
    #[error("generation cancelled")]
    Cancelled,
}

impl SynthesisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SynthesisError::Cancelled)
    }
}
