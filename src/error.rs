use thiserror::Error;

/// Everything that can stop a turn. None of these is fatal: the report state
/// is left exactly as it was before the turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("extraction service call failed: {0}")]
    NetworkFailure(String),

    #[error("malformed extraction: {0}")]
    MalformedExtraction(String),

    #[error("image encoding failed: {0}")]
    ImageEncodingFailure(String),

    #[error("turn {pending} is still waiting for its extraction")]
    TurnInFlight { pending: u64 },

    #[error("discarded stale response for turn {turn}")]
    StaleResponse { turn: u64 },

    #[error("unknown workplace: {0}")]
    UnknownWorkplace(String),
}

impl TurnError {
    /// Only network failures are worth resubmitting with the same transcript.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TurnError::NetworkFailure(_))
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        TurnError::MalformedExtraction(msg.into())
    }
}

impl From<reqwest::Error> for TurnError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TurnError::NetworkFailure(format!("timed out: {e}"))
        } else {
            TurnError::NetworkFailure(e.to_string())
        }
    }
}
