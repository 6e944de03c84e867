//! Error taxonomy for the probe pipeline.

/// All errors a probe stage can raise.
///
/// Whether an error is fatal depends on where it happens, not on its kind:
/// the orchestrator absorbs per-asset failures and only propagates the ones
/// raised while resolving the theme or listing its assets.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Probe cancelled")]
    Cancelled,
}

impl ProbeError {
    /// HTTP status the excluded web layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ProbeError::NotFound(_) => 404,
            ProbeError::Cancelled => 504,
            ProbeError::Parse(_) | ProbeError::RemoteUnavailable(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound(_))
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(e: serde_json::Error) -> Self {
        ProbeError::Parse(e.to_string())
    }
}

/// Convenience result type.
pub type ProbeResult<T> = Result<T, ProbeError>;
