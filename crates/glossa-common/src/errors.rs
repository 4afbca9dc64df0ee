#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Failure reported by the embedded overlay script. The message is an
    /// opaque string; the script does not emit structured codes.
    #[error("{0}")]
    Script(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("bridge response timed out")]
    Timeout,

    #[error("bridge is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum DrmError {
    #[error("cancelled")]
    Cancelled,

    #[error("drm service error: {0}")]
    Vendor(String),

    #[error("unsupported license file: {0}")]
    Unsupported(String),
}

impl DrmError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DrmError::Cancelled)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GlossaError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Drm(#[from] DrmError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
