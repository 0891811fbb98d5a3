use thiserror::Error;

/// Failures reported by the browser side of the pipeline.
///
/// `SessionClosed` and `Timeout` end the current run. `Unreadable` only ever
/// concerns a single container and is swallowed by the extractors.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Browser window or page went away mid-run
    #[error("Browser session closed: {0}")]
    SessionClosed(String),

    /// Navigation or render settle timed out
    #[error("Navigation timeout: {0}")]
    Timeout(String),

    /// One container's text or links could not be read
    #[error("Container unreadable: {0}")]
    Unreadable(String),
}

impl CaptureError {
    /// Whether the error ends the whole run rather than one container.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CaptureError::Unreadable(_))
    }
}
