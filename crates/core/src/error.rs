/// Result alias that carries the custom [`ShowError`] type.
pub type Result<T> = std::result::Result<T, ShowError>;

/// Common error type for the core crate.
///
/// Playback itself never fails: missing sounds and malformed events are logged
/// and tolerated. Errors only surface from the loading and export entry points.
#[derive(Debug, thiserror::Error)]
pub enum ShowError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// A configuration or argument value that cannot be used.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Program or configuration JSON that is not structurally valid.
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    /// Sound file that could not be decoded.
    #[error("audio decode failed: {0}")]
    Audio(#[from] hound::Error),
    /// Frame export failure.
    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),
}

impl ShowError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for ShowError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ShowError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
