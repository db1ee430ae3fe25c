/// Crate-level error type for the stemscope analysis library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter `{name}`: got {value}, {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Audio data is empty when a non-empty signal was required.
    #[error("audio data is empty")]
    EmptyAudio,

    /// A required dimension is zero or invalid.
    #[error("invalid size for `{name}`: {value} ({reason})")]
    InvalidSize {
        name: &'static str,
        value: usize,
        reason: &'static str,
    },

    /// Test-metrics map text did not match the restricted literal grammar.
    #[error("malformed metrics map at byte {offset}: {reason}")]
    MetricsSyntax { offset: usize, reason: &'static str },

    /// Chart rendering failed.
    #[error("chart rendering failed: {0}")]
    Chart(String),

    /// Audio I/O errors.
    #[error(transparent)]
    Audio(#[from] crate::io::AudioError),

    /// File I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for stemscope operations.
pub type Result<T> = std::result::Result<T, Error>;
