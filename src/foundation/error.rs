use std::path::Path;

/// Convenience result type used across the converter.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error taxonomy for a conversion request.
///
/// Each variant names the stage that failed, so the first error of a request is enough to tell
/// the caller where the pipeline stopped.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// Missing or unreadable input, unwritable output or working directory.
    #[error("io error: {context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The input is not a compressed animation object (bad framing, inflate or JSON failure,
    /// non-object payload, missing or invalid header fields).
    #[error("format error: {0}")]
    Format(String),

    /// The rendering engine failed to launch, load the page, initialize the player or capture.
    #[error("render error: {0}")]
    Render(String),

    /// No frames were available to assemble.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// An external encoder failed.
    #[error("transcode error: {0}")]
    Transcode(String),

    /// Invalid caller-provided options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConvertError {
    /// Build a [`ConvertError::Io`] value.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Build a [`ConvertError::Io`] value describing an operation on `path`.
    pub fn io_at(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("{action} '{}'", path.display()), source)
    }

    /// Build a [`ConvertError::Format`] value.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Build a [`ConvertError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ConvertError::EmptyInput`] value.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Build a [`ConvertError::Transcode`] value.
    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode(msg.into())
    }

    /// Build a [`ConvertError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True when the error came from the input not being a valid animation payload.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
