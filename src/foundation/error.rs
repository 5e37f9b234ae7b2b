/// Convenience result type used across ffrender.
pub type FfrenderResult<T> = Result<T, FfrenderError>;

/// Top-level error taxonomy used by all rendering APIs.
///
/// Every variant is terminal for a single render call; the only recovery
/// behavior built into the crate is delegation to another registered
/// renderer before an [`FfrenderError::UnsupportedInput`] is surfaced.
#[derive(thiserror::Error, Debug)]
pub enum FfrenderError {
    /// Malformed composition spec or request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The sanitizer rejected a color or filter value that could break out
    /// of the filter-graph syntax.
    #[error("unsafe value: {0}")]
    UnsafeValue(String),

    /// No usable font file for a text layer.
    #[error("missing font: {0}")]
    MissingFont(String),

    /// The ffmpeg executable could not be launched because it does not exist.
    #[error(
        "ffmpeg not found at '{path}'; set `ffmpeg_path` in the render config or install ffmpeg on PATH"
    )]
    ToolNotFound {
        /// The executable path that was resolved and attempted.
        path: String,
    },

    /// ffmpeg exited with a non-zero status.
    ///
    /// `code` is `-1` when the process was terminated by a signal and no
    /// exit code is available.
    #[error("ffmpeg exited with code {code}: {stderr}")]
    Process {
        /// Exit code reported by the child process.
        code: i32,
        /// Captured stderr text, or a generic message when stderr was empty.
        stderr: String,
    },

    /// The external process exceeded the configured wall-clock bound.
    #[error("ffmpeg timed out after {timeout_ms}ms")]
    Timeout {
        /// The configured bound in milliseconds.
        timeout_ms: u64,
    },

    /// No handler matched the input and no delegate renderer was available.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FfrenderError {
    /// Build a [`FfrenderError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FfrenderError::UnsafeValue`] value.
    pub fn unsafe_value(msg: impl Into<String>) -> Self {
        Self::UnsafeValue(msg.into())
    }

    /// Build a [`FfrenderError::MissingFont`] value.
    pub fn missing_font(msg: impl Into<String>) -> Self {
        Self::MissingFont(msg.into())
    }

    /// Build a [`FfrenderError::UnsupportedInput`] value.
    pub fn unsupported_input(msg: impl Into<String>) -> Self {
        Self::UnsupportedInput(msg.into())
    }
}
