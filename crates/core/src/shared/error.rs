use std::path::PathBuf;

use thiserror::Error;

/// Every failure the assembler, the encoder backends and the extractor can
/// report. Messages name the resource or the mismatching values.
#[derive(Error, Debug)]
pub enum FramereelError {
    #[error("Not found: {what} {}", path.display())]
    SourceNotFound { what: String, path: PathBuf },

    #[error(
        "Frame dimensions {actual_width}x{actual_height} of {} mismatch with video dimensions {expected_width}x{expected_height}",
        source_path.display()
    )]
    DimensionMismatch {
        source_path: PathBuf,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Not enough content: {frames} planned frames, need more than {frame_rate} (one second)")]
    InsufficientContent { frames: usize, frame_rate: u32 },

    #[error("Unsupported encoder '{encoder_id}': {reason}")]
    UnsupportedEncoder { encoder_id: String, reason: String },

    #[error("Encoder process '{program}' failed: {reason}")]
    EncoderProcessFailed { program: String, reason: String },

    #[error("Encoder invocation '{program}' failed: {reason}")]
    EncoderInvocationFailed { program: String, reason: String },

    #[error("Failed to open video {}: {reason}", path.display())]
    VideoOpenFailed { path: PathBuf, reason: String },

    #[error("Failed to decode image {}: {reason}", path.display())]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("{writer}: write called before open")]
    WriteBeforeOpen { writer: &'static str },

    #[error("{writer}: write called after close")]
    WriteAfterClose { writer: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Convenience alias for results carrying a [`FramereelError`].
pub type Result<T> = std::result::Result<T, FramereelError>;

impl FramereelError {
    pub fn source_not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::SourceNotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
