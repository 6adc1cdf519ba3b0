use std::path::PathBuf;

use super::constants::MAX_FRAME_RATE;
use super::error::{FramereelError, Result};

/// Target of one encode: frame rate, frame size, destination and the codec
/// identifier understood by the chosen backend (a fourcc for the native
/// writer, an ffmpeg encoder name for the pipe and batch backends).
#[derive(Clone, Debug, PartialEq)]
pub struct VideoSpec {
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
    pub output_path: PathBuf,
    pub encoder_id: String,
}

impl VideoSpec {
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(FramereelError::invalid_config("frame rate must be positive"));
        }
        if self.frame_rate > MAX_FRAME_RATE {
            return Err(FramereelError::invalid_config(format!(
                "frame rate {} exceeds the maximum of {MAX_FRAME_RATE}",
                self.frame_rate
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(FramereelError::invalid_config(format!(
                "video dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.encoder_id.trim().is_empty() {
            return Err(FramereelError::invalid_config("encoder id must not be empty"));
        }
        Ok(())
    }

    /// The `WIDTHxHEIGHT` string used on encoder command lines.
    pub fn size_arg(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}
