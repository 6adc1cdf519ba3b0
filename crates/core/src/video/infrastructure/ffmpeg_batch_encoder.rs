use std::path::Path;
use std::process::{Command, Stdio};

use crate::shared::constants::{
    DEFAULT_CRF, DEFAULT_FFMPEG_PROGRAM, DEFAULT_PIXEL_FORMAT_OUT, MAX_CRF,
};
use crate::shared::error::{FramereelError, Result};
use crate::shared::image_extension::ImageExtension;
use crate::shared::video_spec::VideoSpec;
use crate::video::domain::batch_encoder::BatchEncoder;

/// Options for a one-shot encode of an image directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    pub program: String,
    pub crf: u32,
    pub pixel_format_out: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            program: DEFAULT_FFMPEG_PROGRAM.to_string(),
            crf: DEFAULT_CRF,
            pixel_format_out: DEFAULT_PIXEL_FORMAT_OUT.to_string(),
        }
    }
}

impl BatchOptions {
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.crf > MAX_CRF {
            return Err(FramereelError::invalid_config(format!(
                "crf must be between 0 and {MAX_CRF}, got {}",
                self.crf
            )));
        }
        Ok(())
    }

    /// Command line for a glob-pattern encode of `source_dir`.
    ///
    /// The pattern is passed as a single argument, so no shell quoting is
    /// involved; glob metacharacters in the directory itself are escaped.
    pub fn build_args(
        &self,
        source_dir: &Path,
        extension: ImageExtension,
        spec: &VideoSpec,
    ) -> Vec<String> {
        let dir = escape_glob(&source_dir.display().to_string());
        let pattern = Path::new(&dir).join(format!("*{}", extension.suffix()));
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-framerate".to_string(),
            spec.frame_rate.to_string(),
            "-pattern_type".to_string(),
            "glob".to_string(),
            "-i".to_string(),
            pattern.display().to_string(),
            "-c:v".to_string(),
            spec.encoder_id.clone(),
            "-profile:v".to_string(),
            "high".to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format_out.clone(),
            spec.output_path.display().to_string(),
        ]
    }
}

/// Runs an external encoder once over every image in a directory.
pub struct FfmpegBatchEncoder {
    options: BatchOptions,
}

impl FfmpegBatchEncoder {
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    fn invocation_failed(&self, reason: impl Into<String>) -> FramereelError {
        FramereelError::EncoderInvocationFailed {
            program: self.options.program.clone(),
            reason: reason.into(),
        }
    }
}

impl Default for FfmpegBatchEncoder {
    fn default() -> Self {
        Self::new(BatchOptions::default())
    }
}

impl BatchEncoder for FfmpegBatchEncoder {
    fn encode(&self, source_dir: &Path, extension: ImageExtension, spec: &VideoSpec) -> Result<()> {
        self.options.validate()?;
        spec.validate()?;

        let args = self.options.build_args(source_dir, extension, spec);
        log::debug!("Running {} {}", self.options.program, args.join(" "));

        let output = Command::new(&self.options.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.invocation_failed(format!("failed to spawn: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.invocation_failed(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        log::info!("Batch encode finished {}", spec.output_path.display());
        Ok(())
    }
}

/// Backslash-escapes the characters glob(3) treats as patterns.
fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '?' | '[' | ']' | '{' | '}') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
