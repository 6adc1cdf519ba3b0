use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use framereel_core::shared::constants::{
    DEFAULT_CRF, DEFAULT_FFMPEG_ENCODER, DEFAULT_FFMPEG_PROGRAM, DEFAULT_FRAME_RATE,
    DEFAULT_IMAGE_PREFIX, DEFAULT_IMAGE_START_ID, DEFAULT_NATIVE_FOURCC, DEFAULT_PIXEL_FORMAT_OUT,
};
use framereel_core::shared::image_extension::ImageExtension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Native,
    Pipe,
    Batch,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Pipe => write!(f, "pipe"),
            BackendKind::Batch => write!(f, "batch"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Black,
    White,
}

impl CardColor {
    pub fn bgr(self) -> [u8; 3] {
        match self {
            CardColor::Black => [0, 0, 0],
            CardColor::White => [255, 255, 255],
        }
    }
}

/// Persisted defaults. Command-line flags override every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendKind,
    pub frame_rate: u32,
    /// `None` takes the size of the first source image.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub native_fourcc: String,
    pub ffmpeg_encoder: String,
    pub ffmpeg_program: String,
    pub extension: ImageExtension,
    pub crf: u32,
    pub pixel_format_out: String,
    pub prologue_seconds: u32,
    pub epilogue_seconds: u32,
    pub card_color: CardColor,
    pub image_prefix: String,
    pub image_start_id: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Native,
            frame_rate: DEFAULT_FRAME_RATE,
            width: None,
            height: None,
            native_fourcc: DEFAULT_NATIVE_FOURCC.to_string(),
            ffmpeg_encoder: DEFAULT_FFMPEG_ENCODER.to_string(),
            ffmpeg_program: DEFAULT_FFMPEG_PROGRAM.to_string(),
            extension: ImageExtension::Png,
            crf: DEFAULT_CRF,
            pixel_format_out: DEFAULT_PIXEL_FORMAT_OUT.to_string(),
            prologue_seconds: 0,
            epilogue_seconds: 0,
            card_color: CardColor::Black,
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
            image_start_id: DEFAULT_IMAGE_START_ID,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("framereel").join("settings.json"))
    }

    /// Loads settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };
        let Ok(json) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring corrupt settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(Self::default_path)
            .ok_or("No config directory available")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Encoder identifier for the chosen backend.
    pub fn encoder_for(&self, backend: BackendKind) -> &str {
        match backend {
            BackendKind::Native => &self.native_fourcc,
            BackendKind::Pipe | BackendKind::Batch => &self.ffmpeg_encoder,
        }
    }
}
