use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::FramereelError;

/// Still-image file type used for frame directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExtension {
    #[default]
    Png,
    Jpg,
}

impl ImageExtension {
    pub const ALL: &[ImageExtension] = &[ImageExtension::Png, ImageExtension::Jpg];

    /// Dotted suffix, e.g. `.png`.
    pub fn suffix(self) -> &'static str {
        match self {
            ImageExtension::Png => ".png",
            ImageExtension::Jpg => ".jpg",
        }
    }

    /// Returns true if `file_name` ends with this suffix (case-sensitive).
    pub fn matches(self, file_name: &str) -> bool {
        file_name.ends_with(self.suffix())
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for ImageExtension {
    type Err = FramereelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "png" => Ok(ImageExtension::Png),
            "jpg" | "jpeg" => Ok(ImageExtension::Jpg),
            other => Err(FramereelError::invalid_config(format!(
                "image extension must be png or jpg, got '{other}'"
            ))),
        }
    }
}
