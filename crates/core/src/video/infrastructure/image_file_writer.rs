use std::path::Path;

use crate::shared::error::{FramereelError, Result};
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
///
/// Frames are BGR in memory; the channels are swapped to RGB before
/// encoding. The output format follows the path extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn bgr_to_rgb(frame: &Frame) -> Vec<u8> {
    let view = frame.as_ndarray();
    let mut rgb = Vec::with_capacity(frame.data().len());
    for row in view.outer_iter() {
        for pixel in row.outer_iter() {
            rgb.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
        }
    }
    rgb
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), bgr_to_rgb(frame))
            .ok_or_else(|| {
                FramereelError::invalid_config(format!(
                    "frame buffer does not match {}x{}",
                    frame.width(),
                    frame.height()
                ))
            })?;

        img.save(path)?;
        Ok(())
    }
}
