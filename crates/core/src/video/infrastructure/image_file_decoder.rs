use std::path::Path;

use ndarray::Axis;

use crate::shared::error::{FramereelError, Result};
use crate::shared::frame::Frame;
use crate::video::domain::frame_decoder::FrameDecoder;

/// Decodes still images (PNG, JPEG, ...) into BGR frames with the `image`
/// crate. Any colour type is converted to 8-bit RGB first.
pub struct ImageFileDecoder;

impl ImageFileDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<Frame> {
        if !path.is_file() {
            return Err(FramereelError::source_not_found("image", path));
        }

        let img = image::open(path)
            .map_err(|e| FramereelError::DecodeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_rgb8();

        let (width, height) = img.dimensions();
        let mut frame = Frame::new(img.into_raw(), width, height, 0);
        for mut pixel in frame.as_ndarray_mut().lanes_mut(Axis(2)) {
            pixel.swap(0, 2);
        }

        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_rgb_png(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        img.save(path).unwrap();
    }

    #[test]
    fn test_decode_swaps_to_bgr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_rgb_png(&path, 4, 3, [10, 20, 30]);

        let frame = ImageFileDecoder::new().decode(&path).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.shape(), (3, 4, 3));
        assert_eq!(&frame.data()[..3], &[30, 20, 10]);
    }

    #[test]
    fn test_decode_grayscale_expands_to_three_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(5, 5, image::Luma([77]))
            .save(&path)
            .unwrap();

        let frame = ImageFileDecoder::new().decode(&path).unwrap();
        assert_eq!(frame.data().len(), 5 * 5 * 3);
        assert!(frame.data().iter().all(|&b| b == 77));
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let err = ImageFileDecoder::new()
            .decode(Path::new("/nonexistent/a.png"))
            .unwrap_err();
        assert!(matches!(err, FramereelError::SourceNotFound { .. }));
    }

    #[test]
    fn test_corrupt_file_is_decode_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let err = ImageFileDecoder::new().decode(&path).unwrap_err();
        match err {
            FramereelError::DecodeFailed { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
