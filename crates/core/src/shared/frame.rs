use ndarray::{ArrayView3, ArrayViewMut3};

/// Channels per pixel. Frames are always packed 8-bit BGR.
pub const CHANNELS: usize = 3;

/// A single video/image frame: contiguous BGR bytes in row-major order,
/// shaped `(height, width, 3)`.
///
/// Format conversion happens at I/O boundaries only; decoders hand out BGR
/// and writers consume BGR.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// An all-black frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0])
    }

    /// A frame where every pixel has the given BGR value.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&bgr);
        }
        Self::new(data, width, height, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Returns true if the frame is `width` x `height`.
    pub fn has_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// `(height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_blank_is_black() {
        let frame = Frame::blank(4, 3);
        assert_eq!(frame.data().len(), 4 * 3 * 3);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_filled_repeats_bgr() {
        let frame = Frame::filled(2, 1, [10, 20, 30]);
        assert_eq!(frame.data(), &[10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::filled(2, 2, [100, 100, 100]);
        let mut cloned = frame.clone();
        cloned.data_mut()[0] = 0;
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_as_ndarray_shape_is_height_width_channels() {
        let frame = Frame::blank(4, 2);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_as_ndarray_channel_order_is_bgr() {
        let frame = Frame::filled(2, 2, [1, 2, 3]);
        let arr = frame.as_ndarray();
        assert_eq!(arr[[1, 1, 0]], 1); // B
        assert_eq!(arr[[1, 1, 1]], 2); // G
        assert_eq!(arr[[1, 1, 2]], 3); // R
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::blank(2, 2);
        {
            let mut arr = frame.as_ndarray_mut();
            arr[[0, 1, 2]] = 128;
        }
        assert_eq!(frame.data()[5], 128);
    }

    #[test]
    fn test_has_size() {
        let frame = Frame::blank(640, 480);
        assert!(frame.has_size(640, 480));
        assert!(!frame.has_size(480, 640));
    }
}
