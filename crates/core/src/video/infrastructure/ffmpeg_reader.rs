use std::path::{Path, PathBuf};

use crate::shared::error::{FramereelError, Result};
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Frames are decoded sequentially from a cursor and converted to BGR24.
/// Asking for an index behind the cursor reopens the container and decodes
/// forward again, so sequential access stays cheap and random access is
/// always exact.
pub struct FfmpegReader {
    path: Option<PathBuf>,
    metadata: Option<VideoMetadata>,
    cursor: Option<DecodeCursor>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            path: None,
            metadata: None,
            cursor: None,
        }
    }

    fn rewind(&mut self) -> Option<()> {
        let path = self.path.as_ref()?;
        match DecodeCursor::open(path) {
            Ok(cursor) => {
                self.cursor = Some(cursor);
                Some(())
            }
            Err(e) => {
                log::warn!("Failed to reopen {} for seeking: {e}", path.display());
                self.cursor = None;
                None
            }
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata> {
        let open_failed = |reason: String| FramereelError::VideoOpenFailed {
            path: path.to_path_buf(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| open_failed(e.to_string()))?;
        let cursor = DecodeCursor::open(path).map_err(|e| open_failed(e.to_string()))?;

        let stream = cursor
            .ictx
            .stream(cursor.video_stream_index)
            .ok_or_else(|| open_failed("No video stream found".to_string()))?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let total_frames = if stream.frames() > 0 {
            stream.frames() as usize
        } else {
            estimate_frame_count(cursor.ictx.duration(), fps)
        };

        let metadata = VideoMetadata {
            width: cursor.width,
            height: cursor.height,
            fps,
            total_frames,
            codec: cursor
                .decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        self.path = Some(path.to_path_buf());
        self.metadata = Some(metadata.clone());
        self.cursor = Some(cursor);

        Ok(metadata)
    }

    fn frame_count(&self) -> usize {
        self.metadata.as_ref().map_or(0, |m| m.total_frames)
    }

    fn read_frame(&mut self, index: usize) -> Option<Frame> {
        let behind = self.cursor.as_ref()?.next_index > index;
        if behind {
            self.rewind()?;
        }

        let cursor = self.cursor.as_mut()?;
        while cursor.next_index < index {
            match cursor.decode_next() {
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::debug!("Decode failed while skipping to frame {index}: {e}");
                    return None;
                }
                None => return None,
            }
        }

        match cursor.decode_next() {
            Some(Ok(frame)) => Some(frame),
            Some(Err(e)) => {
                log::debug!("Decode failed at frame {index}: {e}");
                None
            }
            None => None,
        }
    }

    fn close(&mut self) {
        self.cursor = None;
        self.metadata = None;
        self.path = None;
    }
}

/// Container durations are in AV_TIME_BASE units (microseconds).
const MICROS_PER_SECOND: f64 = 1_000_000.0;

fn estimate_frame_count(duration: i64, fps: f64) -> usize {
    if duration <= 0 || fps <= 0.0 {
        return 0;
    }
    (duration as f64 / MICROS_PER_SECOND * fps).round() as usize
}

/// Open container plus decoder state; decodes one frame at a time.
struct DecodeCursor {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    next_index: usize,
    flushing: bool,
    done: bool,
}

impl DecodeCursor {
    fn open(path: &Path) -> std::result::Result<Self, ffmpeg_next::Error> {
        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(ffmpeg_next::Error::StreamNotFound)?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::BGR24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            next_index: 0,
            flushing: false,
            done: false,
        })
    }

    /// Pulls one decoded frame. `None` means the decoder needs more input
    /// (or is fully drained); any other decoder error ends the stream.
    fn try_receive(&mut self) -> Option<Result<Frame>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.decoder.receive_frame(&mut decoded) {
            if is_retryable(&e) {
                return None;
            }
            self.done = true;
            return Some(Err(e.into()));
        }

        let mut bgr_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut bgr_frame) {
            self.done = true;
            return Some(Err(e.into()));
        }

        let pixels = extract_packed_pixels(&bgr_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.next_index);
        self.next_index += 1;
        Some(Ok(frame))
    }

    fn decode_next(&mut self) -> Option<Result<Frame>> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                self.done = true;
                return Some(Err(e.into()));
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// EAGAIN (feed more packets) and EOF (drained) are normal decoder states.
fn is_retryable(error: &ffmpeg_next::Error) -> bool {
    match error {
        ffmpeg_next::Error::Eof => true,
        ffmpeg_next::Error::Other { errno } => *errno == ffmpeg_next::error::EAGAIN,
        _ => false,
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly-packed BGR buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_packed_pixels(
    frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
