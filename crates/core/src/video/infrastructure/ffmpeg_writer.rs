use ffmpeg_next::codec::Id;
use ffmpeg_next::format::Pixel;

use crate::shared::error::{FramereelError, Result};
use crate::shared::frame::Frame;
use crate::shared::video_spec::VideoSpec;
use crate::video::domain::session_state::SessionState;
use crate::video::domain::video_writer::VideoWriter;

const WRITER_NAME: &str = "FfmpegWriter";

/// Four-character codes the native writer understands, with the libav codec
/// and encoder pixel format each maps to.
const FOURCC_CODECS: &[(&str, Id, Pixel)] = &[
    ("mp4v", Id::MPEG4, Pixel::YUV420P),
    ("xvid", Id::MPEG4, Pixel::YUV420P),
    ("divx", Id::MPEG4, Pixel::YUV420P),
    ("fmp4", Id::MPEG4, Pixel::YUV420P),
    ("mjpg", Id::MJPEG, Pixel::YUVJ420P),
    ("avc1", Id::H264, Pixel::YUV420P),
    ("h264", Id::H264, Pixel::YUV420P),
];

/// Resolves a fourcc (case-insensitive) to its codec and pixel format.
pub fn codec_for_fourcc(fourcc: &str) -> Result<(Id, Pixel)> {
    let wanted = fourcc.trim().to_lowercase();
    FOURCC_CODECS
        .iter()
        .find(|(code, _, _)| *code == wanted)
        .map(|&(_, id, pixel)| (id, pixel))
        .ok_or_else(|| FramereelError::UnsupportedEncoder {
            encoder_id: fourcc.to_string(),
            reason: format!(
                "expected one of {}",
                FOURCC_CODECS
                    .iter()
                    .map(|(code, _, _)| *code)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
}

/// Encodes BGR frames into a container through the linked libav* libraries.
pub struct FfmpegWriter {
    state: SessionState,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    frame_rate: i32,
    frame_count: usize,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unopened,
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            frame_rate: 0,
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    /// Frames written in the current session.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Drains every packet the encoder has ready into the container.
    fn drain_packets(&mut self) -> Result<()> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Ok(());
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .map(|s| s.time_base())
            .ok_or(ffmpeg_next::Error::StreamNotFound)?;

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.frame_rate), ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }

    fn release(&mut self) {
        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        self.state = SessionState::Closed;
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(&mut self, spec: &VideoSpec) -> Result<()> {
        if self.state.is_open() {
            return Ok(());
        }
        spec.validate()?;
        let (codec_id, pixel_format) = codec_for_fourcc(&spec.encoder_id)?;

        ffmpeg_next::init()?;

        let codec =
            ffmpeg_next::encoder::find(codec_id).ok_or_else(|| FramereelError::UnsupportedEncoder {
                encoder_id: spec.encoder_id.clone(),
                reason: format!("{codec_id:?} encoder not available in this ffmpeg build"),
            })?;

        let mut octx = ffmpeg_next::format::output(&spec.output_path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let frame_rate = i32::try_from(spec.frame_rate).map_err(|_| {
            FramereelError::invalid_config(format!("frame rate {} is out of range", spec.frame_rate))
        })?;
        encoder_ctx.set_width(spec.width);
        encoder_ctx.set_height(spec.height);
        encoder_ctx.set_format(pixel_format);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, frame_rate));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(frame_rate, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        let video_stream_index = ost.index();

        octx.write_header()?;

        // BGR -> encoder pixel format
        let scaler = ffmpeg_next::software::scaling::Context::get(
            Pixel::BGR24,
            spec.width,
            spec.height,
            pixel_format,
            spec.width,
            spec.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened native writer for {} ({} -> {codec_id:?}, {}x{} @ {} fps)",
            spec.output_path.display(),
            spec.encoder_id,
            spec.width,
            spec.height,
            spec.frame_rate
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.width = spec.width;
        self.height = spec.height;
        self.frame_rate = frame_rate;
        self.frame_count = 0;
        self.video_stream_index = video_stream_index;
        self.state = SessionState::Open;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.state.ensure_writable(WRITER_NAME)?;

        if !frame.has_size(self.width, self.height) {
            return Err(FramereelError::DimensionMismatch {
                source_path: format!("frame #{}", frame.index()).into(),
                expected_width: self.width,
                expected_height: self.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }

        let mut bgr_frame =
            ffmpeg_next::util::frame::video::Video::new(Pixel::BGR24, self.width, self.height);

        let stride = bgr_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let data = bgr_frame.data_mut(0);
        let src = frame.data();

        // Copy pixel data, respecting stride
        for row in 0..self.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut out_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.run(&bgr_frame, &mut out_frame)?;
        }
        out_frame.set_pts(Some(self.frame_count as i64));

        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_frame(&out_frame)?;
        }
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.state.is_open() {
            return Ok(());
        }

        let result = (|| -> Result<()> {
            if let Some(encoder) = self.encoder.as_mut() {
                encoder.send_eof()?;
            }
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            Ok(())
        })();

        self.release();
        log::debug!("Native writer closed after {} frames", self.frame_count);
        result
    }
}
