use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::sequence::domain::sequence_plan::{
    CardContent, FrameSequencePlan, Segment, SegmentKind, TitleCard,
};
use crate::sequence::infrastructure::directory_frame_source::DirectoryFrameSource;
use crate::shared::error::{FramereelError, Result};
use crate::shared::frame::Frame;
use crate::shared::image_extension::ImageExtension;
use crate::shared::progress::{is_cancelled, new_cancel_token, CancelToken, Progress, ProgressCallback};
use crate::shared::video_spec::VideoSpec;
use crate::video::domain::frame_decoder::FrameDecoder;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::backend_factory::Backend;

/// Everything needed to turn one image directory into one video.
#[derive(Clone, Debug)]
pub struct AssemblyConfig {
    pub spec: VideoSpec,
    pub source_dir: PathBuf,
    pub extension: ImageExtension,
    pub prologue: Option<TitleCard>,
    pub epilogue: Option<TitleCard>,
}

impl AssemblyConfig {
    fn card_seconds(card: &Option<TitleCard>) -> u32 {
        card.as_ref().map_or(0, |c| c.seconds)
    }

    fn has_cards(&self) -> bool {
        Self::card_seconds(&self.prologue) > 0 || Self::card_seconds(&self.epilogue) > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblySummary {
    pub total_frames: usize,
    pub segments: Vec<Segment>,
    pub output_path: PathBuf,
}

/// Frames resolved before any encoder resource is touched.
struct PreparedAssembly {
    plan: FrameSequencePlan,
    main_paths: Vec<PathBuf>,
    first_frame: Frame,
    prologue_frame: Option<Frame>,
    epilogue_frame: Option<Frame>,
}

/// Assembles title card, fillers, the image sequence and credit card into
/// one video through the selected backend.
///
/// All preconditions (source present, frame size, minimum content) are
/// checked before the destination is touched, so a rejected run leaves no
/// output behind.
pub struct AssembleVideoUseCase {
    decoder: Box<dyn FrameDecoder>,
    backend: Backend,
    on_progress: Option<ProgressCallback>,
    cancelled: CancelToken,
}

impl AssembleVideoUseCase {
    pub fn new(
        decoder: Box<dyn FrameDecoder>,
        backend: Backend,
        on_progress: Option<ProgressCallback>,
        cancelled: Option<CancelToken>,
    ) -> Self {
        Self {
            decoder,
            backend,
            on_progress,
            cancelled: cancelled.unwrap_or_else(new_cancel_token),
        }
    }

    pub fn execute(&mut self, config: &AssemblyConfig) -> Result<AssemblySummary> {
        let prepared = self.prepare(config)?;
        let total = prepared.plan.total_frames();

        if self.backend.is_batch() && config.has_cards() {
            return Err(FramereelError::invalid_config(
                "title and credit cards need a streaming backend",
            ));
        }

        if is_cancelled(&self.cancelled) {
            return Err(FramereelError::Cancelled);
        }
        prepare_destination(&config.spec.output_path)?;

        log::info!(
            "Assembling {} frames ({} source images) into {}",
            total,
            prepared.plan.frames_in(SegmentKind::Main),
            config.spec.output_path.display()
        );

        match &mut self.backend {
            Backend::Streaming(writer) => {
                writer.open(&config.spec)?;
                let mut sink = FrameSink {
                    writer: writer.as_mut(),
                    on_progress: self.on_progress.as_ref(),
                    cancelled: &self.cancelled,
                    written: 0,
                    total,
                };

                let streamed = stream_plan(&mut sink, self.decoder.as_ref(), &prepared, &config.spec);
                match streamed {
                    Ok(()) => writer.close()?,
                    Err(e) => {
                        if let Err(close_err) = writer.close() {
                            log::warn!("Closing after failure also failed: {close_err}");
                        }
                        return Err(e);
                    }
                }
            }
            Backend::Batch(encoder) => {
                encoder.encode(&config.source_dir, config.extension, &config.spec)?;
                if let Some(callback) = self.on_progress.as_ref() {
                    callback(Progress::new(total, total));
                }
            }
        }

        log::info!("Finished {}", config.spec.output_path.display());

        Ok(AssemblySummary {
            total_frames: total,
            segments: prepared.plan.segments().to_vec(),
            output_path: config.spec.output_path.clone(),
        })
    }

    fn prepare(&self, config: &AssemblyConfig) -> Result<PreparedAssembly> {
        config.spec.validate()?;

        let source = DirectoryFrameSource::new(&config.source_dir, config.extension);
        let main_paths = source.list_frames()?;
        let Some(first_path) = main_paths.first() else {
            return Err(FramereelError::source_not_found(
                format!("{} images in", config.extension),
                &config.source_dir,
            ));
        };

        let first_frame = self.decoder.decode(first_path)?;
        check_size(&first_frame, &config.spec, first_path)?;

        let prologue_frame = self.resolve_card(config.prologue.as_ref(), &config.spec)?;
        let epilogue_frame = self.resolve_card(config.epilogue.as_ref(), &config.spec)?;

        let plan = FrameSequencePlan::build(
            config.spec.frame_rate,
            AssemblyConfig::card_seconds(&config.prologue),
            main_paths.len(),
            AssemblyConfig::card_seconds(&config.epilogue),
        );
        if !plan.meets_minimum(config.spec.frame_rate) {
            return Err(FramereelError::InsufficientContent {
                frames: plan.total_frames(),
                frame_rate: config.spec.frame_rate,
            });
        }

        Ok(PreparedAssembly {
            plan,
            main_paths,
            first_frame,
            prologue_frame,
            epilogue_frame,
        })
    }

    fn resolve_card(&self, card: Option<&TitleCard>, spec: &VideoSpec) -> Result<Option<Frame>> {
        let Some(card) = card.filter(|c| c.seconds > 0) else {
            return Ok(None);
        };
        let frame = match &card.content {
            CardContent::Solid(bgr) => Frame::filled(spec.width, spec.height, *bgr),
            CardContent::Image(path) => {
                let frame = self.decoder.decode(path)?;
                check_size(&frame, spec, path)?;
                frame
            }
        };
        Ok(Some(frame))
    }
}

fn check_size(frame: &Frame, spec: &VideoSpec, path: &Path) -> Result<()> {
    if frame.has_size(spec.width, spec.height) {
        return Ok(());
    }
    Err(FramereelError::DimensionMismatch {
        source_path: path.to_path_buf(),
        expected_width: spec.width,
        expected_height: spec.height,
        actual_width: frame.width(),
        actual_height: frame.height(),
    })
}

fn prepare_destination(output_path: &Path) -> Result<()> {
    if output_path.exists() {
        log::info!("Deleting existing {}", output_path.display());
        std::fs::remove_file(output_path)?;
    }
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes frames to an open session, counting and reporting each one.
struct FrameSink<'a> {
    writer: &'a mut dyn VideoWriter,
    on_progress: Option<&'a ProgressCallback>,
    cancelled: &'a CancelToken,
    written: usize,
    total: usize,
}

impl FrameSink<'_> {
    fn emit(&mut self, frame: &Frame) -> Result<()> {
        if is_cancelled(self.cancelled) {
            return Err(FramereelError::Cancelled);
        }
        self.writer.write(frame)?;
        self.written += 1;

        if let Some(callback) = self.on_progress {
            if !callback(Progress::new(self.written, self.total)) {
                self.cancelled.store(true, Ordering::Relaxed);
                return Err(FramereelError::Cancelled);
            }
        }
        Ok(())
    }

    fn emit_repeated(&mut self, frame: &Frame, count: usize) -> Result<()> {
        for _ in 0..count {
            self.emit(frame)?;
        }
        Ok(())
    }
}

fn stream_plan(
    sink: &mut FrameSink<'_>,
    decoder: &dyn FrameDecoder,
    prepared: &PreparedAssembly,
    spec: &VideoSpec,
) -> Result<()> {
    let blank = Frame::blank(spec.width, spec.height);

    for segment in prepared.plan.segments() {
        log::debug!("Writing {:?} ({} frames)", segment.kind, segment.frames);
        match segment.kind {
            SegmentKind::Prologue => {
                if let Some(card) = &prepared.prologue_frame {
                    sink.emit_repeated(card, segment.frames)?;
                }
            }
            SegmentKind::Epilogue => {
                if let Some(card) = &prepared.epilogue_frame {
                    sink.emit_repeated(card, segment.frames)?;
                }
            }
            SegmentKind::PrologueFiller | SegmentKind::EpilogueFiller => {
                sink.emit_repeated(&blank, segment.frames)?;
            }
            SegmentKind::Main => {
                sink.emit(&prepared.first_frame)?;
                for path in prepared.main_paths.iter().skip(1) {
                    let frame = decoder.decode(path)?;
                    check_size(&frame, spec, path)?;
                    sink.emit(&frame)?;
                }
            }
        }
    }
    Ok(())
}
