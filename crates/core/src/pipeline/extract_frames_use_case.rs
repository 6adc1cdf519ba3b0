use std::path::PathBuf;
use std::sync::atomic::Ordering;

use crate::shared::constants::{DEFAULT_IMAGE_PREFIX, DEFAULT_IMAGE_START_ID};
use crate::shared::error::{FramereelError, Result};
use crate::shared::image_extension::ImageExtension;
use crate::shared::progress::{is_cancelled, new_cancel_token, CancelToken, Progress, ProgressCallback};
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub video_path: PathBuf,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub extension: ImageExtension,
    pub start_id: u64,
    pub max_frames: Option<usize>,
}

impl ExtractionConfig {
    pub fn new(video_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            video_path: video_path.into(),
            output_dir: output_dir.into(),
            prefix: DEFAULT_IMAGE_PREFIX.to_string(),
            extension: ImageExtension::default(),
            start_id: DEFAULT_IMAGE_START_ID,
            max_frames: None,
        }
    }

    /// `{prefix}{start_id + n}{ext}` inside the output directory.
    pub fn output_path(&self, n: usize) -> PathBuf {
        let id = self.start_id + n as u64;
        self.output_dir
            .join(format!("{}{}{}", self.prefix, id, self.extension.suffix()))
    }
}

/// Bookkeeping for one extraction run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageExtractionState {
    /// Frame count reported by the container; only a hint.
    pub total_frame_count: usize,
    pub next_output_index: usize,
}

impl ImageExtractionState {
    pub fn new(total_frame_count: usize) -> Self {
        Self {
            total_frame_count,
            next_output_index: 0,
        }
    }

    pub fn limit_reached(&self, max_frames: Option<usize>) -> bool {
        max_frames.is_some_and(|max| self.next_output_index >= max)
    }

    /// Progress denominator: the hint, raised if decoding outruns it and
    /// capped by the caller's limit.
    pub fn progress_total(&self, max_frames: Option<usize>) -> usize {
        let total = self.total_frame_count.max(self.next_output_index);
        match max_frames {
            Some(max) => total.min(max),
            None => total,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub frames_written: usize,
    pub reported_frame_count: usize,
    pub output_dir: PathBuf,
}

/// Writes every decodable frame of a video as a numbered image file.
///
/// Extraction ends at end of stream, at the first frame that fails to
/// decode, or at the caller's frame limit. None of these is an error.
pub struct ExtractFramesUseCase {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    on_progress: Option<ProgressCallback>,
    cancelled: CancelToken,
}

impl ExtractFramesUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        image_writer: Box<dyn ImageWriter>,
        on_progress: Option<ProgressCallback>,
        cancelled: Option<CancelToken>,
    ) -> Self {
        Self {
            reader,
            image_writer,
            on_progress,
            cancelled: cancelled.unwrap_or_else(new_cancel_token),
        }
    }

    pub fn execute(&mut self, config: &ExtractionConfig) -> Result<ExtractionSummary> {
        if !config.video_path.is_file() {
            return Err(FramereelError::source_not_found("video", &config.video_path));
        }

        let metadata = self.reader.open(&config.video_path)?;
        log::info!(
            "Extracting from {} ({}x{}, {:.2} fps, ~{} frames)",
            config.video_path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            self.reader.frame_count()
        );

        let result = self.extract(config);
        self.reader.close();
        let state = result?;

        log::info!(
            "Wrote {} images to {}",
            state.next_output_index,
            config.output_dir.display()
        );

        Ok(ExtractionSummary {
            frames_written: state.next_output_index,
            reported_frame_count: state.total_frame_count,
            output_dir: config.output_dir.clone(),
        })
    }

    fn extract(&mut self, config: &ExtractionConfig) -> Result<ImageExtractionState> {
        std::fs::create_dir_all(&config.output_dir)?;

        let mut state = ImageExtractionState::new(self.reader.frame_count());

        while !state.limit_reached(config.max_frames) {
            if is_cancelled(&self.cancelled) {
                return Err(FramereelError::Cancelled);
            }

            let Some(frame) = self.reader.read_frame(state.next_output_index) else {
                if state.next_output_index < state.total_frame_count {
                    log::warn!(
                        "Stopped at frame {} of {} reported",
                        state.next_output_index,
                        state.total_frame_count
                    );
                }
                break;
            };

            let path = config.output_path(state.next_output_index);
            self.image_writer.write(&path, &frame)?;
            state.next_output_index += 1;

            self.report_progress(&state, config.max_frames)?;
        }

        Ok(state)
    }

    fn report_progress(&self, state: &ImageExtractionState, max_frames: Option<usize>) -> Result<()> {
        if let Some(ref callback) = self.on_progress {
            let progress = Progress::new(state.next_output_index, state.progress_total(max_frames));
            if !callback(progress) {
                self.cancelled.store(true, Ordering::Relaxed);
                return Err(FramereelError::Cancelled);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    /// Reports `reported` frames but only decodes the first `decodable`.
    struct StubReader {
        reported: usize,
        decodable: usize,
        closed: Arc<Mutex<bool>>,
    }

    impl StubReader {
        fn new(reported: usize, decodable: usize) -> Self {
            Self {
                reported,
                decodable,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata> {
            Ok(VideoMetadata {
                width: 8,
                height: 6,
                fps: 25.0,
                total_frames: self.reported,
                codec: "stub".to_string(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frame_count(&self) -> usize {
            self.reported
        }

        fn read_frame(&mut self, index: usize) -> Option<Frame> {
            (index < self.decodable).then(|| Frame::blank(8, 6).with_index(index))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct RecordingImageWriter {
        paths: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl ImageWriter for RecordingImageWriter {
        fn write(&self, path: &Path, _frame: &Frame) -> Result<()> {
            self.paths.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn video_file(dir: &Path) -> PathBuf {
        let path = dir.join("in.mp4");
        std::fs::write(&path, b"stub").unwrap();
        path
    }

    fn use_case(
        reader: StubReader,
        on_progress: Option<ProgressCallback>,
    ) -> (ExtractFramesUseCase, Arc<Mutex<Vec<PathBuf>>>) {
        let paths = Arc::new(Mutex::new(Vec::new()));
        let writer = RecordingImageWriter {
            paths: paths.clone(),
        };
        (
            ExtractFramesUseCase::new(Box::new(reader), Box::new(writer), on_progress, None),
            paths,
        )
    }

    // --- Tests ---

    #[test]
    fn test_output_names_use_prefix_and_start_id() {
        let mut config = ExtractionConfig::new("in.mp4", "/out");
        config.prefix = "shot-".to_string();
        config.start_id = 10000;
        config.extension = ImageExtension::Jpg;
        assert_eq!(config.output_path(0), PathBuf::from("/out/shot-10000.jpg"));
        assert_eq!(config.output_path(42), PathBuf::from("/out/shot-10042.jpg"));
    }

    #[test]
    fn test_extracts_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut uc, paths) = use_case(StubReader::new(12, 12), None);
        let config = ExtractionConfig::new(video_file(dir.path()), dir.path().join("frames"));

        let summary = uc.execute(&config).unwrap();
        assert_eq!(summary.frames_written, 12);
        assert_eq!(summary.reported_frame_count, 12);
        assert!(config.output_dir.is_dir());

        let paths = paths.lock().unwrap();
        assert_eq!(paths.len(), 12);
        assert_eq!(paths[0], config.output_dir.join("image-10000.png"));
        assert_eq!(paths[11], config.output_dir.join("image-10011.png"));
    }

    #[test]
    fn test_decode_failure_stops_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut uc, paths) = use_case(StubReader::new(500, 400), None);
        let config = ExtractionConfig::new(video_file(dir.path()), dir.path().join("frames"));

        let summary = uc.execute(&config).unwrap();
        assert_eq!(summary.frames_written, 400);
        assert_eq!(summary.reported_frame_count, 500);
        assert_eq!(paths.lock().unwrap().len(), 400);
    }

    #[test]
    fn test_max_frames_limits_output() {
        let dir = tempfile::tempdir().unwrap();
        let (callback, seen) = {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let cb: ProgressCallback = Box::new(move |p| {
                sink.lock().unwrap().push(p);
                true
            });
            (cb, seen)
        };
        let (mut uc, paths) = use_case(StubReader::new(100, 100), Some(callback));
        let mut config = ExtractionConfig::new(video_file(dir.path()), dir.path().join("frames"));
        config.max_frames = Some(5);

        let summary = uc.execute(&config).unwrap();
        assert_eq!(summary.frames_written, 5);
        assert_eq!(paths.lock().unwrap().len(), 5);

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|p| p.total == 5));
        assert_eq!(seen.last().unwrap().fraction(), 1.0);
    }

    #[test]
    fn test_progress_total_grows_past_hint() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Box::new(move |p| {
            sink.lock().unwrap().push(p);
            true
        });
        // Container claims 3 frames but 6 decode.
        let (mut uc, _paths) = use_case(StubReader::new(3, 6), Some(callback));
        let config = ExtractionConfig::new(video_file(dir.path()), dir.path().join("frames"));

        uc.execute(&config).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 6);
        assert!(seen.windows(2).all(|w| w[0].current < w[1].current));
        assert_eq!(seen.last().unwrap(), &Progress::new(6, 6));
    }

    #[test]
    fn test_missing_video_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (mut uc, paths) = use_case(StubReader::new(5, 5), None);
        let config = ExtractionConfig::new(dir.path().join("missing.mp4"), dir.path().join("frames"));

        let err = uc.execute(&config).unwrap_err();
        assert!(matches!(err, FramereelError::SourceNotFound { .. }));
        assert!(paths.lock().unwrap().is_empty());
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn test_cancel_from_callback_closes_reader() {
        let dir = tempfile::tempdir().unwrap();
        let reader = StubReader::new(50, 50);
        let closed = reader.closed.clone();
        let callback: ProgressCallback = Box::new(|p| p.current < 3);
        let (mut uc, paths) = use_case(reader, Some(callback));
        let config = ExtractionConfig::new(video_file(dir.path()), dir.path().join("frames"));

        let err = uc.execute(&config).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(paths.lock().unwrap().len(), 3);
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_empty_video_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut uc, paths) = use_case(StubReader::new(0, 0), None);
        let config = ExtractionConfig::new(video_file(dir.path()), dir.path().join("frames"));

        let summary = uc.execute(&config).unwrap();
        assert_eq!(summary.frames_written, 0);
        assert!(paths.lock().unwrap().is_empty());
    }

    #[test]
    fn test_state_progress_total() {
        let mut state = ImageExtractionState::new(10);
        assert_eq!(state.progress_total(None), 10);
        assert_eq!(state.progress_total(Some(4)), 4);
        state.next_output_index = 12;
        assert_eq!(state.progress_total(None), 12);
        assert!(state.limit_reached(Some(12)));
        assert!(!state.limit_reached(None));
    }
}
