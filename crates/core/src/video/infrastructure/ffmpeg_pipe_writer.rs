use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::shared::constants::{DEFAULT_FFMPEG_PROGRAM, DEFAULT_PIXEL_FORMAT_OUT, PIPE_PIXEL_FORMAT_IN};
use crate::shared::error::{FramereelError, Result};
use crate::shared::frame::Frame;
use crate::shared::video_spec::VideoSpec;
use crate::video::domain::session_state::SessionState;
use crate::video::domain::video_writer::VideoWriter;

const WRITER_NAME: &str = "FfmpegPipeWriter";

/// Bytes of encoder stderr kept in error messages.
const STDERR_TAIL_BYTES: usize = 2048;

/// Options for the external encoder process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipeOptions {
    pub program: String,
    pub pixel_format_in: String,
    pub pixel_format_out: String,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self {
            program: DEFAULT_FFMPEG_PROGRAM.to_string(),
            pixel_format_in: PIPE_PIXEL_FORMAT_IN.to_string(),
            pixel_format_out: DEFAULT_PIXEL_FORMAT_OUT.to_string(),
        }
    }
}

impl PipeOptions {
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Command line for an encoder reading raw frames from stdin.
    pub fn build_args(&self, spec: &VideoSpec) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend([
            "-f".to_string(),
            "rawvideo".to_string(),
            "-vcodec".to_string(),
            "rawvideo".to_string(),
            "-s".to_string(),
            spec.size_arg(),
            "-pix_fmt".to_string(),
            self.pixel_format_in.clone(),
            "-r".to_string(),
            spec.frame_rate.to_string(),
            "-an".to_string(),
            "-i".to_string(),
            "-".to_string(),
            "-c:v".to_string(),
            spec.encoder_id.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format_out.clone(),
            spec.output_path.display().to_string(),
        ]);
        args
    }
}

/// Returns true when an `ffmpeg` binary answers `-version`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new(DEFAULT_FFMPEG_PROGRAM)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Streams raw BGR frames into an external encoder's stdin.
///
/// Writes block on the pipe, so a slow encoder throttles the producer and
/// at most one frame is in flight. Closing stdin signals end of stream.
pub struct FfmpegPipeWriter {
    options: PipeOptions,
    state: SessionState,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<Vec<u8>>>,
    width: u32,
    height: u32,
    output_path: PathBuf,
    frame_count: usize,
}

impl FfmpegPipeWriter {
    pub fn new(options: PipeOptions) -> Self {
        Self {
            options,
            state: SessionState::Unopened,
            child: None,
            stdin: None,
            stderr_drain: None,
            width: 0,
            height: 0,
            output_path: PathBuf::new(),
            frame_count: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn process_failed(&self, reason: impl Into<String>) -> FramereelError {
        FramereelError::EncoderProcessFailed {
            program: self.options.program.clone(),
            reason: reason.into(),
        }
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child
            .wait()
            .map_err(|e| self.process_failed(format!("failed to wait for exit: {e}")))?;
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|drain| drain.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(self.process_failed(format!(
                "exited with {}: {}",
                status,
                stderr_tail(stderr.trim())
            )));
        }

        log::info!(
            "Encoder finished {} ({} frames)",
            self.output_path.display(),
            self.frame_count
        );
        Ok(())
    }
}

impl Default for FfmpegPipeWriter {
    fn default() -> Self {
        Self::new(PipeOptions::default())
    }
}

/// Reads the encoder's stderr until it closes, so a chatty encoder never
/// blocks on a full pipe while we are still feeding stdin.
fn spawn_stderr_drain(mut stderr: ChildStderr) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = stderr.read_to_end(&mut buf) {
            log::debug!("Reading encoder stderr failed: {e}");
        }
        buf
    })
}

fn stderr_tail(stderr: &str) -> &str {
    if stderr.len() <= STDERR_TAIL_BYTES {
        return stderr;
    }
    let mut start = stderr.len() - STDERR_TAIL_BYTES;
    while !stderr.is_char_boundary(start) {
        start += 1;
    }
    &stderr[start..]
}

impl VideoWriter for FfmpegPipeWriter {
    fn open(&mut self, spec: &VideoSpec) -> Result<()> {
        if self.state.is_open() {
            return Ok(());
        }
        spec.validate()?;

        let args = self.options.build_args(spec);
        log::debug!("Spawning {} {}", self.options.program, args.join(" "));

        let mut child = Command::new(&self.options.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.process_failed(format!("failed to spawn: {e}")))?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(self.process_failed("stdin pipe unavailable"));
        };

        self.stderr_drain = child.stderr.take().map(spawn_stderr_drain);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.width = spec.width;
        self.height = spec.height;
        self.output_path = spec.output_path.clone();
        self.frame_count = 0;
        self.state = SessionState::Open;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.state.ensure_writable(WRITER_NAME)?;

        if !frame.has_size(self.width, self.height) {
            return Err(FramereelError::DimensionMismatch {
                source_path: format!("frame {}", frame.index()).into(),
                expected_width: self.width,
                expected_height: self.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(self.process_failed("stdin already closed"));
        };

        if let Err(e) = stdin.write_all(frame.data()) {
            let reason = format!("failed to write frame {}: {e}", self.frame_count);
            return Err(self.process_failed(reason));
        }

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.state.is_open() {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.finish()
    }
}

impl Drop for FfmpegPipeWriter {
    fn drop(&mut self) {
        if self.state.is_open() {
            if let Err(e) = self.close() {
                log::warn!("Encoder close on drop failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn spec(output: &Path, encoder: &str) -> VideoSpec {
        VideoSpec {
            frame_rate: 10,
            width: 64,
            height: 48,
            output_path: output.to_path_buf(),
            encoder_id: encoder.to_string(),
        }
    }

    #[test]
    fn test_build_args_order() {
        let args = PipeOptions::default().build_args(&spec(Path::new("/tmp/out.mp4"), "libx264"));
        let joined = args.join(" ");
        assert_eq!(
            joined,
            "-hide_banner -loglevel error -y -f rawvideo -vcodec rawvideo -s 64x48 \
             -pix_fmt bgr24 -r 10 -an -i - -c:v libx264 -pix_fmt yuv420p /tmp/out.mp4"
        );
    }

    #[test]
    fn test_build_args_custom_pixel_format() {
        let options = PipeOptions {
            pixel_format_out: "yuv444p".to_string(),
            ..PipeOptions::default()
        };
        let args = options.build_args(&spec(Path::new("out.mkv"), "libx265"));
        assert_eq!(args[args.len() - 2], "yuv444p");
        assert_eq!(args.last().unwrap(), "out.mkv");
    }

    #[test]
    fn test_stderr_tail_keeps_end() {
        let long = "x".repeat(STDERR_TAIL_BYTES) + "END";
        let tail = stderr_tail(&long);
        assert_eq!(tail.len(), STDERR_TAIL_BYTES);
        assert!(tail.ends_with("END"));
        assert_eq!(stderr_tail("short"), "short");
    }

    #[test]
    fn test_write_before_open() {
        let mut writer = FfmpegPipeWriter::default();
        let err = writer.write(&Frame::blank(64, 48)).unwrap_err();
        assert!(matches!(err, FramereelError::WriteBeforeOpen { .. }));
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let mut writer = FfmpegPipeWriter::default();
        assert!(writer.close().is_ok());
    }

    #[test]
    fn test_spawn_failure_is_process_failed() {
        let mut writer =
            FfmpegPipeWriter::new(PipeOptions::default().with_program("/nonexistent/encoder"));
        let err = writer
            .open(&spec(Path::new("/tmp/never.mp4"), "libx264"))
            .unwrap_err();
        assert!(matches!(err, FramereelError::EncoderProcessFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_process_failed() {
        let mut writer = FfmpegPipeWriter::new(PipeOptions::default().with_program("false"));
        writer
            .open(&spec(Path::new("/tmp/never.mp4"), "libx264"))
            .unwrap();
        let err = writer.close().unwrap_err();
        assert!(matches!(err, FramereelError::EncoderProcessFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_then_write_after_close() {
        let mut writer = FfmpegPipeWriter::new(PipeOptions::default().with_program("true"));
        writer
            .open(&spec(Path::new("/tmp/never.mp4"), "libx264"))
            .unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        let err = writer.write(&Frame::blank(64, 48)).unwrap_err();
        assert!(matches!(err, FramereelError::WriteAfterClose { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_twice_keeps_one_process() {
        let mut writer = FfmpegPipeWriter::new(PipeOptions::default().with_program("true"));
        let s = spec(Path::new("/tmp/never.mp4"), "libx264");
        writer.open(&s).unwrap();
        writer.open(&s).unwrap();
        writer.close().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_size_mismatch_rejected() {
        let mut writer = FfmpegPipeWriter::new(PipeOptions::default().with_program("true"));
        writer
            .open(&spec(Path::new("/tmp/never.mp4"), "libx264"))
            .unwrap();
        let err = writer.write(&Frame::blank(32, 32)).unwrap_err();
        assert!(matches!(err, FramereelError::DimensionMismatch { .. }));
        writer.close().unwrap();
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn test_chatty_encoder_does_not_stall_writes() {
        let dir = tempfile::tempdir().unwrap();
        // Fills far more than one pipe buffer of stderr before reading stdin.
        let program = write_script(
            dir.path(),
            "chatty.sh",
            "head -c 300000 /dev/zero | tr '\\0' 'e' >&2\ncat > /dev/null",
        );
        let mut writer = FfmpegPipeWriter::new(PipeOptions::default().with_program(program));
        writer
            .open(&spec(&dir.path().join("never.mp4"), "libx264"))
            .unwrap();
        for i in 0..40 {
            writer.write(&Frame::blank(64, 48).with_index(i)).unwrap();
        }
        writer.close().unwrap();
        assert_eq!(writer.frame_count(), 40);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_encoder_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = write_script(
            dir.path(),
            "fails.sh",
            "cat > /dev/null\necho 'Unknown encoder nope' >&2\nexit 3",
        );
        let mut writer = FfmpegPipeWriter::new(PipeOptions::default().with_program(program));
        writer
            .open(&spec(&dir.path().join("never.mp4"), "nope"))
            .unwrap();
        writer.write(&Frame::blank(64, 48)).unwrap();

        let err = writer.close().unwrap_err();
        assert!(err.to_string().contains("Unknown encoder nope"), "{err}");
    }

    #[test]
    fn test_encodes_real_video() {
        if !is_ffmpeg_on_path() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let mut writer = FfmpegPipeWriter::default();
        writer.open(&spec(&output, "mpeg4")).unwrap();
        for i in 0..20 {
            let v = (i * 10) as u8;
            writer
                .write(&Frame::filled(64, 48, [v, v, v]).with_index(i))
                .unwrap();
        }
        writer.close().unwrap();

        assert_eq!(writer.frame_count(), 20);
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }
}
