mod settings;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use framereel_core::pipeline::assemble_video_use_case::{AssembleVideoUseCase, AssemblyConfig};
use framereel_core::pipeline::extract_frames_use_case::{ExtractFramesUseCase, ExtractionConfig};
use framereel_core::sequence::domain::sequence_plan::TitleCard;
use framereel_core::sequence::infrastructure::directory_frame_source::DirectoryFrameSource;
use framereel_core::shared::image_extension::ImageExtension;
use framereel_core::shared::progress::ProgressCallback;
use framereel_core::shared::video_spec::VideoSpec;
use framereel_core::video::domain::frame_decoder::FrameDecoder;
use framereel_core::video::domain::video_reader::VideoReader;
use framereel_core::video::infrastructure::backend_factory::{create_backend, EncoderBackend};
use framereel_core::video::infrastructure::ffmpeg_batch_encoder::BatchOptions;
use framereel_core::video::infrastructure::ffmpeg_pipe_writer::PipeOptions;
use framereel_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use framereel_core::video::infrastructure::image_file_decoder::ImageFileDecoder;
use framereel_core::video::infrastructure::image_file_writer::ImageFileWriter;

use settings::{BackendKind, CardColor, Settings};

/// Assemble videos from image sequences and extract frames from videos.
#[derive(Parser)]
#[command(name = "framereel", version)]
struct Cli {
    /// Settings file (default: <config dir>/framereel/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a directory of images into a video.
    Assemble(AssembleArgs),
    /// Write every frame of a video as a numbered image.
    Extract(ExtractArgs),
    /// Print the metadata of a video.
    Probe {
        /// Video file to open.
        video: PathBuf,
    },
    /// List the frames of an image directory in encoding order.
    List {
        /// Image directory.
        dir: PathBuf,

        /// Image type: png or jpg.
        #[arg(long)]
        extension: Option<ImageExtension>,
    },
    /// Write the effective defaults to the settings file.
    Settings,
}

#[derive(Parser)]
struct AssembleArgs {
    /// Directory of source images.
    source_dir: PathBuf,

    /// Output video file.
    output: PathBuf,

    /// Encoder backend.
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Frame width (default: width of the first image).
    #[arg(long)]
    width: Option<u32>,

    /// Frame height (default: height of the first image).
    #[arg(long)]
    height: Option<u32>,

    /// Four-character code (native) or ffmpeg encoder name (pipe, batch).
    #[arg(long)]
    encoder: Option<String>,

    /// Image type: png or jpg.
    #[arg(long)]
    extension: Option<ImageExtension>,

    /// Batch quality factor (0=lossless, 51=worst).
    #[arg(long)]
    crf: Option<u32>,

    /// Output pixel format for the pipe and batch backends.
    #[arg(long)]
    pix_fmt: Option<String>,

    /// ffmpeg executable for the pipe and batch backends.
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Seconds of title card before the images.
    #[arg(long)]
    prologue_seconds: Option<u32>,

    /// Seconds of credit card after the images.
    #[arg(long)]
    epilogue_seconds: Option<u32>,

    /// Image shown as the title card.
    #[arg(long)]
    title_image: Option<PathBuf>,

    /// Image shown as the credit card.
    #[arg(long)]
    credit_image: Option<PathBuf>,

    /// Solid colour for cards without an image.
    #[arg(long, value_enum)]
    card_color: Option<CardColor>,
}

#[derive(Parser)]
struct ExtractArgs {
    /// Video file to read.
    video: PathBuf,

    /// Directory for the extracted images.
    output_dir: PathBuf,

    /// File name prefix.
    #[arg(long)]
    prefix: Option<String>,

    /// Image type: png or jpg.
    #[arg(long)]
    extension: Option<ImageExtension>,

    /// Number of the first image.
    #[arg(long)]
    start_id: Option<u64>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref());

    match cli.command {
        Command::Assemble(args) => run_assemble(args, &settings),
        Command::Extract(args) => run_extract(args, &settings),
        Command::Probe { video } => run_probe(&video),
        Command::List { dir, extension } => {
            run_list(&dir, extension.unwrap_or(settings.extension))
        }
        Command::Settings => {
            let path = settings.save(cli.settings.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            log::info!("Settings written to {}", path.display());
            Ok(())
        }
    }
}

fn run_assemble(args: AssembleArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let backend_kind = args.backend.unwrap_or(settings.backend);
    let extension = args.extension.unwrap_or(settings.extension);
    let decoder = ImageFileDecoder::new();

    let (width, height) = resolve_size(&args, settings, &args.source_dir, extension, &decoder)?;

    let spec = VideoSpec {
        frame_rate: args.fps.unwrap_or(settings.frame_rate),
        width,
        height,
        output_path: args.output.clone(),
        encoder_id: args
            .encoder
            .clone()
            .unwrap_or_else(|| settings.encoder_for(backend_kind).to_string()),
    };

    let card_color = args.card_color.unwrap_or(settings.card_color);
    let prologue = title_card(
        args.prologue_seconds.unwrap_or(settings.prologue_seconds),
        args.title_image.clone(),
        card_color,
    );
    let epilogue = title_card(
        args.epilogue_seconds.unwrap_or(settings.epilogue_seconds),
        args.credit_image.clone(),
        card_color,
    );

    let program = args
        .ffmpeg
        .clone()
        .unwrap_or_else(|| settings.ffmpeg_program.clone());
    let pixel_format_out = args
        .pix_fmt
        .clone()
        .unwrap_or_else(|| settings.pixel_format_out.clone());
    let backend_config = match backend_kind {
        BackendKind::Native => EncoderBackend::Native,
        BackendKind::Pipe => EncoderBackend::StreamingPipe(PipeOptions {
            pixel_format_out,
            ..PipeOptions::default().with_program(program)
        }),
        BackendKind::Batch => EncoderBackend::BatchInvocation(BatchOptions {
            crf: args.crf.unwrap_or(settings.crf),
            pixel_format_out,
            program,
        }),
    };

    let config = AssemblyConfig {
        spec,
        source_dir: args.source_dir,
        extension,
        prologue,
        epilogue,
    };

    let progress: ProgressCallback = Box::new(|p| {
        eprint!("\rWriting frame {}/{}", p.current, p.total);
        true
    });

    let mut use_case = AssembleVideoUseCase::new(
        Box::new(decoder),
        create_backend(&backend_config),
        Some(progress),
        None,
    );
    let summary = use_case.execute(&config)?;
    eprintln!();
    log::info!(
        "Output written to {} ({} frames)",
        summary.output_path.display(),
        summary.total_frames
    );
    Ok(())
}

/// Explicit flags win, then settings, then the first image's size.
fn resolve_size(
    args: &AssembleArgs,
    settings: &Settings,
    source_dir: &Path,
    extension: ImageExtension,
    decoder: &dyn FrameDecoder,
) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let width = args.width.or(settings.width);
    let height = args.height.or(settings.height);
    if let (Some(w), Some(h)) = (width, height) {
        return Ok((w, h));
    }

    let frames = DirectoryFrameSource::new(source_dir, extension).list_frames()?;
    let Some(first) = frames.first() else {
        // Let the assembler report the empty source.
        return Ok((width.unwrap_or(1), height.unwrap_or(1)));
    };
    let frame = decoder.decode(first)?;
    Ok((
        width.unwrap_or(frame.width()),
        height.unwrap_or(frame.height()),
    ))
}

fn title_card(seconds: u32, image: Option<PathBuf>, color: CardColor) -> Option<TitleCard> {
    if seconds == 0 {
        return None;
    }
    Some(match image {
        Some(path) => TitleCard::image(seconds, path),
        None => TitleCard::solid(seconds, color.bgr()),
    })
}

fn run_extract(args: ExtractArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let config = ExtractionConfig {
        video_path: args.video,
        output_dir: args.output_dir,
        prefix: args.prefix.unwrap_or_else(|| settings.image_prefix.clone()),
        extension: args.extension.unwrap_or(settings.extension),
        start_id: args.start_id.unwrap_or(settings.image_start_id),
        max_frames: args.max_frames,
    };

    let progress: ProgressCallback = Box::new(|p| {
        eprint!("\rExtracting frame {}/{}", p.current, p.total);
        true
    });

    let mut use_case = ExtractFramesUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(ImageFileWriter::new()),
        Some(progress),
        None,
    );
    let summary = use_case.execute(&config)?;
    eprintln!();
    log::info!(
        "Wrote {} of {} reported frames to {}",
        summary.frames_written,
        summary.reported_frame_count,
        summary.output_dir.display()
    );
    Ok(())
}

fn run_probe(video: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = FfmpegReader::new();
    let metadata = reader.open(video)?;
    println!("path:   {}", video.display());
    println!("size:   {}x{}", metadata.width, metadata.height);
    println!("fps:    {:.3}", metadata.fps);
    println!("frames: {}", reader.frame_count());
    println!("codec:  {}", metadata.codec);
    reader.close();
    Ok(())
}

fn run_list(dir: &Path, extension: ImageExtension) -> Result<(), Box<dyn std::error::Error>> {
    let frames = DirectoryFrameSource::new(dir, extension).list_frames()?;
    for path in &frames {
        println!("{}", path.display());
    }

    match frames.first() {
        Some(first) => {
            let frame = ImageFileDecoder::new().decode(first)?;
            eprintln!(
                "{} {} images, first is {}x{}",
                frames.len(),
                extension,
                frame.width(),
                frame.height()
            );
        }
        None => eprintln!("No {extension} images in {}", dir.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use framereel_core::shared::frame::Frame;
    use framereel_core::video::domain::image_writer::ImageWriter;

    #[test]
    fn test_title_card_zero_seconds_is_none() {
        assert!(title_card(0, None, CardColor::White).is_none());
    }

    #[test]
    fn test_title_card_prefers_image() {
        let card = title_card(2, Some(PathBuf::from("t.png")), CardColor::White).unwrap();
        assert_eq!(card, TitleCard::image(2, "t.png"));

        let card = title_card(1, None, CardColor::White).unwrap();
        assert_eq!(card, TitleCard::solid(1, [255, 255, 255]));
    }

    #[test]
    fn test_parse_assemble_flags() {
        let cli = Cli::try_parse_from([
            "framereel",
            "assemble",
            "frames",
            "out.mp4",
            "--backend",
            "pipe",
            "--fps",
            "24",
            "--extension",
            "jpg",
            "--prologue-seconds",
            "2",
        ])
        .unwrap();
        let Command::Assemble(args) = cli.command else {
            panic!("expected assemble");
        };
        assert_eq!(args.backend, Some(BackendKind::Pipe));
        assert_eq!(args.fps, Some(24));
        assert_eq!(args.extension, Some(ImageExtension::Jpg));
        assert_eq!(args.prologue_seconds, Some(2));
    }

    #[test]
    fn test_resolve_size_prefers_flags() {
        let cli = Cli::try_parse_from([
            "framereel", "assemble", "frames", "out.mp4", "--width", "320", "--height", "240",
        ])
        .unwrap();
        let Command::Assemble(args) = cli.command else {
            panic!("expected assemble");
        };
        let size = resolve_size(
            &args,
            &Settings::default(),
            Path::new("/nonexistent"),
            ImageExtension::Png,
            &ImageFileDecoder::new(),
        )
        .unwrap();
        assert_eq!(size, (320, 240));
    }

    #[test]
    fn test_resolve_size_from_first_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();
        let first = dir.path().join("a.png");
        ImageFileWriter::new()
            .write(&first, &Frame::blank(40, 30))
            .unwrap();

        let cli = Cli::try_parse_from(["framereel", "assemble", "frames", "out.mp4"]).unwrap();
        let Command::Assemble(args) = cli.command else {
            panic!("expected assemble");
        };
        let size = resolve_size(
            &args,
            &Settings::default(),
            dir.path(),
            ImageExtension::Png,
            &ImageFileDecoder::new(),
        )
        .unwrap();
        assert_eq!(size, (40, 30));
    }
}
