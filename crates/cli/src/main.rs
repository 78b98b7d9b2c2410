use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use maskwatch_core::annotation::domain::frame_annotator::FrameAnnotator;
use maskwatch_core::classification::domain::mask_classifier::MaskClassifier;
use maskwatch_core::classification::infrastructure::onnx_mask_classifier::OnnxMaskClassifier;
use maskwatch_core::detection::domain::face_locator::FaceLocator;
use maskwatch_core::detection::infrastructure::onnx_ssd_face_locator::OnnxSsdFaceLocator;
use maskwatch_core::pipeline::annotate_image_use_case::AnnotateImageUseCase;
use maskwatch_core::pipeline::annotate_stream_use_case::{
    AnnotateStreamUseCase, FrameSink, StreamOptions,
};
use maskwatch_core::pipeline::frame_processor::FrameProcessor;
use maskwatch_core::pipeline::frame_report::{FrameSummary, RunReport};
use maskwatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use maskwatch_core::rendering::domain::annotation_renderer::AnnotationRenderer;
use maskwatch_core::rendering::infrastructure::imageproc_renderer::ImageprocRenderer;
use maskwatch_core::shared::constants::{
    CLASSIFIER_MODEL_NAME, DETECTOR_MODEL_NAME, IMAGE_EXTENSIONS,
};
use maskwatch_core::shared::model_resolver::{self, ModelLocation};
use maskwatch_core::shared::settings::Settings;
use maskwatch_core::video::domain::frame_resizer::FrameResizer;
use maskwatch_core::video::domain::video_reader::VideoReader;
use maskwatch_core::video::infrastructure::camera_stream::CameraStream;
use maskwatch_core::video::infrastructure::ffmpeg_reader::{is_capture_device, FfmpegReader};
use maskwatch_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use maskwatch_core::video::infrastructure::image_file_reader::ImageFileReader;
use maskwatch_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Detects faces and labels each one "Mask" or "No Mask".
#[derive(Parser, Debug)]
#[command(name = "maskwatch")]
struct Cli {
    /// Input image, video file, or capture device (e.g. /dev/video0).
    input: PathBuf,

    /// Annotated output: an image for image input; a video file, or a
    /// directory for per-frame PNGs, for video and camera input.
    output: Option<PathBuf>,

    /// Face detector ONNX model.
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Mask classifier ONNX model.
    #[arg(long)]
    classifier_model: Option<PathBuf>,

    /// Directory searched for models not found in the cache.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f32>,

    /// Maximum faces per classifier call.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Resize frames to this width before annotating (0 keeps the size).
    #[arg(long)]
    width: Option<u32>,

    /// TrueType font for label text.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Box outline thickness in pixels.
    #[arg(long)]
    thickness: Option<u32>,

    /// Capture input format, e.g. v4l2, avfoundation, dshow.
    #[arg(long)]
    input_format: Option<String>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Apply softmax to classifier outputs (for models exported without it).
    #[arg(long)]
    softmax: bool,

    /// Write a JSON report of all annotations.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Settings file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum InputKind {
    Image,
    Video,
    Camera,
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
    let kind = validate(&cli)?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_overrides(&mut settings, &cli);

    let processor = build_processor(&cli, &settings)?;
    let mut logger = StdoutPipelineLogger::default();

    let frames = match kind {
        InputKind::Image => vec![run_image(&cli, processor, &mut logger)?],
        InputKind::Video => run_video(&cli, processor, &mut logger)?,
        InputKind::Camera => run_camera(&cli, processor, &mut logger)?,
    };

    let report = RunReport::new(&cli.input, frames);
    log::info!(
        "Annotated {} frame(s), {} face(s)",
        report.frames.len(),
        report.total_faces()
    );
    if let Some(path) = &cli.report {
        report.write_json(path)?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn run_image(
    cli: &Cli,
    processor: FrameProcessor,
    logger: &mut StdoutPipelineLogger,
) -> Result<FrameSummary, Box<dyn std::error::Error>> {
    let mut use_case = AnnotateImageUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        processor,
    );
    let summary = use_case.execute(&cli.input, cli.output.as_deref(), logger)?;
    for a in &summary.annotations {
        log::info!("{} at {:?}", a.text(), a.bounding_box);
    }
    Ok(summary)
}

fn run_video(
    cli: &Cli,
    processor: FrameProcessor,
    logger: &mut StdoutPipelineLogger,
) -> Result<Vec<FrameSummary>, Box<dyn std::error::Error>> {
    let mut reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    let metadata = reader.open(&cli.input)?;

    let mut use_case = AnnotateStreamUseCase::new(processor, build_sink(cli), stream_options(cli));
    let result = use_case.execute(reader.frames(), &metadata, logger);
    reader.close();
    result
}

fn run_camera(
    cli: &Cli,
    processor: FrameProcessor,
    logger: &mut StdoutPipelineLogger,
) -> Result<Vec<FrameSummary>, Box<dyn std::error::Error>> {
    let reader = match &cli.input_format {
        Some(format) => FfmpegReader::new().with_input_format(format.as_str()),
        None => FfmpegReader::new(),
    };
    let mut stream = CameraStream::start(Box::new(reader), &cli.input)?;
    let metadata = stream.metadata().clone();

    let mut use_case = AnnotateStreamUseCase::new(processor, build_sink(cli), stream_options(cli));
    let result = use_case.execute(stream.frames(), &metadata, logger);
    stream.stop();
    result
}

fn build_processor(
    cli: &Cli,
    settings: &Settings,
) -> Result<FrameProcessor, Box<dyn std::error::Error>> {
    let annotator = FrameAnnotator::new(settings.annotator_config())?;

    let detector_path = model_resolver::resolve(
        &ModelLocation {
            name: DETECTOR_MODEL_NAME,
            explicit_path: cli.detector_model.as_deref(),
            bundled_dir: cli.model_dir.as_deref(),
            url: settings.detector_url.as_deref(),
        },
        Some(Box::new(download_progress)),
    )?;
    let classifier_path = model_resolver::resolve(
        &ModelLocation {
            name: CLASSIFIER_MODEL_NAME,
            explicit_path: cli.classifier_model.as_deref(),
            bundled_dir: cli.model_dir.as_deref(),
            url: settings.classifier_url.as_deref(),
        },
        Some(Box::new(download_progress)),
    )?;

    let locator: Box<dyn FaceLocator> = Box::new(OnnxSsdFaceLocator::new(&detector_path)?);
    let classifier: Box<dyn MaskClassifier> =
        Box::new(OnnxMaskClassifier::new(&classifier_path)?.with_softmax(cli.softmax));

    let mut renderer = ImageprocRenderer::new(settings.box_thickness);
    if let Some(font) = &cli.font {
        renderer = renderer.with_font_file(font)?;
    } else {
        log::warn!("No --font given; labels are drawn as color tabs without text");
    }
    let renderer: Box<dyn AnnotationRenderer> = Box::new(renderer);

    Ok(FrameProcessor::new(
        annotator,
        locator,
        classifier,
        renderer,
        FrameResizer::new(settings.frame_width),
    ))
}

fn build_sink(cli: &Cli) -> FrameSink {
    match &cli.output {
        None => FrameSink::Discard,
        Some(path) if path.extension().is_none() => FrameSink::Images {
            writer: Box::new(ImageFileWriter::new()),
            dir: path.clone(),
        },
        Some(path) => FrameSink::Video {
            writer: Box::new(FfmpegWriter::new()),
            path: path.clone(),
        },
    }
}

fn stream_options(cli: &Cli) -> StreamOptions {
    StreamOptions {
        max_frames: cli.max_frames,
        ..StreamOptions::default()
    }
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(c) = cli.confidence {
        settings.confidence = c;
    }
    if let Some(b) = cli.batch_size {
        settings.batch_size = b;
    }
    if let Some(w) = cli.width {
        settings.frame_width = w;
    }
    if let Some(t) = cli.thickness {
        settings.box_thickness = t;
    }
}

fn validate(cli: &Cli) -> Result<InputKind, Box<dyn std::error::Error>> {
    let kind = input_kind(cli);
    if kind != InputKind::Camera && !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if let Some(c) = cli.confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(format!("Confidence must be between 0.0 and 1.0, got {c}").into());
        }
    }
    if cli.batch_size == Some(0) {
        return Err("Batch size must be at least 1".into());
    }
    if cli.thickness == Some(0) {
        return Err("Thickness must be at least 1".into());
    }
    if let Some(font) = &cli.font {
        if !font.is_file() {
            return Err(format!("Font file not found: {}", font.display()).into());
        }
    }
    if let Some(output) = &cli.output {
        match kind {
            InputKind::Image if !is_image(output) => {
                return Err(format!(
                    "Output for an image input must be an image file, got {}",
                    output.display()
                )
                .into());
            }
            InputKind::Video | InputKind::Camera if is_image(output) => {
                return Err(format!(
                    "Output for video input must be a video file or a directory, got {}",
                    output.display()
                )
                .into());
            }
            _ => {}
        }
    }
    if kind == InputKind::Image && cli.max_frames.is_some() {
        log::warn!("--max-frames has no effect on image input");
    }
    Ok(kind)
}

fn input_kind(cli: &Cli) -> InputKind {
    if cli.input_format.is_some() || is_capture_device(&cli.input) {
        InputKind::Camera
    } else if is_image(&cli.input) {
        InputKind::Image
    } else {
        InputKind::Video
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("maskwatch").chain(args.iter().copied())).unwrap()
    }

    fn existing_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_input_kind_detection() {
        assert_eq!(input_kind(&parse(&["photo.JPG"])), InputKind::Image);
        assert_eq!(input_kind(&parse(&["clip.mp4"])), InputKind::Video);
        assert_eq!(input_kind(&parse(&["/dev/video0"])), InputKind::Camera);
        assert_eq!(
            input_kind(&parse(&["0", "--input-format", "avfoundation"])),
            InputKind::Camera
        );
    }

    #[test]
    fn test_missing_input_file_is_rejected() {
        let err = validate(&parse(&["/nonexistent/clip.mp4"])).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }

    #[test]
    fn test_camera_input_skips_existence_check() {
        assert_eq!(
            validate(&parse(&["/dev/video42"])).unwrap(),
            InputKind::Camera
        );
    }

    #[test]
    fn test_output_type_must_match_input() {
        let dir = tempfile::tempdir().unwrap();
        let image = existing_file(dir.path(), "in.png");
        let video = existing_file(dir.path(), "in.mp4");

        let image_to_video = parse(&[image.to_str().unwrap(), "out.mp4"]);
        assert!(validate(&image_to_video).is_err());

        let video_to_image = parse(&[video.to_str().unwrap(), "out.png"]);
        assert!(validate(&video_to_image).is_err());

        let video_to_video = parse(&[video.to_str().unwrap(), "out.mp4"]);
        assert_eq!(validate(&video_to_video).unwrap(), InputKind::Video);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let image = existing_file(dir.path(), "in.png");
        let input = image.to_str().unwrap();

        assert!(validate(&parse(&[input, "--confidence", "1.5"])).is_err());
        assert!(validate(&parse(&[input, "--batch-size", "0"])).is_err());
        assert!(validate(&parse(&[input, "--thickness", "0"])).is_err());
        assert!(validate(&parse(&[input, "--font", "/nonexistent/font.ttf"])).is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = parse(&[
            "in.png",
            "--confidence",
            "0.7",
            "--batch-size",
            "4",
            "--width",
            "0",
            "--thickness",
            "3",
        ]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &cli);

        assert_eq!(settings.confidence, 0.7);
        assert_eq!(settings.batch_size, 4);
        assert_eq!(settings.frame_width, 0);
        assert_eq!(settings.box_thickness, 3);
    }

    #[test]
    fn test_sink_selection() {
        assert!(matches!(build_sink(&parse(&["in.mp4"])), FrameSink::Discard));
        assert!(matches!(
            build_sink(&parse(&["in.mp4", "frames"])),
            FrameSink::Images { .. }
        ));
        assert!(matches!(
            build_sink(&parse(&["in.mp4", "out.mp4"])),
            FrameSink::Video { .. }
        ));
    }
}
