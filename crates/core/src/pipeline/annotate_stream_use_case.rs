use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::frame_report::FrameSummary;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_writer::VideoWriter;

/// Where annotated frames go.
pub enum FrameSink {
    /// Encode into one video file. Opened on the first frame so the
    /// resized dimensions are known.
    Video {
        writer: Box<dyn VideoWriter>,
        path: PathBuf,
    },
    /// One image per frame, `frame_000042.png` style, inside `dir`.
    Images {
        writer: Box<dyn ImageWriter>,
        dir: PathBuf,
    },
    /// Annotate only; frames are dropped after reporting.
    Discard,
}

/// Options for [`AnnotateStreamUseCase`].
pub struct StreamOptions {
    /// Stop after this many frames.
    pub max_frames: Option<usize>,
    /// Checked before each frame.
    pub cancelled: Arc<AtomicBool>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_frames: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Annotates a frame stream (video file or camera) until it ends, the
/// frame limit is hit, or the run is cancelled.
pub struct AnnotateStreamUseCase {
    processor: FrameProcessor,
    sink: FrameSink,
    options: StreamOptions,
    writer_open: bool,
}

impl AnnotateStreamUseCase {
    pub fn new(processor: FrameProcessor, sink: FrameSink, options: StreamOptions) -> Self {
        Self {
            processor,
            sink,
            options,
            writer_open: false,
        }
    }

    /// Runs over `frames` and returns one summary per processed frame.
    ///
    /// The sink is closed even when a frame fails; the first error wins.
    pub fn execute<I>(
        &mut self,
        frames: I,
        metadata: &VideoMetadata,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<FrameSummary>, Box<dyn std::error::Error>>
    where
        I: Iterator<Item = Result<Frame, Box<dyn std::error::Error>>>,
    {
        let mut summaries = Vec::new();
        let result = self.run(frames, metadata, logger, &mut summaries);
        let closed = self.close_sink();
        logger.summary();
        result?;
        closed?;
        Ok(summaries)
    }

    fn run<I>(
        &mut self,
        frames: I,
        metadata: &VideoMetadata,
        logger: &mut dyn PipelineLogger,
        summaries: &mut Vec<FrameSummary>,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        I: Iterator<Item = Result<Frame, Box<dyn std::error::Error>>>,
    {
        let total = match self.options.max_frames {
            Some(max) if metadata.total_frames > 0 => max.min(metadata.total_frames),
            Some(max) => max,
            None => metadata.total_frames,
        };

        for frame in frames {
            if self.options.cancelled.load(Ordering::Relaxed) {
                logger.info("Cancelled");
                break;
            }
            if self
                .options
                .max_frames
                .is_some_and(|max| summaries.len() >= max)
            {
                break;
            }

            let processed = self.processor.process(frame?, logger)?;

            let t0 = Instant::now();
            self.write(&processed.frame, metadata)?;
            logger.timing("write", t0.elapsed().as_secs_f64() * 1000.0);

            summaries.push(FrameSummary::new(
                processed.frame.index(),
                processed.annotations,
            ));
            logger.progress(summaries.len(), total);
        }
        Ok(())
    }

    fn write(
        &mut self,
        frame: &Frame,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &mut self.sink {
            FrameSink::Video { writer, path } => {
                if !self.writer_open {
                    let out_meta = metadata.with_dimensions(frame.width(), frame.height());
                    writer.open(path, &out_meta)?;
                    self.writer_open = true;
                }
                writer.write(frame)
            }
            FrameSink::Images { writer, dir } => {
                writer.write(&frame_image_path(dir, frame.index()), frame)
            }
            FrameSink::Discard => Ok(()),
        }
    }

    fn close_sink(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let FrameSink::Video { writer, .. } = &mut self.sink {
            if self.writer_open {
                self.writer_open = false;
                return writer.close();
            }
        }
        Ok(())
    }
}

fn frame_image_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{index:06}.png"))
}
