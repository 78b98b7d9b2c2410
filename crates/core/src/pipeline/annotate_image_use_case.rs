use std::path::Path;

use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::frame_report::FrameSummary;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

/// Single-image run: read → resize → annotate → render → write.
pub struct AnnotateImageUseCase {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    processor: FrameProcessor,
}

impl AnnotateImageUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        image_writer: Box<dyn ImageWriter>,
        processor: FrameProcessor,
    ) -> Self {
        Self {
            reader,
            image_writer,
            processor,
        }
    }

    /// Annotates the image at `input_path`. The rendered frame is written
    /// to `output_path` when one is given.
    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: Option<&Path>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<FrameSummary, Box<dyn std::error::Error>> {
        self.reader.open(input_path)?;
        let frame = self.reader.frames().next().ok_or("No frames in image")??;
        self.reader.close();

        let processed = self.processor.process(frame, logger)?;
        logger.progress(1, 1);

        if let Some(path) = output_path {
            self.image_writer.write(path, &processed.frame)?;
            logger.info(&format!("Saved annotated image to {}", path.display()));
        }

        Ok(FrameSummary::new(
            processed.frame.index(),
            processed.annotations,
        ))
    }
}
