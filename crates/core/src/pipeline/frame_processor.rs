use std::time::Instant;

use crate::annotation::domain::annotation::Annotation;
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::classification::domain::mask_classifier::MaskClassifier;
use crate::detection::domain::face_locator::FaceLocator;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::rendering::domain::annotation_renderer::AnnotationRenderer;
use crate::shared::frame::Frame;
use crate::video::domain::frame_resizer::FrameResizer;

/// Per-frame work shared by the image and stream use cases:
/// resize → annotate → render.
pub struct FrameProcessor {
    annotator: FrameAnnotator,
    locator: Box<dyn FaceLocator>,
    classifier: Box<dyn MaskClassifier>,
    renderer: Box<dyn AnnotationRenderer>,
    resizer: FrameResizer,
}

/// A rendered frame and the annotations drawn on it.
pub struct ProcessedFrame {
    pub frame: Frame,
    pub annotations: Vec<Annotation>,
}

impl FrameProcessor {
    pub fn new(
        annotator: FrameAnnotator,
        locator: Box<dyn FaceLocator>,
        classifier: Box<dyn MaskClassifier>,
        renderer: Box<dyn AnnotationRenderer>,
        resizer: FrameResizer,
    ) -> Self {
        Self {
            annotator,
            locator,
            classifier,
            renderer,
            resizer,
        }
    }

    pub fn process(
        &mut self,
        frame: Frame,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ProcessedFrame, Box<dyn std::error::Error>> {
        let mut frame = self.resizer.resize(frame)?;

        let t0 = Instant::now();
        let annotations =
            self.annotator
                .annotate(&frame, self.locator.as_mut(), self.classifier.as_mut())?;
        logger.timing("detect+classify", t0.elapsed().as_secs_f64() * 1000.0);
        logger.metric("faces", annotations.len() as f64);

        let t0 = Instant::now();
        self.renderer.render(&mut frame, &annotations)?;
        logger.timing("render", t0.elapsed().as_secs_f64() * 1000.0);

        for a in &annotations {
            log::debug!(
                "Frame {}: {} at ({}, {}, {}, {})",
                frame.index(),
                a.text(),
                a.bounding_box.start_x,
                a.bounding_box.start_y,
                a.bounding_box.end_x,
                a.bounding_box.end_y
            );
        }

        Ok(ProcessedFrame { frame, annotations })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Stubs shared by the pipeline use case tests.

    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use ndarray::ArrayView4;

    use super::*;
    use crate::annotation::domain::frame_annotator::AnnotatorConfig;
    use crate::classification::domain::mask_classifier::ClassificationResult;
    use crate::detection::domain::face_locator::RawDetections;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::domain::video_reader::VideoReader;

    /// Reports one face covering the central quarter of every frame.
    pub struct CenterFaceLocator;

    impl FaceLocator for CenterFaceLocator {
        fn detect(&mut self, _frame: &Frame) -> Result<RawDetections, Box<dyn std::error::Error>> {
            RawDetections::from_flat(vec![0.0, 1.0, 0.9, 0.25, 0.25, 0.75, 0.75])
        }
    }

    /// Classifies every face with the same probabilities.
    pub struct FixedClassifier(pub f32, pub f32);

    impl MaskClassifier for FixedClassifier {
        fn predict(
            &mut self,
            batch: ArrayView4<'_, f32>,
        ) -> Result<Vec<ClassificationResult>, Box<dyn std::error::Error>> {
            Ok((0..batch.shape()[0])
                .map(|_| ClassificationResult::new(self.0, self.1))
                .collect())
        }
    }

    /// Records the number of annotations per rendered frame.
    pub struct RecordingRenderer {
        pub calls: Arc<Mutex<Vec<usize>>>,
    }

    impl RecordingRenderer {
        pub fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl AnnotationRenderer for RecordingRenderer {
        fn render(
            &self,
            _frame: &mut Frame,
            annotations: &[Annotation],
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().push(annotations.len());
            Ok(())
        }
    }

    pub struct StubReader {
        pub frames: Vec<Frame>,
        pub closed: Arc<Mutex<bool>>,
    }

    impl StubReader {
        pub fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            let (w, h) = self
                .frames
                .first()
                .map(|f| (f.width(), f.height()))
                .unwrap_or((0, 0));
            Ok(VideoMetadata {
                width: w,
                height: h,
                fps: 25.0,
                total_frames: self.frames.len(),
                codec: String::new(),
                source_path: None,
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(Ok))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    pub fn gray_frame(index: usize, w: u32, h: u32) -> Frame {
        Frame::new(vec![100u8; (w * h * 3) as usize], w, h, 3, index)
    }

    pub fn processor(
        classifier: FixedClassifier,
        renderer: RecordingRenderer,
        resizer: FrameResizer,
    ) -> FrameProcessor {
        let annotator = FrameAnnotator::new(AnnotatorConfig {
            classifier_input_size: 16,
            ..AnnotatorConfig::default()
        })
        .unwrap();
        FrameProcessor::new(
            annotator,
            Box::new(CenterFaceLocator),
            Box::new(classifier),
            Box::new(renderer),
            resizer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::classification::domain::mask_classifier::MaskLabel;
    use crate::pipeline::pipeline_logger::StdoutPipelineLogger;
    use crate::shared::bounding_box::BoundingBox;

    #[test]
    fn test_process_resizes_then_annotates() {
        let renderer = RecordingRenderer::new();
        let calls = renderer.calls.clone();
        let mut processor = processor(FixedClassifier(0.8, 0.2), renderer, FrameResizer::new(40));
        let mut logger = StdoutPipelineLogger::new(10);

        let out = processor.process(gray_frame(0, 80, 60), &mut logger).unwrap();

        assert_eq!((out.frame.width(), out.frame.height()), (40, 30));
        assert_eq!(out.annotations.len(), 1);
        assert_eq!(out.annotations[0].bounding_box, BoundingBox::new(10, 7, 30, 22));
        assert_eq!(out.annotations[0].label, MaskLabel::Mask);
        assert_eq!(*calls.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_process_reports_timings_and_face_metric() {
        let mut processor = processor(
            FixedClassifier(0.1, 0.9),
            RecordingRenderer::new(),
            FrameResizer::disabled(),
        );
        let mut logger = StdoutPipelineLogger::new(10);

        processor.process(gray_frame(0, 20, 20), &mut logger).unwrap();

        assert_eq!(logger.timings_for("detect+classify").unwrap().len(), 1);
        assert_eq!(logger.timings_for("render").unwrap().len(), 1);
        assert_eq!(logger.metrics_for("faces").unwrap(), &[1.0]);
    }
}
