use ndarray::{s, Array4, Axis};
use thiserror::Error;

use crate::annotation::domain::annotation::Annotation;
use crate::annotation::domain::face_preprocessor::{FacePreprocessor, TensorLayout};
use crate::classification::domain::mask_classifier::{
    ClassificationResult, MaskClassifier, MaskLabel,
};
use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{
    CLASSIFIER_INPUT_SIZE, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_BATCH_SIZE, MASK_COLOR,
    NO_MASK_COLOR,
};
use crate::shared::frame::{ChannelOrder, Frame};

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("face locator failed: {0}")]
    Locator(#[source] Box<dyn std::error::Error>),
    #[error("face preprocessing failed: {0}")]
    Preprocess(#[source] Box<dyn std::error::Error>),
    #[error("mask classifier failed: {0}")]
    Classifier(#[source] Box<dyn std::error::Error>),
    #[error("face {index} has an empty crop at {bounding_box:?}")]
    EmptyCrop {
        index: usize,
        bounding_box: BoundingBox,
    },
    #[error("mask classifier returned {actual} results for {expected} faces")]
    ResultCountMismatch { expected: usize, actual: usize },
    #[error("invalid annotator config: {0}")]
    InvalidConfig(String),
}

/// Tuning for [`FrameAnnotator`].
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatorConfig {
    /// Detections must score strictly above this to be classified.
    pub confidence_threshold: f32,
    /// Faces per classifier call; larger sets are split into chunks.
    pub max_batch_size: usize,
    pub classifier_input_size: u32,
    pub classifier_channel_order: ChannelOrder,
    pub classifier_layout: TensorLayout,
    pub mask_color: [u8; 3],
    pub no_mask_color: [u8; 3],
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            classifier_input_size: CLASSIFIER_INPUT_SIZE,
            classifier_channel_order: ChannelOrder::Rgb,
            classifier_layout: TensorLayout::Nhwc,
            mask_color: MASK_COLOR,
            no_mask_color: NO_MASK_COLOR,
        }
    }
}

impl AnnotatorConfig {
    pub fn validate(&self) -> Result<(), AnnotateError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AnnotateError::InvalidConfig(format!(
                "confidence threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            )));
        }
        if self.max_batch_size == 0 {
            return Err(AnnotateError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.classifier_input_size == 0 {
            return Err(AnnotateError::InvalidConfig(
                "classifier input size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Detects faces, classifies each for a mask and produces drawing
/// instructions: detect → filter → clamp → crop/normalize → classify → label.
///
/// Holds no per-frame state. The detector and classifier are passed in on
/// every call so callers own the model sessions.
#[derive(Clone, Debug)]
pub struct FrameAnnotator {
    config: AnnotatorConfig,
    preprocessor: FacePreprocessor,
}

impl FrameAnnotator {
    pub fn new(config: AnnotatorConfig) -> Result<Self, AnnotateError> {
        config.validate()?;
        let preprocessor = FacePreprocessor::new(
            config.classifier_input_size,
            config.classifier_channel_order,
            config.classifier_layout,
        );
        Ok(Self {
            config,
            preprocessor,
        })
    }

    /// Annotates one frame.
    ///
    /// Returns one entry per detection above the threshold, in detector
    /// order. The classifier is not called when no face qualifies. A
    /// qualifying face whose clamped box covers no pixels fails the frame.
    pub fn annotate(
        &self,
        frame: &Frame,
        locator: &mut dyn FaceLocator,
        classifier: &mut dyn MaskClassifier,
    ) -> Result<Vec<Annotation>, AnnotateError> {
        let raw = locator.detect(frame).map_err(AnnotateError::Locator)?;
        let detections = Detection::decode(
            &raw,
            frame.width(),
            frame.height(),
            self.config.confidence_threshold,
        );
        log::debug!(
            "Frame {}: {} of {} candidates above {}",
            frame.index(),
            detections.len(),
            raw.len(),
            self.config.confidence_threshold
        );
        if detections.is_empty() {
            return Ok(Vec::new());
        }

        let boxes: Vec<_> = detections.iter().map(|d| d.bounding_box).collect();
        if let Some(index) = boxes.iter().position(|b| b.is_empty()) {
            return Err(AnnotateError::EmptyCrop {
                index,
                bounding_box: boxes[index],
            });
        }
        let faces = self
            .preprocessor
            .prepare(frame, &boxes)
            .map_err(AnnotateError::Preprocess)?;

        let results = self.classify(&faces.batch, classifier)?;

        Ok(faces
            .boxes
            .iter()
            .zip(results)
            .map(|(bbox, result)| self.to_annotation(*bbox, result))
            .collect())
    }

    /// Runs the classifier over the batch in chunks of at most
    /// `max_batch_size`, checking that every chunk yields one result per face.
    fn classify(
        &self,
        batch: &Array4<f32>,
        classifier: &mut dyn MaskClassifier,
    ) -> Result<Vec<ClassificationResult>, AnnotateError> {
        let total = batch.len_of(Axis(0));
        let mut results = Vec::with_capacity(total);
        let mut start = 0;
        while start < total {
            let end = (start + self.config.max_batch_size).min(total);
            let chunk = batch.slice(s![start..end, .., .., ..]);
            let chunk_results = classifier
                .predict(chunk)
                .map_err(AnnotateError::Classifier)?;
            if chunk_results.len() != end - start {
                return Err(AnnotateError::ResultCountMismatch {
                    expected: end - start,
                    actual: chunk_results.len(),
                });
            }
            results.extend(chunk_results);
            start = end;
        }
        Ok(results)
    }

    fn to_annotation(
        &self,
        bounding_box: BoundingBox,
        result: ClassificationResult,
    ) -> Annotation {
        let label = result.label();
        let color = match label {
            MaskLabel::Mask => self.config.mask_color,
            MaskLabel::NoMask => self.config.no_mask_color,
        };
        Annotation {
            bounding_box,
            label,
            probability: result.confidence(),
            color,
        }
    }
}
