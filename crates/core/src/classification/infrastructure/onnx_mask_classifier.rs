/// MobileNetV2 mask classifier using ONNX Runtime via `ort`.
///
/// Expects a preprocessed `[N, 224, 224, 3]` (or NCHW) batch and returns
/// `[N, 2]` scores ordered `[mask, no_mask]`.
use std::path::Path;

use ndarray::ArrayView4;

use crate::classification::domain::mask_classifier::{ClassificationResult, MaskClassifier};
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;

const NUM_CLASSES: usize = 2;

pub struct OnnxMaskClassifier {
    session: ort::session::Session,
    apply_softmax: bool,
}

impl OnnxMaskClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::info!("Loaded mask classifier {}", model_path.display());
        Ok(Self {
            session,
            apply_softmax: false,
        })
    }

    /// Apply softmax to the outputs, for exports that end in raw logits.
    pub fn with_softmax(mut self, apply: bool) -> Self {
        self.apply_softmax = apply;
        self
    }
}

impl MaskClassifier for OnnxMaskClassifier {
    fn predict(
        &mut self,
        batch: ArrayView4<'_, f32>,
    ) -> Result<Vec<ClassificationResult>, Box<dyn std::error::Error>> {
        let n = batch.shape()[0];
        let apply_softmax = self.apply_softmax;
        let input_value = ort::value::Tensor::from_array(batch.to_owned())?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("mask classifier produced no outputs".into());
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        let values: Vec<f32> = scores.iter().copied().collect();
        if values.len() != n * NUM_CLASSES {
            return Err(format!(
                "mask classifier returned shape {:?} for a batch of {n}",
                scores.shape()
            )
            .into());
        }

        Ok(values
            .chunks_exact(NUM_CLASSES)
            .map(|pair| {
                let (mask, no_mask) = if apply_softmax {
                    softmax_pair(pair[0], pair[1])
                } else {
                    (pair[0], pair[1])
                };
                ClassificationResult::new(mask, no_mask)
            })
            .collect())
    }
}

/// Numerically stable two-class softmax.
fn softmax_pair(a: f32, b: f32) -> (f32, f32) {
    let m = a.max(b);
    let ea = (a - m).exp();
    let eb = (b - m).exp();
    let sum = ea + eb;
    (ea / sum, eb / sum)
}
