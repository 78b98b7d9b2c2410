use std::fmt;

use ndarray::ArrayView4;
use serde::Serialize;

/// Winning class of a mask classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskLabel {
    Mask,
    NoMask,
}

impl fmt::Display for MaskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskLabel::Mask => write!(f, "Mask"),
            MaskLabel::NoMask => write!(f, "No Mask"),
        }
    }
}

/// Class probabilities for one face crop.
///
/// The pair is expected to come from a softmax and sum to 1, but this is
/// not enforced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassificationResult {
    pub mask_probability: f32,
    pub no_mask_probability: f32,
}

impl ClassificationResult {
    pub fn new(mask_probability: f32, no_mask_probability: f32) -> Self {
        Self {
            mask_probability,
            no_mask_probability,
        }
    }

    /// `Mask` only when its probability is strictly higher; ties go to `NoMask`.
    pub fn label(&self) -> MaskLabel {
        if self.mask_probability > self.no_mask_probability {
            MaskLabel::Mask
        } else {
            MaskLabel::NoMask
        }
    }

    /// Probability of the winning class.
    pub fn confidence(&self) -> f32 {
        self.mask_probability.max(self.no_mask_probability)
    }
}

/// Domain interface for the mask/no-mask classifier.
///
/// `batch` holds preprocessed face crops; the result must contain one
/// entry per crop in the same order.
pub trait MaskClassifier: Send {
    fn predict(
        &mut self,
        batch: ArrayView4<'_, f32>,
    ) -> Result<Vec<ClassificationResult>, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::masked(0.9, 0.1, MaskLabel::Mask)]
    #[case::unmasked(0.2, 0.8, MaskLabel::NoMask)]
    #[case::tie_goes_to_no_mask(0.5, 0.5, MaskLabel::NoMask)]
    fn test_label(#[case] mask: f32, #[case] no_mask: f32, #[case] expected: MaskLabel) {
        assert_eq!(ClassificationResult::new(mask, no_mask).label(), expected);
    }

    #[test]
    fn test_confidence_is_max() {
        assert_relative_eq!(ClassificationResult::new(0.3, 0.7).confidence(), 0.7);
        assert_relative_eq!(ClassificationResult::new(0.99, 0.01).confidence(), 0.99);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(MaskLabel::Mask.to_string(), "Mask");
        assert_eq!(MaskLabel::NoMask.to_string(), "No Mask");
    }
}
