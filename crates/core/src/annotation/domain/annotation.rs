use serde::Serialize;

use crate::classification::domain::mask_classifier::MaskLabel;
use crate::shared::bounding_box::BoundingBox;

/// Drawing instruction for one classified face.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Annotation {
    pub bounding_box: BoundingBox,
    pub label: MaskLabel,
    /// Probability of `label`, in `[0, 1]`.
    pub probability: f32,
    /// RGB color used for the box and label.
    pub color: [u8; 3],
}

impl Annotation {
    /// Display text such as `"Mask: 97.31%"`.
    pub fn text(&self) -> String {
        format!("{}: {:.2}%", self.label, self.probability as f64 * 100.0)
    }
}
