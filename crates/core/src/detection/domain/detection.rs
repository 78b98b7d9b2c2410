use crate::detection::domain::face_locator::RawDetections;
use crate::shared::bounding_box::BoundingBox;

/// A face candidate that passed the confidence filter, in pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub confidence: f32,
}

impl Detection {
    /// Keeps rows whose confidence is strictly above `threshold` and maps
    /// their boxes into clamped frame coordinates. Row order is preserved.
    pub fn decode(
        raw: &RawDetections,
        frame_width: u32,
        frame_height: u32,
        threshold: f32,
    ) -> Vec<Detection> {
        raw.rows()
            .filter(|row| row.confidence() > threshold)
            .map(|row| {
                let (nx1, ny1, nx2, ny2) = row.normalized_box();
                Detection {
                    bounding_box: BoundingBox::from_normalized(
                        nx1,
                        ny1,
                        nx2,
                        ny2,
                        frame_width,
                        frame_height,
                    ),
                    confidence: row.confidence(),
                }
            })
            .collect()
    }
}
