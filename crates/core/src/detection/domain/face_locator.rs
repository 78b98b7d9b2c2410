use ndarray::{Array2, ArrayView1};

use crate::shared::frame::Frame;

/// Values per row of a raw detection tensor:
/// `[image_id, class_id, confidence, nx1, ny1, nx2, ny2]`.
pub const DETECTION_ROW_LEN: usize = 7;

const CONFIDENCE_COL: usize = 2;
const BOX_START_COL: usize = 3;

/// Raw detector output, one row per candidate face.
///
/// Box coordinates are normalized to `[0, 1]` and must be scaled by the
/// frame size by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetections {
    rows: Array2<f32>,
}

impl RawDetections {
    pub fn new(rows: Array2<f32>) -> Result<Self, Box<dyn std::error::Error>> {
        if rows.ncols() < DETECTION_ROW_LEN && rows.nrows() > 0 {
            return Err(format!(
                "detection rows must have {DETECTION_ROW_LEN} values, got {}",
                rows.ncols()
            )
            .into());
        }
        Ok(Self { rows })
    }

    /// Builds from a flat buffer of consecutive 7-value rows.
    pub fn from_flat(data: Vec<f32>) -> Result<Self, Box<dyn std::error::Error>> {
        if data.len() % DETECTION_ROW_LEN != 0 {
            return Err(format!(
                "detection buffer length {} is not a multiple of {DETECTION_ROW_LEN}",
                data.len()
            )
            .into());
        }
        let n = data.len() / DETECTION_ROW_LEN;
        Self::new(Array2::from_shape_vec((n, DETECTION_ROW_LEN), data)?)
    }

    pub fn empty() -> Self {
        Self {
            rows: Array2::zeros((0, DETECTION_ROW_LEN)),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = RawDetection<'_>> {
        self.rows.rows().into_iter().map(RawDetection)
    }
}

/// One row of a [`RawDetections`] tensor.
#[derive(Clone, Copy, Debug)]
pub struct RawDetection<'a>(ArrayView1<'a, f32>);

impl RawDetection<'_> {
    pub fn confidence(&self) -> f32 {
        self.0[CONFIDENCE_COL]
    }

    /// `(nx1, ny1, nx2, ny2)` in normalized coordinates.
    pub fn normalized_box(&self) -> (f32, f32, f32, f32) {
        (
            self.0[BOX_START_COL],
            self.0[BOX_START_COL + 1],
            self.0[BOX_START_COL + 2],
            self.0[BOX_START_COL + 3],
        )
    }
}

/// Domain interface for locating candidate faces in a full frame.
///
/// Implementations own their model session, hence `&mut self`.
pub trait FaceLocator: Send {
    fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_flat_splits_rows() {
        let raw = RawDetections::from_flat(vec![
            0.0, 1.0, 0.9, 0.1, 0.2, 0.3, 0.4, //
            0.0, 1.0, 0.2, 0.5, 0.5, 0.6, 0.6,
        ])
        .unwrap();
        assert_eq!(raw.len(), 2);
        let first = raw.rows().next().unwrap();
        assert_eq!(first.confidence(), 0.9);
        assert_eq!(first.normalized_box(), (0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn test_from_flat_rejects_ragged_buffer() {
        assert!(RawDetections::from_flat(vec![0.0; 10]).is_err());
    }

    #[test]
    fn test_new_rejects_short_rows() {
        assert!(RawDetections::new(array![[0.0, 0.0, 0.9]]).is_err());
    }

    #[test]
    fn test_empty() {
        let raw = RawDetections::empty();
        assert!(raw.is_empty());
        assert_eq!(raw.rows().count(), 0);
    }
}
