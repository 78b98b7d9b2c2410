use std::path::Path;

use serde::Serialize;

use crate::annotation::domain::annotation::Annotation;
use crate::classification::domain::mask_classifier::MaskLabel;

/// What was found in one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameSummary {
    pub index: usize,
    pub faces: usize,
    pub masked: usize,
    pub unmasked: usize,
    pub annotations: Vec<Annotation>,
}

impl FrameSummary {
    pub fn new(index: usize, annotations: Vec<Annotation>) -> Self {
        let masked = annotations
            .iter()
            .filter(|a| a.label == MaskLabel::Mask)
            .count();
        Self {
            index,
            faces: annotations.len(),
            masked,
            unmasked: annotations.len() - masked,
            annotations,
        }
    }
}

/// JSON report for a whole run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub source: String,
    pub frames: Vec<FrameSummary>,
}

impl RunReport {
    pub fn new(source: &Path, frames: Vec<FrameSummary>) -> Self {
        Self {
            source: source.display().to_string(),
            frames,
        }
    }

    pub fn total_faces(&self) -> usize {
        self.frames.iter().map(|f| f.faces).sum()
    }

    pub fn write_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| format!("failed to write report {}: {e}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    fn annotation(label: MaskLabel) -> Annotation {
        Annotation {
            bounding_box: BoundingBox::new(1, 2, 3, 4),
            label,
            probability: 0.75,
            color: [0, 255, 0],
        }
    }

    #[test]
    fn test_summary_counts_labels() {
        let summary = FrameSummary::new(
            3,
            vec![
                annotation(MaskLabel::Mask),
                annotation(MaskLabel::NoMask),
                annotation(MaskLabel::Mask),
            ],
        );
        assert_eq!(summary.index, 3);
        assert_eq!(summary.faces, 3);
        assert_eq!(summary.masked, 2);
        assert_eq!(summary.unmasked, 1);
    }

    #[test]
    fn test_report_json_shape() {
        let report = RunReport::new(
            Path::new("in.jpg"),
            vec![FrameSummary::new(0, vec![annotation(MaskLabel::NoMask)])],
        );
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["source"], "in.jpg");
        let ann = &value["frames"][0]["annotations"][0];
        assert_eq!(ann["label"], "no_mask");
        assert_eq!(ann["bounding_box"]["end_y"], 4);
        assert_eq!(ann["color"][1], 255);
        assert_eq!(value["frames"][0]["unmasked"], 1);
    }

    #[test]
    fn test_write_json_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RunReport::new(Path::new("cam"), vec![FrameSummary::new(0, Vec::new())]);
        report.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"faces\": 0"));
        assert_eq!(report.total_faces(), 0);
    }
}
