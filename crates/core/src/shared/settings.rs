use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::domain::face_preprocessor::TensorLayout;
use crate::annotation::domain::frame_annotator::AnnotatorConfig;
use crate::shared::constants::{
    CLASSIFIER_INPUT_SIZE, DEFAULT_BOX_THICKNESS, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_FRAME_WIDTH, DEFAULT_MAX_BATCH_SIZE, MASK_COLOR, NO_MASK_COLOR,
};
use crate::shared::frame::ChannelOrder;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistent tuning knobs, stored as JSON.
///
/// Every field has a default so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub confidence: f32,
    pub batch_size: usize,
    pub classifier_input_size: u32,
    pub classifier_channel_order: ChannelOrder,
    pub classifier_layout: TensorLayout,
    pub frame_width: u32,
    pub box_thickness: u32,
    pub mask_color: [u8; 3],
    pub no_mask_color: [u8; 3],
    pub detector_url: Option<String>,
    pub classifier_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE_THRESHOLD,
            batch_size: DEFAULT_MAX_BATCH_SIZE,
            classifier_input_size: CLASSIFIER_INPUT_SIZE,
            classifier_channel_order: ChannelOrder::Rgb,
            classifier_layout: TensorLayout::Nhwc,
            frame_width: DEFAULT_FRAME_WIDTH,
            box_thickness: DEFAULT_BOX_THICKNESS,
            mask_color: MASK_COLOR,
            no_mask_color: NO_MASK_COLOR,
            detector_url: None,
            classifier_url: None,
        }
    }
}

impl Settings {
    /// `<config_dir>/maskwatch/settings.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("maskwatch").join("settings.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the explicit file when given; otherwise the default location,
    /// falling back to built-in defaults when that file does not exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn annotator_config(&self) -> AnnotatorConfig {
        AnnotatorConfig {
            confidence_threshold: self.confidence,
            max_batch_size: self.batch_size,
            classifier_input_size: self.classifier_input_size,
            classifier_channel_order: self.classifier_channel_order,
            classifier_layout: self.classifier_layout,
            mask_color: self.mask_color,
            no_mask_color: self.no_mask_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_constants() {
        let s = Settings::default();
        assert_eq!(s.confidence, 0.5);
        assert_eq!(s.batch_size, 32);
        assert_eq!(s.classifier_input_size, 224);
        assert_eq!(s.frame_width, 400);
    }

    #[test]
    fn test_partial_file_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "confidence": 0.7, "classifier_layout": "nchw" }"#).unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.confidence, 0.7);
        assert_eq!(s.classifier_layout, TensorLayout::Nchw);
        assert_eq!(s.batch_size, DEFAULT_MAX_BATCH_SIZE);
    }

    #[test]
    fn test_round_trip_through_json() {
        let s = Settings {
            classifier_channel_order: ChannelOrder::Bgr,
            detector_url: Some("https://example.com/det.onnx".into()),
            ..Settings::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = Settings::load(Some(&tmp.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_annotator_config_mirrors_settings() {
        let s = Settings {
            confidence: 0.8,
            batch_size: 4,
            ..Settings::default()
        };
        let cfg = s.annotator_config();
        assert_eq!(cfg.confidence_threshold, 0.8);
        assert_eq!(cfg.max_batch_size, 4);
        assert_eq!(cfg.mask_color, MASK_COLOR);
    }
}
