use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0 for still images.
    pub fps: f64,
    /// Frame count reported by the container; 0 when unknown (live capture).
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Metadata for a single decoded image.
    pub fn still_image(width: u32, height: u32, source_path: Option<PathBuf>) -> Self {
        Self {
            width,
            height,
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path,
        }
    }

    /// Same stream, different frame geometry (after resizing).
    pub fn with_dimensions(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self.clone()
        }
    }

    pub fn is_live(&self) -> bool {
        self.total_frames == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_image() {
        let meta = VideoMetadata::still_image(800, 600, None);
        assert_eq!(meta.total_frames, 1);
        assert_eq!(meta.fps, 0.0);
        assert!(!meta.is_live());
    }

    #[test]
    fn test_with_dimensions_keeps_stream_fields() {
        let meta = VideoMetadata {
            width: 1280,
            height: 720,
            fps: 30.0,
            total_frames: 0,
            codec: "rawvideo".to_string(),
            source_path: Some(PathBuf::from("/dev/video0")),
        };
        let resized = meta.with_dimensions(400, 225);
        assert_eq!((resized.width, resized.height), (400, 225));
        assert_eq!(resized.fps, 30.0);
        assert_eq!(resized.codec, "rawvideo");
        assert!(resized.is_live());
    }
}
