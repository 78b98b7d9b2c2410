use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Presents a single image file as a one-frame video.
///
/// Decoded with the `image` crate and converted to RGB8, so grayscale and
/// RGBA inputs work too.
pub struct ImageFileReader {
    frame: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self { frame: None }
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let img = image::open(path)
            .map_err(|e| format!("failed to decode image {}: {e}", path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        log::debug!("Decoded {} ({width}x{height})", path.display());

        self.frame = Some(Frame::new(img.into_raw(), width, height, 3, 0));
        Ok(VideoMetadata::still_image(
            width,
            height,
            Some(path.to_path_buf()),
        ))
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
