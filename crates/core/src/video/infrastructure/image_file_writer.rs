use std::path::Path;

use crate::shared::frame::{ChannelOrder, Frame};
use crate::video::domain::image_writer::ImageWriter;

/// Saves frames with the `image` crate; PNG, JPEG and friends by extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let rgb = frame.to_channel_order(ChannelOrder::Rgb);
        let img = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.into_data())
            .ok_or("frame buffer does not match its dimensions")?;
        img.save(path)?;
        log::debug!("Wrote frame {} to {}", frame.index(), path.display());
        Ok(())
    }
}
