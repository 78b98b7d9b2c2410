use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::annotation::domain::annotation::Annotation;
use crate::rendering::domain::annotation_renderer::AnnotationRenderer;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_BOX_THICKNESS;
use crate::shared::frame::{ChannelOrder, Frame};

/// Label text height in pixels.
const TEXT_SCALE: f32 = 14.0;
/// Gap between the text baseline and the top edge of the box.
const TEXT_OFFSET: i32 = 10;
/// Height of the colored tab drawn instead of text when no font is loaded.
const LABEL_TAB_HEIGHT: u32 = 6;

/// CPU renderer built on `imageproc`.
///
/// Draws a hollow rectangle per face and, when a TrueType font is loaded,
/// the label text above it. Without a font a filled tab in the label color
/// marks the box instead.
pub struct ImageprocRenderer {
    thickness: u32,
    font: Option<FontVec>,
}

impl ImageprocRenderer {
    pub fn new(thickness: u32) -> Self {
        Self {
            thickness: thickness.max(1),
            font: None,
        }
    }

    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self
    }

    /// Loads a `.ttf`/`.otf` file for label text.
    pub fn with_font_file(self, path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("failed to read font {}: {e}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)?;
        log::info!("Loaded label font {}", path.display());
        Ok(self.with_font(font))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_box(&self, img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
        // End coordinates are inclusive, like cv2.rectangle
        let w = bbox.width() + 1;
        let h = bbox.height() + 1;
        for t in 0..self.thickness as i32 {
            let (iw, ih) = (w - 2 * t, h - 2 * t);
            if iw <= 0 || ih <= 0 {
                break;
            }
            let rect = Rect::at(bbox.start_x + t, bbox.start_y + t).of_size(iw as u32, ih as u32);
            draw_hollow_rect_mut(img, rect, color);
        }
    }

    fn draw_label(&self, img: &mut RgbImage, annotation: &Annotation, color: Rgb<u8>) {
        let bbox = &annotation.bounding_box;
        match &self.font {
            Some(font) => {
                // OpenCV anchors text at its baseline, imageproc at its top edge
                let y = (bbox.start_y - TEXT_OFFSET - TEXT_SCALE as i32).max(0);
                draw_text_mut(
                    img,
                    color,
                    bbox.start_x.max(0),
                    y,
                    PxScale::from(TEXT_SCALE),
                    font,
                    &annotation.text(),
                );
            }
            None => {
                let y = if bbox.start_y >= LABEL_TAB_HEIGHT as i32 {
                    bbox.start_y - LABEL_TAB_HEIGHT as i32
                } else {
                    bbox.start_y
                };
                let width = (bbox.width() + 1).max(1) as u32;
                let rect = Rect::at(bbox.start_x, y).of_size(width, LABEL_TAB_HEIGHT);
                draw_filled_rect_mut(img, rect, color);
            }
        }
    }
}

impl Default for ImageprocRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_BOX_THICKNESS)
    }
}

impl AnnotationRenderer for ImageprocRenderer {
    fn render(
        &self,
        frame: &mut Frame,
        annotations: &[Annotation],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if annotations.is_empty() {
            return Ok(());
        }
        if frame.channels() != 3 {
            return Err(format!("cannot draw on a {}-channel frame", frame.channels()).into());
        }

        let mut img: RgbImage =
            ImageBuffer::from_raw(frame.width(), frame.height(), frame.data().to_vec())
                .ok_or("frame buffer does not match its dimensions")?;

        for annotation in annotations {
            let color = pixel_color(annotation.color, frame.channel_order());
            self.draw_box(&mut img, &annotation.bounding_box, color);
            self.draw_label(&mut img, annotation, color);
        }

        frame.data_mut().copy_from_slice(img.as_raw());
        Ok(())
    }
}

/// Annotation colors are RGB; BGR frames need them swapped.
fn pixel_color(rgb: [u8; 3], order: ChannelOrder) -> Rgb<u8> {
    match order {
        ChannelOrder::Rgb => Rgb(rgb),
        ChannelOrder::Bgr => Rgb([rgb[2], rgb[1], rgb[0]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::mask_classifier::MaskLabel;
    use crate::shared::constants::{MASK_COLOR, NO_MASK_COLOR};

    fn black_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![0u8; (w * h * 3) as usize], w, h, 3, 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        let d = frame.data();
        [d[i], d[i + 1], d[i + 2]]
    }

    fn annotation(bbox: BoundingBox, label: MaskLabel, color: [u8; 3]) -> Annotation {
        Annotation {
            bounding_box: bbox,
            label,
            probability: 0.9,
            color,
        }
    }

    #[test]
    fn test_draws_box_outline_only() {
        let mut frame = black_frame(40, 40);
        let ann = annotation(BoundingBox::new(10, 20, 30, 35), MaskLabel::Mask, MASK_COLOR);
        ImageprocRenderer::new(1).render(&mut frame, &[ann]).unwrap();

        assert_eq!(pixel(&frame, 10, 20), MASK_COLOR);
        assert_eq!(pixel(&frame, 30, 35), MASK_COLOR);
        assert_eq!(pixel(&frame, 20, 35), MASK_COLOR);
        assert_eq!(pixel(&frame, 20, 28), [0, 0, 0]);
        assert_eq!(pixel(&frame, 36, 36), [0, 0, 0]);
    }

    #[test]
    fn test_thickness_insets_lines() {
        let mut frame = black_frame(40, 40);
        let ann = annotation(BoundingBox::new(10, 20, 30, 35), MaskLabel::Mask, MASK_COLOR);
        ImageprocRenderer::new(2).render(&mut frame, &[ann]).unwrap();

        assert_eq!(pixel(&frame, 11, 21), MASK_COLOR);
        assert_eq!(pixel(&frame, 12, 22), [0, 0, 0]);
    }

    #[test]
    fn test_label_tab_without_font() {
        let mut frame = black_frame(40, 40);
        let ann = annotation(BoundingBox::new(10, 20, 30, 35), MaskLabel::NoMask, NO_MASK_COLOR);
        let renderer = ImageprocRenderer::default();
        assert!(!renderer.has_font());
        renderer.render(&mut frame, &[ann]).unwrap();

        assert_eq!(pixel(&frame, 20, 16), NO_MASK_COLOR);
        assert_eq!(pixel(&frame, 20, 12), [0, 0, 0]);
    }

    #[test]
    fn test_bgr_frame_gets_swapped_color() {
        let mut frame = black_frame(40, 40).with_channel_order(ChannelOrder::Bgr);
        let ann = annotation(BoundingBox::new(10, 20, 30, 35), MaskLabel::NoMask, NO_MASK_COLOR);
        ImageprocRenderer::new(1).render(&mut frame, &[ann]).unwrap();

        assert_eq!(pixel(&frame, 10, 20), [0, 0, 255]);
    }

    #[test]
    fn test_box_on_frame_edge_does_not_panic() {
        let mut frame = black_frame(20, 20);
        let ann = annotation(BoundingBox::new(0, 0, 19, 19), MaskLabel::Mask, MASK_COLOR);
        ImageprocRenderer::new(3).render(&mut frame, &[ann]).unwrap();
        assert_eq!(pixel(&frame, 19, 19), MASK_COLOR);
    }

    #[test]
    fn test_no_annotations_leaves_frame_untouched() {
        let mut frame = black_frame(8, 8);
        ImageprocRenderer::default().render(&mut frame, &[]).unwrap();
        assert!(frame.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_rejects_grayscale_frame() {
        let mut frame = Frame::new(vec![0u8; 64], 8, 8, 1, 0);
        let ann = annotation(BoundingBox::new(1, 1, 5, 5), MaskLabel::Mask, MASK_COLOR);
        assert!(ImageprocRenderer::default().render(&mut frame, &[ann]).is_err());
    }

    #[test]
    fn test_missing_font_file_is_error() {
        let result = ImageprocRenderer::default().with_font_file(Path::new("/nonexistent/font.ttf"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_font_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(ImageprocRenderer::default().with_font_file(&path).is_err());
    }
}
