use image::imageops::FilterType;

use crate::shared::constants::DEFAULT_FRAME_WIDTH;
use crate::shared::frame::Frame;

/// Scales frames to a fixed width, keeping the aspect ratio.
///
/// A width of 0 disables resizing.
#[derive(Clone, Copy, Debug)]
pub struct FrameResizer {
    width: u32,
}

impl FrameResizer {
    pub fn new(width: u32) -> Self {
        Self { width }
    }

    pub fn disabled() -> Self {
        Self { width: 0 }
    }

    /// Output size for a `width x height` input. The height is truncated.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if self.width == 0 || width == 0 || width == self.width {
            return (width, height);
        }
        let scaled = (height as f64 * self.width as f64 / width as f64) as u32;
        (self.width, scaled.max(1))
    }

    pub fn resize(&self, frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        let (w, h) = self.target_dimensions(frame.width(), frame.height());
        if (w, h) == (frame.width(), frame.height()) {
            return Ok(frame);
        }
        if frame.channels() != 3 {
            return Err(format!("cannot resize a {}-channel frame", frame.channels()).into());
        }

        let index = frame.index();
        let order = frame.channel_order();
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.into_data())
            .ok_or("frame buffer does not match its dimensions")?;
        let resized = image::imageops::resize(&img, w, h, FilterType::Triangle);

        Ok(Frame::new(resized.into_raw(), w, h, 3, index).with_channel_order(order))
    }
}

impl Default for FrameResizer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::ChannelOrder;
    use rstest::rstest;

    #[rstest]
    #[case(400, 800, 600, (400, 300))]
    #[case(400, 640, 481, (400, 300))]
    #[case(400, 200, 100, (400, 200))]
    #[case(400, 400, 300, (400, 300))]
    #[case(0, 1920, 1080, (1920, 1080))]
    fn test_target_dimensions(
        #[case] target: u32,
        #[case] w: u32,
        #[case] h: u32,
        #[case] expected: (u32, u32),
    ) {
        assert_eq!(FrameResizer::new(target).target_dimensions(w, h), expected);
    }

    #[test]
    fn test_resize_keeps_index_and_channel_order() {
        let frame = Frame::new(vec![90u8; 80 * 60 * 3], 80, 60, 3, 7)
            .with_channel_order(ChannelOrder::Bgr);
        let out = FrameResizer::new(40).resize(frame).unwrap();
        assert_eq!((out.width(), out.height()), (40, 30));
        assert_eq!(out.index(), 7);
        assert_eq!(out.channel_order(), ChannelOrder::Bgr);
        assert!(out.data().iter().all(|&v| v == 90));
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let frame = Frame::new(vec![1u8; 10 * 10 * 3], 10, 10, 3, 0);
        let out = FrameResizer::disabled().resize(frame).unwrap();
        assert_eq!((out.width(), out.height()), (10, 10));
    }
}
