use image::imageops::FilterType;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::{swap_red_blue, ChannelOrder, Frame};

/// MobileNetV2 `preprocess_input`: scale `[0, 255]` to `[-1, 1]`.
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

/// Memory layout of the classifier input batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[N, H, W, C]`, the Keras default.
    #[default]
    Nhwc,
    /// `[N, C, H, W]`
    Nchw,
}

/// Face crops ready for the classifier, with the boxes they came from.
///
/// `boxes[i]` is the source of batch entry `i`.
#[derive(Debug)]
pub struct PreparedFaces {
    pub batch: Array4<f32>,
    pub boxes: Vec<BoundingBox>,
}

impl PreparedFaces {
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Crops faces out of a frame and turns them into a normalized batch.
#[derive(Clone, Debug)]
pub struct FacePreprocessor {
    input_size: u32,
    channel_order: ChannelOrder,
    layout: TensorLayout,
}

impl FacePreprocessor {
    pub fn new(input_size: u32, channel_order: ChannelOrder, layout: TensorLayout) -> Self {
        Self {
            input_size,
            channel_order,
            layout,
        }
    }

    /// Crop, convert, resize and normalize every box in order.
    ///
    /// Boxes are clamped to the frame first. A box that covers no pixels is
    /// an error, so batch entry `i` always comes from `boxes[i]`.
    pub fn prepare(
        &self,
        frame: &Frame,
        boxes: &[BoundingBox],
    ) -> Result<PreparedFaces, Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("expected a 3-channel frame, got {}", frame.channels()).into());
        }

        let clamped: Vec<BoundingBox> = boxes
            .iter()
            .map(|b| b.clamped(frame.width(), frame.height()))
            .collect();
        if let Some(i) = clamped.iter().position(|b| b.is_empty()) {
            return Err(format!("face crop {i} is empty: {:?}", clamped[i]).into());
        }

        let s = self.input_size as usize;
        let shape = match self.layout {
            TensorLayout::Nhwc => (clamped.len(), s, s, 3),
            TensorLayout::Nchw => (clamped.len(), 3, s, s),
        };
        let mut batch = Array4::<f32>::zeros(shape);

        for (i, bbox) in clamped.iter().enumerate() {
            let face = self.crop_and_resize(frame, bbox)?;
            for (x, y, px) in face.enumerate_pixels() {
                let (x, y) = (x as usize, y as usize);
                for c in 0..3 {
                    let v = (px.0[c] as f32 - NORM_MEAN) / NORM_STD;
                    match self.layout {
                        TensorLayout::Nhwc => batch[[i, y, x, c]] = v,
                        TensorLayout::Nchw => batch[[i, c, y, x]] = v,
                    }
                }
            }
        }

        Ok(PreparedFaces { batch, boxes: clamped })
    }

    /// Copies `[start_y, end_y) x [start_x, end_x)` out of the frame in the
    /// classifier's channel order and resizes it to the input resolution.
    fn crop_and_resize(
        &self,
        frame: &Frame,
        bbox: &BoundingBox,
    ) -> Result<image::RgbImage, Box<dyn std::error::Error>> {
        let fw = frame.width() as usize;
        let (x0, y0) = (bbox.start_x as usize, bbox.start_y as usize);
        let (cw, ch) = (bbox.width() as usize, bbox.height() as usize);
        let data = frame.data();

        let mut crop = Vec::with_capacity(cw * ch * 3);
        for row in y0..y0 + ch {
            let offset = (row * fw + x0) * 3;
            crop.extend_from_slice(&data[offset..offset + cw * 3]);
        }
        if frame.channel_order() != self.channel_order {
            swap_red_blue(&mut crop, 3);
        }

        let img = image::RgbImage::from_raw(cw as u32, ch as u32, crop)
            .ok_or("face crop does not match its dimensions")?;
        Ok(image::imageops::resize(
            &img,
            self.input_size,
            self.input_size,
            FilterType::Triangle,
        ))
    }
}
