/// SSD face locator (ResNet-10 backbone) using ONNX Runtime via `ort`.
///
/// Mirrors the Caffe `blobFromImage` preprocessing the network was trained
/// with: bilinear resize of the whole frame, BGR channel order, per-channel
/// mean subtraction, no scaling. The network emits `[1, 1, N, 7]` rows that
/// are passed through untouched as [`RawDetections`].
use std::path::Path;

use image::imageops::FilterType;

use crate::detection::domain::face_locator::{FaceLocator, RawDetections, DETECTION_ROW_LEN};
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::shared::constants::{DETECTOR_INPUT_SIZE, DETECTOR_MEAN_BGR};
use crate::shared::frame::{ChannelOrder, Frame};

pub struct OnnxSsdFaceLocator {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxSsdFaceLocator {
    /// Load an SSD face detection model.
    ///
    /// The input resolution is read from the model's input shape (NCHW).
    /// Falls back to 300 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .map(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } => input_side(shape),
                _ => DETECTOR_INPUT_SIZE,
            })
            .unwrap_or(DETECTOR_INPUT_SIZE);

        log::info!(
            "Loaded face detector {} ({input_size}x{input_size})",
            model_path.display()
        );
        Ok(Self {
            session,
            input_size,
        })
    }
}

impl FaceLocator for OnnxSsdFaceLocator {
    fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Box<dyn std::error::Error>> {
        let blob = blob_from_frame(frame, self.input_size)?;

        let input_value = ort::value::Tensor::from_array(blob)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face detector produced no outputs".into());
        }

        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.last().copied() != Some(DETECTION_ROW_LEN) {
            return Err(format!("Unexpected face detector output shape: {shape:?}").into());
        }

        let data: Vec<f32> = tensor.iter().copied().collect();
        let raw = RawDetections::from_flat(data)?;
        log::trace!("Face detector returned {} candidate rows", raw.len());
        Ok(raw)
    }
}

/// Resize `frame` to `size x size`, convert to BGR and subtract the
/// training means. Returns an NCHW float32 tensor.
/// Side length of a static NCHW input, or the default when the height
/// axis is dynamic (`-1`).
fn input_side(dims: &[i64]) -> u32 {
    match dims.get(2) {
        Some(&side) if dims.len() >= 4 && side > 0 => side as u32,
        _ => DETECTOR_INPUT_SIZE,
    }
}

fn blob_from_frame(
    frame: &Frame,
    size: u32,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    if frame.is_empty() {
        return Err("cannot run face detection on an empty frame".into());
    }
    let bgr = frame.to_channel_order(ChannelOrder::Bgr);
    let img = image::RgbImage::from_raw(bgr.width(), bgr.height(), bgr.into_data())
        .ok_or("frame buffer does not match its dimensions")?;
    let resized = image::imageops::resize(&img, size, size, FilterType::Triangle);

    let s = size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, px) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = px.0[c] as f32 - DETECTOR_MEAN_BGR[c];
        }
    }
    Ok(tensor)
}
