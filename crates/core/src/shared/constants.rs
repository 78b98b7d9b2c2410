/// SSD face detector (ResNet-10 backbone) exported to ONNX.
pub const DETECTOR_MODEL_NAME: &str = "face_detector_res10_300x300.onnx";

/// MobileNetV2 mask classifier exported to ONNX.
pub const CLASSIFIER_MODEL_NAME: &str = "mask_detector_mobilenetv2.onnx";

/// Detections at or below this confidence are discarded.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Upper bound on faces sent to the classifier in one forward pass.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 32;

/// Square side length of the classifier input.
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Square side length of the detector input when the model leaves it dynamic.
pub const DETECTOR_INPUT_SIZE: u32 = 224;

/// Per-channel means subtracted from detector input, in B, G, R order.
pub const DETECTOR_MEAN_BGR: [f32; 3] = [104.0, 177.0, 123.0];

/// Frames are downscaled to this width before annotation (0 disables).
pub const DEFAULT_FRAME_WIDTH: u32 = 400;

/// Box outline thickness in pixels.
pub const DEFAULT_BOX_THICKNESS: u32 = 2;

/// Label color for faces wearing a mask (RGB green).
pub const MASK_COLOR: [u8; 3] = [0, 255, 0];

/// Label color for faces without a mask (RGB red).
pub const NO_MASK_COLOR: [u8; 3] = [255, 0, 0];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
