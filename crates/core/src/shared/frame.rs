use serde::{Deserialize, Serialize};

/// Byte order of the three color channels of a pixel.
///
/// Decoders produce `Rgb`. Detectors trained on OpenCV captures expect
/// `Bgr`, so conversions happen explicitly where a model needs them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// A single video/image frame: contiguous 8-bit pixels in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque apart from the recorded channel order.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    channel_order: ChannelOrder,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            channel_order: ChannelOrder::Rgb,
        }
    }

    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns a frame whose pixels are laid out in `order`, swapping the
    /// first and third channel when the orders differ.
    pub fn to_channel_order(&self, order: ChannelOrder) -> Frame {
        let mut converted = self.clone();
        if self.channel_order != order {
            swap_red_blue(&mut converted.data, self.channels as usize);
            converted.channel_order = order;
        }
        converted
    }
}

/// Swaps channel 0 and 2 of every pixel in a packed buffer.
pub fn swap_red_blue(pixels: &mut [u8], channels: usize) {
    if channels < 3 {
        return;
    }
    for px in pixels.chunks_exact_mut(channels) {
        px.swap(0, 2);
    }
}
