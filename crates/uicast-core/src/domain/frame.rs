//! Frames and one-time bootstrap assets.

/// One tick's worth of rendered output.
///
/// `draw_data` is opaque to the core: it is whatever the render driver
/// produced.  `sequence` increases by one for every frame that is actually
/// rendered, so a viewer can discard an in-flight frame that has already been
/// superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub draw_data: Vec<u8>,
}

/// Pixel layout of a [`BootstrapAsset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TextureFormat {
    /// One byte of coverage per pixel (font atlases).
    Alpha8 = 0x01,
    /// Four bytes per pixel, RGBA order.
    Rgba32 = 0x02,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Alpha8 => 1,
            TextureFormat::Rgba32 => 4,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(TextureFormat::Alpha8),
            0x02 => Some(TextureFormat::Rgba32),
            _ => None,
        }
    }
}

/// A texture uploaded to each viewer once, when it registers.
///
/// Draw commands reference textures by `texture_id`, so a viewer cannot
/// display frames until it has received the bootstrap asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAsset {
    pub texture_id: u32,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl BootstrapAsset {
    /// Number of pixel bytes implied by the dimensions and format.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}
