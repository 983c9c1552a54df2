//! Video frame types and decoding

use crate::CaptureError;
use serde::{Deserialize, Serialize};

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 3 bytes per pixel
    Rgb24,
    /// 4 bytes per pixel (canvas image data)
    Rgba32,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }
}

/// Raster video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Interleaved pixel data (width * height * bytes_per_pixel)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new RGB frame from raw data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgb24,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a frame from RGBA canvas data
    pub fn from_rgba(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba32,
            timestamp_ns,
            sequence,
        }
    }

    /// Whether `data` holds exactly one full raster
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len()
                == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Get RGB pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let idx = (y as usize * self.width as usize + x as usize) * bpp;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Mean of the three colour channels at (x, y)
    pub fn brightness(&self, x: u32, y: u32) -> Option<f32> {
        self.get_pixel(x, y)
            .map(|[r, g, b]| (r as f32 + g as f32 + b as f32) / 3.0)
    }

    /// Build a frame from a decoded image
    pub fn from_image(img: &image::DynamicImage, timestamp_ns: u64, sequence: u32) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(rgb.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Decode an encoded still (JPEG, PNG) into an RGB frame
    pub fn decode(bytes: &[u8], timestamp_ns: u64, sequence: u32) -> Result<Self, CaptureError> {
        let img = image::load_from_memory(bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;
        Ok(Self::from_image(&img, timestamp_ns, sequence))
    }
}
