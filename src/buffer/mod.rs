use image::RgbImage;

use crate::error::CompressError;

/// Number of colour channels per pixel. Only RGB is handled.
pub const CHANNELS: usize = 3;

/// An owned, row-major RGB8 image of shape (height, width, 3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps a raw interleaved RGB byte vector. Fails if the length doesn't
    /// match `width * height * 3`.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, CompressError> {
        let buffer = PixelBuffer {
            width,
            height,
            data,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// Builds a buffer from rows of pixels. All rows must be the same length.
    pub fn from_rows(rows: &[Vec<[u8; 3]>]) -> Result<Self, CompressError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);

        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(CompressError::InvalidBuffer(format!(
                "row {} has {} pixels, expected {}",
                y,
                row.len(),
                width
            )));
        }

        let data = rows.iter().flatten().flatten().copied().collect();
        PixelBuffer::from_raw(width, height, data)
    }

    /// A zero-area buffer keeping the given dimensions, e.g. 7x0
    pub fn empty(width: usize, height: usize) -> Self {
        debug_assert!(width == 0 || height == 0);
        PixelBuffer {
            width,
            height,
            data: Vec::new(),
        }
    }

    /// A zero-filled buffer of the given dimensions
    pub fn new_black(width: usize, height: usize) -> Self {
        PixelBuffer {
            width,
            height,
            data: vec![0; width * height * CHANNELS],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (height, width, channels), the array shape of the buffer
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, CHANNELS)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at column `x`, row `y`.
    ///
    /// Panics if the coordinate is out of bounds.
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({}, {}) out of bounds for {}x{} buffer",
            x,
            y,
            self.width,
            self.height
        );
        let i = (y * self.width + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Checks that the backing storage matches the declared shape.
    pub fn validate(&self) -> Result<(), CompressError> {
        let expected = self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or_else(|| {
                CompressError::InvalidBuffer(format!(
                    "dimensions {}x{} overflow",
                    self.width, self.height
                ))
            })?;

        if self.data.len() != expected {
            return Err(CompressError::InvalidBuffer(format!(
                "{}x{} buffer with {} channels needs {} values, found {}",
                self.width,
                self.height,
                CHANNELS,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage, CompressError> {
        RgbImage::from_raw(self.width as u32, self.height as u32, self.data.clone()).ok_or_else(
            || {
                CompressError::InvalidBuffer(format!(
                    "cannot view {}x{} buffer as an RGB image",
                    self.width, self.height
                ))
            },
        )
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(image: RgbImage) -> Self {
        PixelBuffer {
            width: image.width() as usize,
            height: image.height() as usize,
            data: image.into_raw(),
        }
    }
}

/// Cutoff below which channel values are zeroed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(pub u8);

impl Threshold {
    /// Starting position of the threshold slider
    pub const DEFAULT: Threshold = Threshold(128);

    /// Clamps any integer into [0, 255]
    pub fn clamped(value: i64) -> Self {
        Threshold(value.clamp(0, 255) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::DEFAULT
    }
}

impl From<u8> for Threshold {
    fn from(value: u8) -> Self {
        Threshold(value)
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
