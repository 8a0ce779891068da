use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output dimensions of a generated image, rendered as `WxH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("expected WIDTHxHEIGHT, got {0:?}")]
    Malformed(String),
    #[error("image dimensions must be positive, got {0:?}")]
    Zero(String),
}

impl ImageSize {
    /// The sizes offered in the size selector, smallest first.
    pub const PRESETS: [ImageSize; 5] = [
        ImageSize::square(256),
        ImageSize::square(512),
        ImageSize::square(768),
        ImageSize::square(960),
        ImageSize::square(1200),
    ];

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    pub fn parse(raw: &str) -> Result<Self, SizeParseError> {
        let malformed = || SizeParseError::Malformed(raw.to_string());
        let (w, h) = raw.trim().split_once(['x', 'X']).ok_or_else(malformed)?;
        let width: u32 = w.trim().parse().map_err(|_| malformed())?;
        let height: u32 = h.trim().parse().map_err(|_| malformed())?;
        if width == 0 || height == 0 {
            return Err(SizeParseError::Zero(raw.to_string()));
        }
        Ok(Self { width, height })
    }

    pub fn is_preset(&self) -> bool {
        Self::PRESETS.contains(self)
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::PRESETS[0]
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<String> for ImageSize {
    type Error = SizeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageSize> for String {
    fn from(size: ImageSize) -> Self {
        size.to_string()
    }
}
