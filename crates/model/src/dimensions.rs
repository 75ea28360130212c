//! Pixel dimensions and placement types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width and height of a media element in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Zero-sized dimensions, used for "no media".
    pub const ZERO: Dimensions = Dimensions {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either axis is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Error returned when parsing a `WIDTHxHEIGHT` string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDimensionsError(String);

impl fmt::Display for ParseDimensionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected WIDTHxHEIGHT, got '{}'", self.0)
    }
}

impl std::error::Error for ParseDimensionsError {}

impl FromStr for Dimensions {
    type Err = ParseDimensionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDimensionsError(s.to_string());
        let (w, h) = s
            .trim()
            .split_once(|c| c == 'x' || c == 'X')
            .ok_or_else(err)?;
        let width = w.trim().parse::<u32>().map_err(|_| err())?;
        let height = h.trim().parse::<u32>().map_err(|_| err())?;
        Ok(Self { width, height })
    }
}

/// Dimensions after contain-scaling, together with the factor applied.
///
/// `width == round(original.width * scale)` and likewise for height.
/// `scale` is zero exactly when the source had an empty axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaledDimensions {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

impl ScaledDimensions {
    pub const ZERO: ScaledDimensions = ScaledDimensions {
        width: 0,
        height: 0,
        scale: 0.0,
    };

    /// The scaled size without the factor.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Top-left pixel offset of an overlay inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
