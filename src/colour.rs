// src/colour.rs

use palette::Srgb;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An RGB colour used to render heat-map cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colour(Srgb<u8>);

pub const GREEN: Colour = Colour::new(0, 255, 0);
pub const RED: Colour = Colour::new(255, 0, 0);
pub const BLUE: Colour = Colour::new(0, 0, 255);
pub const YELLOW: Colour = Colour::new(255, 255, 0);
pub const HOT_ORANGE: Colour = Colour::new(255, 100, 0);

impl Colour {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Colour(Srgb::new(r, g, b))
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim_start_matches('#');
        if digits.len() != 6 {
            return None;
        }
        Srgb::<u8>::from_str(digits).ok().map(Colour)
    }

    pub fn as_rgb(&self) -> (u8, u8, u8) {
        self.0.into_components()
    }

    pub fn as_hex(&self) -> String {
        let (r, g, b) = self.as_rgb();
        format!("#{r:02X}{g:02X}{b:02X}")
    }

    /// CSS colour string; `rgba(...)` when `alpha < 1.0`.
    pub fn css_rgb(&self, alpha: f32) -> String {
        let (r, g, b) = self.as_rgb();
        if alpha < 1.0 {
            format!("rgba({r}, {g}, {b}, {alpha})")
        } else {
            format!("rgb({r}, {g}, {b})")
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

impl Serialize for Colour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_hex())
    }
}

/// Map `x` from `[in_min, in_max]` onto `[out_min, out_max]`, clamped to the output range.
/// A degenerate input range maps everything to `out_min`.
pub fn map_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if in_max == in_min {
        return out_min;
    }
    let t = ((x - in_min) / (in_max - in_min)).clamp(0.0, 1.0);
    out_min + (out_max - out_min) * t
}

/// Linear gradient between `c_min` (at `x_min`) and `c_max` (at `x_max`).
pub fn linear_gradient(x: f64, x_min: f64, x_max: f64, c_min: Colour, c_max: Colour) -> Colour {
    let (r1, g1, b1) = c_min.as_rgb();
    let (r2, g2, b2) = c_max.as_rgb();
    let channel = |lo: u8, hi: u8| map_range(x, x_min, x_max, lo as f64, hi as f64) as u8;
    Colour::new(channel(r1, r2), channel(g1, g2), channel(b1, b2))
}
