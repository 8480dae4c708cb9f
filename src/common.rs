use std::fmt;
use std::str::FromStr;

use crate::error::MapError;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel, 255 is fully opaque.
    pub alpha: u8,
}

impl Color {
    /// Opaque black, the default text color.
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Builds a fully opaque color.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    /// Builds a color with an explicit alpha.
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha,
        }
    }
}

/// Parses `#RRGGBB` or `#AARRGGBB` (alpha first). The `#` is optional.
impl FromStr for Color {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        // from_str_radix alone would let a sign through.
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MapError::invalid("color", s));
        }
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
                .ok_or_else(|| MapError::invalid("color", s))
        };

        match hex.len() {
            6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color::rgba(channel(2)?, channel(4)?, channel(6)?, channel(0)?)),
            _ => Err(MapError::invalid("color", s)),
        }
    }
}

/// Writes the Tiled text form, omitting alpha when the color is opaque.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alpha == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.alpha, self.red, self.green, self.blue
            )
        }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Size {
    /// Builds a size.
    pub const fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

/// An x/y pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderedPair {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
}

impl OrderedPair {
    /// Builds a pair.
    pub const fn new(x: f64, y: f64) -> Self {
        OrderedPair { x, y }
    }
}

pub(crate) fn parse_color_opt(value: Option<&str>) -> Result<Option<Color>, MapError> {
    value.map(str::parse).transpose()
}
