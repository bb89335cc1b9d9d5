//! RGB colors as they appear in scene documents and settings

use serde::{Deserialize, Serialize};

/// Linear RGB color with components in `[0, 1]`
///
/// Serialized as a CSS-style hex string (`#rrggbb`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

/// Error returned for color strings that are neither hex nor a known name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized color: {0}")]
pub struct ColorParseError(pub String);

impl Color {
    /// Pure white
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Pure black
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Pure red
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    /// Pure green
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    /// Pure blue
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);

    /// Create a color from float components
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit components
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0)
    }

    /// Parse `#rgb`, `#rrggbb` or a basic color name
    pub fn parse(value: &str) -> Result<Self, ColorParseError> {
        let trimmed = value.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return Self::parse_hex(hex).ok_or_else(|| ColorParseError(value.to_string()));
        }
        let named = match trimmed.to_ascii_lowercase().as_str() {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "red" => Self::RED,
            "green" => Self::rgb(0.0, 0.5, 0.0),
            "lime" => Self::GREEN,
            "blue" => Self::BLUE,
            "yellow" => Self::rgb(1.0, 1.0, 0.0),
            "cyan" => Self::rgb(0.0, 1.0, 1.0),
            "magenta" => Self::rgb(1.0, 0.0, 1.0),
            "orange" => Self::from_u8(255, 165, 0),
            "purple" => Self::from_u8(128, 0, 128),
            "grey" | "gray" => Self::from_u8(128, 128, 128),
            _ => return Err(ColorParseError(value.to_string())),
        };
        Ok(named)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut chars = hex.chars();
                let mut expand = || {
                    let c = chars.next()?;
                    channel(&format!("{c}{c}"))
                };
                Some(Self::from_u8(expand()?, expand()?, expand()?))
            }
            6 => Some(Self::from_u8(
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
            )),
            _ => None,
        }
    }

    /// Scale every channel, clamping to `[0, 1]`
    pub fn scaled(self, factor: f32) -> Self {
        Self::rgb(
            (self.r * factor).clamp(0.0, 1.0),
            (self.g * factor).clamp(0.0, 1.0),
            (self.b * factor).clamp(0.0, 1.0),
        )
    }

    /// Blend toward `other` by `t` (0 keeps `self`)
    pub fn mix(self, other: Self, t: f32) -> Self {
        Self::rgb(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Convert to 8-bit RGBA with the given alpha
    pub fn to_rgba8(self, alpha: f32) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(alpha)]
    }

    /// Format as `#rrggbb`
    pub fn to_hex(self) -> String {
        let [r, g, b, _] = self.to_rgba8(1.0);
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}
