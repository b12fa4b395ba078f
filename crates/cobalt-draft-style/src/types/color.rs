//! Color values.
//!
//! Only what `ladder()` needs: parsing hex and named colors, and computing
//! a relative luminance to compare against the ladder's thresholds.

/// An RGBA color with components in the 0.0-1.0 range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new color from RGBA components (0.0-1.0 range).
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from RGB components.
    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create an opaque color from 8-bit RGB components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Create a color from 8-bit RGBA components.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Parse a hex color: `f00`, `f00a`, `ff0000`, or `ff0000aa`, with or
    /// without a leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 | 4 => {
                let r = nibble(0)?;
                let g = nibble(1)?;
                let b = nibble(2)?;
                let a = if hex.len() == 4 { nibble(3)? } else { 0xf };
                Some(Self::from_rgba8(r * 17, g * 17, b * 17, a * 17))
            }
            6 | 8 => {
                let r = byte(0)?;
                let g = byte(2)?;
                let b = byte(4)?;
                let a = if hex.len() == 8 { byte(6)? } else { 0xff };
                Some(Self::from_rgba8(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Look up a CSS named color.
    pub fn named(name: &str) -> Option<Self> {
        let (r, g, b) = match name.to_ascii_lowercase().as_str() {
            "black" => (0x00, 0x00, 0x00),
            "silver" => (0xc0, 0xc0, 0xc0),
            "gray" | "grey" => (0x80, 0x80, 0x80),
            "white" => (0xff, 0xff, 0xff),
            "maroon" => (0x80, 0x00, 0x00),
            "red" => (0xff, 0x00, 0x00),
            "purple" => (0x80, 0x00, 0x80),
            "fuchsia" | "magenta" => (0xff, 0x00, 0xff),
            "green" => (0x00, 0x80, 0x00),
            "lime" => (0x00, 0xff, 0x00),
            "olive" => (0x80, 0x80, 0x00),
            "yellow" => (0xff, 0xff, 0x00),
            "navy" => (0x00, 0x00, 0x80),
            "blue" => (0x00, 0x00, 0xff),
            "teal" => (0x00, 0x80, 0x80),
            "aqua" | "cyan" => (0x00, 0xff, 0xff),
            "orange" => (0xff, 0xa5, 0x00),
            "transparent" => return Some(Self::new(0.0, 0.0, 0.0, 0.0)),
            _ => return None,
        };
        Some(Self::from_rgb8(r, g, b))
    }

    /// Relative luminance (Rec. 709 coefficients), in [0, 1].
    pub fn luminance(&self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    pub const BLACK: Self = Self::from_rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::from_rgb(1.0, 1.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(Color::from_hex("#ff0000"), Some(Color::from_rgb(1.0, 0.0, 0.0)));
        assert_eq!(Color::from_hex("f00"), Some(Color::from_rgb(1.0, 0.0, 0.0)));
        assert_eq!(Color::from_hex("#ffffff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#gg0000"), None);
        let translucent = Color::from_hex("#00000080").unwrap();
        assert!((translucent.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn named_colors() {
        assert_eq!(Color::named("white"), Some(Color::WHITE));
        assert_eq!(Color::named("Black"), Some(Color::BLACK));
        assert_eq!(Color::named("nope"), None);
    }

    #[test]
    fn luminance_endpoints() {
        assert!(Color::BLACK.luminance() < 1e-6);
        assert!((Color::WHITE.luminance() - 1.0).abs() < 1e-4);
        let gray = Color::from_rgb(0.5, 0.5, 0.5);
        assert!((gray.luminance() - 0.5).abs() < 1e-4);
    }
}
