use serde::{Deserialize, Serialize};

/// An RGB colour with sRGB-encoded components in `0.0..=1.0`.
///
/// Hex literals (`0xff00ff`) and egui colour pickers both speak sRGB, so that
/// is what gets stored; renderers call [`Color::to_linear`] before shading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from `0xRRGGBB`. Bits above the low 24 are ignored.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_srgb_bytes([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
    }

    pub fn to_hex(&self) -> u32 {
        let [r, g, b] = self.to_srgb_bytes();
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }

    pub fn from_srgb_bytes(bytes: [u8; 3]) -> Self {
        Self::rgb(
            f32::from(bytes[0]) / 255.0,
            f32::from(bytes[1]) / 255.0,
            f32::from(bytes[2]) / 255.0,
        )
    }

    pub fn to_srgb_bytes(&self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Linear-light components for shading.
    pub fn to_linear(&self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06x}", self.to_hex())
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
