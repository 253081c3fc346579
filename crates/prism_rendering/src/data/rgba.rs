//! Packed 8-bit RGBA color.

use bytemuck::{Pod, Zeroable};

/// Color packed into a `u32`, red in the low byte.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba(pub u32);

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self(0);

    /// Packs four 8-bit channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(u32::from_le_bytes([r, g, b, a]))
    }

    /// Packs four channels in `[0, 1]`; values outside are clamped.
    #[must_use]
    pub fn from_vec4(color: [f32; 4]) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(channel(color[0]), channel(color[1]), channel(color[2]), channel(color[3]))
    }

    /// Unpacks into channels in `[0, 1]`.
    #[must_use]
    pub fn to_vec4(self) -> [f32; 4] {
        self.0.to_le_bytes().map(|c| f32::from(c) / 255.0)
    }

    /// Alpha channel.
    #[inline]
    #[must_use]
    pub const fn alpha(self) -> u8 {
        self.0.to_le_bytes()[3]
    }

    /// Checks if the color has zero alpha.
    #[inline]
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.alpha() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order() {
        let color = Rgba::new(0x11, 0x22, 0x33, 0x44);
        assert_eq!(color.0, 0x4433_2211);
        assert_eq!(color.alpha(), 0x44);
    }

    #[test]
    fn test_to_vec4_normalizes_each_channel() {
        assert_eq!(Rgba::new(255, 0, 255, 255).to_vec4(), [1.0, 0.0, 1.0, 1.0]);
        let [r, g, b, a] = Rgba::new(51, 102, 0, 255).to_vec4();
        assert!((r - 0.2).abs() < 1e-6);
        assert!((g - 0.4).abs() < 1e-6);
        assert!(b.abs() < f32::EPSILON);
        assert!((a - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_from_vec4() {
        assert_eq!(Rgba::from_vec4([1.0, 0.0, 2.0, -1.0]), Rgba::new(255, 0, 255, 0));
    }

    #[test]
    fn test_transparency() {
        assert!(Rgba::TRANSPARENT.is_transparent());
        assert!(Rgba::new(255, 255, 255, 0).is_transparent());
        assert!(!Rgba::new(0, 0, 0, 1).is_transparent());
    }
}
