/// Straight-alpha sRGB color with `f32` channels in `[0, 1]`.
///
/// Graph data stores colors as RGBA8 palette entries; this type is the CPU
/// form used for the clear color and palette registration.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn from_rgba8([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Quantizes to RGBA8, clamping out-of-range channels.
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// sRGB channel to linear light.
    #[inline]
    fn srgb_to_linear(c: f32) -> f64 {
        let c = c.clamp(0.0, 1.0) as f64;
        if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
    }

    /// Linear premultiplied clear value for a surface render pass.
    ///
    /// With an sRGB surface format, `wgpu` expects linear values here.
    pub fn to_wgpu_linear(self) -> wgpu::Color {
        let a = self.a.clamp(0.0, 1.0) as f64;
        wgpu::Color {
            r: Self::srgb_to_linear(self.r) * a,
            g: Self::srgb_to_linear(self.g) * a,
            b: Self::srgb_to_linear(self.b) * a,
            a,
        }
    }

    #[inline]
    pub fn as_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_quantization_clamps() {
        assert_eq!(Color::rgba(1.2, 0.5, -1.0, 1.0).to_rgba8(), [255, 128, 0, 255]);
        assert_eq!(Color::from_rgba8([255, 0, 51, 255]).to_rgba8(), [255, 0, 51, 255]);
    }

    #[test]
    fn linear_clear_is_premultiplied() {
        let c = Color::rgba(1.0, 1.0, 1.0, 0.5).to_wgpu_linear();
        assert!((c.r - 0.5).abs() < 1e-9);
        assert!((c.a - 0.5).abs() < 1e-9);
        assert_eq!(Color::BLACK.to_wgpu_linear().r, 0.0);
    }
}
