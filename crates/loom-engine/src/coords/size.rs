use super::Viewport;

/// Window size in logical pixels plus the device scale factor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewSize {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl Default for ViewSize {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl ViewSize {
    #[inline]
    pub const fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self { width, height, scale_factor }
    }

    /// From a physical size as reported by the window system.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let s = if scale_factor > 0.0 { scale_factor as f32 } else { 1.0 };
        Self::new(width as f32 / s, height as f32 / s, s)
    }

    /// Size in device pixels, at least 1×1.
    pub fn physical(self) -> (u32, u32) {
        let w = (self.width * self.scale_factor).round().max(1.0) as u32;
        let h = (self.height * self.scale_factor).round().max(1.0) as u32;
        (w, h)
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        if self.width > 0.0 && self.height > 0.0 { self.width / self.height } else { 1.0 }
    }

    /// Device-pixel viewport for shader uniforms.
    pub fn viewport(self) -> Viewport {
        let (w, h) = self.physical();
        Viewport::new(w as f32, h as f32)
    }

    /// Logical pointer position to the device pixel under it, or `None`
    /// outside the view.
    pub fn to_device_pixel(self, x: f32, y: f32) -> Option<(u32, u32)> {
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            return None;
        }
        let (w, h) = self.physical();
        let px = (x * self.scale_factor).floor() as u32;
        let py = (y * self.scale_factor).floor() as u32;
        (px < w && py < h).then_some((px, py))
    }
}
