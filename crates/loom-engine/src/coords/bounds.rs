/// Axis-aligned bounding box in world space.
///
/// Starts empty (`min > max`); [`include`](Self::include) grows it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3 {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds3 {
    pub const EMPTY: Bounds3 = Bounds3 {
        min: [f32::INFINITY; 3],
        max: [f32::NEG_INFINITY; 3],
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn include(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn center(&self) -> [f32; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        std::array::from_fn(|i| (self.min[i] + self.max[i]) * 0.5)
    }

    pub fn size(&self) -> [f32; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        std::array::from_fn(|i| self.max[i] - self.min[i])
    }

    /// Radius of the bounding sphere around [`center`](Self::center).
    pub fn radius(&self) -> f32 {
        let [x, y, z] = self.size();
        0.5 * (x * x + y * y + z * z).sqrt()
    }
}
