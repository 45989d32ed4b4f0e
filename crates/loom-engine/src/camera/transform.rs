use glam::{Mat4, Quat, Vec3};

/// Rigid rotation + translation applied to a whole graph.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GraphTransform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for GraphTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl GraphTransform {
    pub const IDENTITY: GraphTransform = GraphTransform {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation: rotation.normalize(),
            translation,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}
