use anyhow::{bail, Result};
use loom_layout::{FieldDescriptor, Layout, ScalarKind};

/// Per-instance vertex attributes derived from a packed row layout.
///
/// Shader locations are assigned in layout order starting at
/// `first_location`; slot 0 is left to the shared quad.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceLayout {
    attributes: Vec<wgpu::VertexAttribute>,
    stride: u64,
}

impl InstanceLayout {
    pub fn from_layout(layout: &Layout, first_location: u32) -> Result<Self> {
        let stride = layout.stride() as u64;
        if stride == 0 || stride % 4 != 0 {
            bail!("instance stride {stride} is not a positive multiple of 4");
        }

        let mut attributes = Vec::with_capacity(layout.slots().len());
        for (i, slot) in layout.slots().iter().enumerate() {
            if slot.offset % 4 != 0 {
                bail!(
                    "field `{}` at offset {} is not 4-byte aligned",
                    slot.descriptor.name,
                    slot.offset
                );
            }
            attributes.push(wgpu::VertexAttribute {
                format: vertex_format(&slot.descriptor)?,
                offset: slot.offset as u64,
                shader_location: first_location + i as u32,
            });
        }
        Ok(Self { attributes, stride })
    }

    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }

    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &self.attributes,
        }
    }
}

/// Vertex format of one field.
///
/// `is_integer` picks `Uint*`/`Sint*`, otherwise integer kinds bind
/// normalized. 8- and 16-bit kinds only come in 2 and 4 components.
pub fn vertex_format(field: &FieldDescriptor) -> Result<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;

    let n = field.gl_type.components;
    let int = field.is_integer;
    let format = match (field.gl_type.kind, n) {
        (ScalarKind::F32, 1) => F::Float32,
        (ScalarKind::F32, 2) => F::Float32x2,
        (ScalarKind::F32, 3) => F::Float32x3,
        (ScalarKind::F32, 4) => F::Float32x4,

        (ScalarKind::U32, _) | (ScalarKind::I32, _) if !int => {
            bail!("field `{}`: 32-bit integers cannot bind normalized", field.name)
        }
        (ScalarKind::U32, 1) => F::Uint32,
        (ScalarKind::U32, 2) => F::Uint32x2,
        (ScalarKind::U32, 3) => F::Uint32x3,
        (ScalarKind::U32, 4) => F::Uint32x4,
        (ScalarKind::I32, 1) => F::Sint32,
        (ScalarKind::I32, 2) => F::Sint32x2,
        (ScalarKind::I32, 3) => F::Sint32x3,
        (ScalarKind::I32, 4) => F::Sint32x4,

        (ScalarKind::U16, 2) => if int { F::Uint16x2 } else { F::Unorm16x2 },
        (ScalarKind::U16, 4) => if int { F::Uint16x4 } else { F::Unorm16x4 },
        (ScalarKind::I16, 2) => if int { F::Sint16x2 } else { F::Snorm16x2 },
        (ScalarKind::I16, 4) => if int { F::Sint16x4 } else { F::Snorm16x4 },
        (ScalarKind::U8, 2) => if int { F::Uint8x2 } else { F::Unorm8x2 },
        (ScalarKind::U8, 4) => if int { F::Uint8x4 } else { F::Unorm8x4 },
        (ScalarKind::I8, 2) => if int { F::Sint8x2 } else { F::Snorm8x2 },
        (ScalarKind::I8, 4) => if int { F::Sint8x4 } else { F::Snorm8x4 },

        (kind, n) => bail!("field `{}`: no vertex format for {kind:?} × {n}", field.name),
    };
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_layout::{GlType, Schema};

    #[test]
    fn locations_and_offsets_follow_layout() {
        let schema = Schema::new(vec![
            FieldDescriptor::new("position", GlType::VEC3),
            FieldDescriptor::new("color", GlType::U32),
            FieldDescriptor::normalized("picking", GlType::RGBA8),
        ])
        .unwrap();
        let il = InstanceLayout::from_layout(&Layout::of_schema(&schema), 1).unwrap();

        assert_eq!(il.stride(), 20);
        let got: Vec<_> = il
            .attributes()
            .iter()
            .map(|a| (a.format, a.offset, a.shader_location))
            .collect();
        assert_eq!(
            got,
            vec![
                (wgpu::VertexFormat::Float32x3, 0, 1),
                (wgpu::VertexFormat::Uint32, 12, 2),
                (wgpu::VertexFormat::Unorm8x4, 16, 3),
            ]
        );
        assert_eq!(il.buffer_layout().step_mode, wgpu::VertexStepMode::Instance);
    }

    #[test]
    fn integer_flag_selects_format() {
        let f = FieldDescriptor::new("ids", GlType::RGBA8);
        assert_eq!(vertex_format(&f).unwrap(), wgpu::VertexFormat::Uint8x4);
        let f = FieldDescriptor::normalized("n", GlType::vector(ScalarKind::I16, 2));
        assert_eq!(vertex_format(&f).unwrap(), wgpu::VertexFormat::Snorm16x2);
    }

    #[test]
    fn unsupported_shapes_fail() {
        let f = FieldDescriptor::new("rgb", GlType::vector(ScalarKind::U8, 3));
        assert!(vertex_format(&f).is_err());
        let f = FieldDescriptor::normalized("w", GlType::U32);
        assert!(vertex_format(&f).is_err());

        let schema = Schema::new(vec![
            FieldDescriptor::new("a", GlType::vector(ScalarKind::U8, 2)),
            FieldDescriptor::new("b", GlType::F32),
        ])
        .unwrap();
        let err = InstanceLayout::from_layout(&Layout::of_schema(&schema), 1).unwrap_err();
        assert!(err.to_string().contains("not a positive multiple of 4"));
    }
}
