use std::collections::HashSet;

use crate::error::LayoutError;
use crate::mapping::MappingTable;

/// Scalar component type as stored in GPU memory.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl ScalarKind {
    #[inline]
    pub const fn byte_size(self) -> usize {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32)
    }
}

/// Scalar or short vector (`1..=4` components) of one scalar kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GlType {
    pub kind: ScalarKind,
    pub components: u8,
}

impl GlType {
    pub const F32: GlType = GlType::scalar(ScalarKind::F32);
    pub const VEC2: GlType = GlType::vector(ScalarKind::F32, 2);
    pub const VEC3: GlType = GlType::vector(ScalarKind::F32, 3);
    pub const VEC4: GlType = GlType::vector(ScalarKind::F32, 4);
    pub const U32: GlType = GlType::scalar(ScalarKind::U32);
    pub const UVEC2: GlType = GlType::vector(ScalarKind::U32, 2);
    pub const RGBA8: GlType = GlType::vector(ScalarKind::U8, 4);

    #[inline]
    pub const fn scalar(kind: ScalarKind) -> Self {
        Self { kind, components: 1 }
    }

    #[inline]
    pub const fn vector(kind: ScalarKind, components: u8) -> Self {
        Self { kind, components }
    }

    /// Bytes occupied by one cell of this type.
    #[inline]
    pub const fn byte_size(self) -> usize {
        self.kind.byte_size() * self.components as usize
    }

    #[inline]
    pub const fn is_vector(self) -> bool {
        self.components > 1
    }
}

/// Declarative description of one field of a record layout.
///
/// `is_integer` selects integer attribute binding. When `false`, integer kinds
/// are bound normalized (e.g. `u8 × 4` as `unorm8x4`).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub gl_type: GlType,
    pub is_integer: bool,
}

impl FieldDescriptor {
    /// Descriptor bound as integer for integer kinds, float for `f32`.
    pub fn new(name: impl Into<String>, gl_type: GlType) -> Self {
        Self {
            name: name.into(),
            gl_type,
            is_integer: !gl_type.kind.is_float(),
        }
    }

    /// Descriptor whose integer components are read back normalized.
    pub fn normalized(name: impl Into<String>, gl_type: GlType) -> Self {
        Self {
            name: name.into(),
            gl_type,
            is_integer: false,
        }
    }
}

/// Ordered list of field descriptors.
///
/// Declaration order is the physical order of fields inside a row.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Validates names and component counts.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, LayoutError> {
        let mut seen = HashSet::new();
        for f in &fields {
            if !(1..=4).contains(&f.gl_type.components) {
                return Err(LayoutError::InvalidComponents {
                    field: f.name.clone(),
                    components: f.gl_type.components,
                });
            }
            if !seen.insert(f.name.as_str()) {
                return Err(LayoutError::DuplicateField(f.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field placed inside a row.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FieldSlot {
    pub descriptor: FieldDescriptor,
    /// Byte offset from the start of the row.
    pub offset: usize,
}

/// Physical row layout: included fields with offsets, and the row stride.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Layout {
    slots: Vec<FieldSlot>,
    stride: usize,
}

impl Layout {
    /// Layout with every schema field included.
    pub fn of_schema(schema: &Schema) -> Self {
        Self::build(schema.fields().iter())
    }

    fn build<'a>(fields: impl Iterator<Item = &'a FieldDescriptor>) -> Self {
        let mut slots = Vec::new();
        let mut offset = 0usize;
        for f in fields {
            slots.push(FieldSlot { descriptor: f.clone(), offset });
            offset += f.gl_type.byte_size();
        }
        Self { slots, stride: offset }
    }

    #[inline]
    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    /// Row size in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn slot(&self, name: &str) -> Option<&FieldSlot> {
        self.slots.iter().find(|s| s.descriptor.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.descriptor.name.as_str())
    }
}

/// Computes field order and stride for `schema` under `mappings`.
///
/// Fields whose mapping is explicitly disabled are left out. The result only
/// depends on the schema order and the set of disabled fields.
pub fn compute_layout<R>(schema: &Schema, mappings: &MappingTable<R>) -> Layout {
    Layout::build(
        schema
            .fields()
            .iter()
            .filter(|f| !mappings.is_disabled(&f.name)),
    )
}
