use std::fmt;
use std::hash::Hash;

use loom_layout::{FieldDescriptor, GlType, MappingError, MappingTable, Schema, Value};

use crate::points::PointIndex;
use crate::resolve::ResolveProgram;

use super::class::{EntityClass, LayerKind};

/// A node drawn at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<K> {
    pub id: K,
    pub point: K,
    /// Palette index; `None` uses the default color.
    pub color: Option<u32>,
    /// Multiplies the point radius.
    pub size: f32,
}

impl<K> Node<K> {
    pub fn new(id: K, point: K) -> Self {
        Self {
            id,
            point,
            color: None,
            size: 1.0,
        }
    }

    pub fn with_color(mut self, palette_index: u32) -> Self {
        self.color = Some(palette_index);
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

pub struct NodeClass;

impl<K> EntityClass<K> for NodeClass
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    type Record = Node<K>;

    const KIND: LayerKind = LayerKind::Nodes;

    fn key(record: &Node<K>) -> K {
        record.id.clone()
    }

    fn default_mappings(points: &PointIndex<K>) -> MappingTable<Node<K>> {
        let points = points.clone();
        let mut table = MappingTable::new();
        table
            .set_fn("point", move |n: &Node<K>, _| {
                points
                    .get(&n.point)
                    .map(|row| Some(Value::from(row)))
                    .ok_or_else(|| MappingError::new(format!("unknown point id {:?}", n.point)))
            })
            .set_fn("color", |n: &Node<K>, _| Ok(n.color.map(Value::from)))
            .set_fn("size", |n: &Node<K>, _| Ok(Some(Value::from(n.size))));
        table
    }
}

/// `{point, color, size, picking}` → `{position, radius, color, picking}`.
///
/// `params.user.x` scales every radius.
pub struct NodeResolve;

impl ResolveProgram for NodeResolve {
    fn label(&self) -> &'static str {
        "loom resolve nodes"
    }

    fn wgsl(&self) -> &'static str {
        include_str!("shaders/resolve_nodes.wgsl")
    }

    fn source_schema(&self) -> Schema {
        Schema::new(vec![
            FieldDescriptor::new("point", GlType::U32),
            FieldDescriptor::new("color", GlType::U32),
            FieldDescriptor::new("size", GlType::F32),
            FieldDescriptor::new("picking", GlType::RGBA8),
        ])
        .expect("node source schema is statically valid")
    }

    fn target_schema(&self) -> Schema {
        Schema::new(vec![
            FieldDescriptor::new("position", GlType::VEC3),
            FieldDescriptor::new("radius", GlType::F32),
            FieldDescriptor::new("color", GlType::U32),
            FieldDescriptor::normalized("picking", GlType::RGBA8),
        ])
        .expect("node target schema is statically valid")
    }
}
