use std::fmt;
use std::hash::Hash;

use loom_layout::{FieldDescriptor, GlType, MappingError, MappingTable, Schema, Value};

use crate::points::PointIndex;
use crate::resolve::ResolveProgram;

use super::class::{EntityClass, LayerKind};

/// An edge between two points, optionally routed through `via` control points.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<K> {
    pub id: K,
    pub source: K,
    pub target: K,
    pub via: Vec<K>,
    /// Palette indices at the source and target end.
    pub colors: Option<[u32; 2]>,
    /// Logical pixels.
    pub width: f32,
}

impl<K> Edge<K> {
    pub fn new(id: K, source: K, target: K) -> Self {
        Self {
            id,
            source,
            target,
            via: Vec::new(),
            colors: None,
            width: 1.0,
        }
    }

    pub fn with_via(mut self, via: Vec<K>) -> Self {
        self.via = via;
        self
    }

    pub fn with_colors(mut self, source: u32, target: u32) -> Self {
        self.colors = Some([source, target]);
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Number of drawn segments.
    pub fn segments(&self) -> usize {
        self.via.len() + 1
    }

    fn path(&self) -> impl Iterator<Item = &K> {
        std::iter::once(&self.source)
            .chain(self.via.iter())
            .chain(std::iter::once(&self.target))
    }
}

pub struct EdgeClass;

impl<K> EntityClass<K> for EdgeClass
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    type Record = Edge<K>;

    const KIND: LayerKind = LayerKind::Edges;

    fn key(record: &Edge<K>) -> K {
        record.id.clone()
    }

    /// `endpoints` yields one `[from, to]` pair per segment, which flattens
    /// the edge into one row per segment; `segment` is overridden per row
    /// with `[k, segments]`.
    fn default_mappings(points: &PointIndex<K>) -> MappingTable<Edge<K>> {
        let points = points.clone();
        let mut table = MappingTable::new();
        table
            .set_fn("endpoints", move |e: &Edge<K>, _| {
                let rows = e
                    .path()
                    .map(|id| {
                        points
                            .get(id)
                            .ok_or_else(|| MappingError::new(format!("unknown point id {id:?}")))
                    })
                    .collect::<Result<Vec<u32>, _>>()?;
                let pairs = rows.windows(2).map(|w| Value::from([w[0], w[1]])).collect::<Vec<_>>();
                Ok(Some(Value::Sequence(pairs)))
            })
            .set_fn("colors", |e: &Edge<K>, _| Ok(e.colors.map(Value::from)))
            .set_fn("width", |e: &Edge<K>, _| Ok(Some(Value::from(e.width))))
            .set_flatten(
                "segment",
                |_: &Edge<K>, _| Ok(Some(Value::from([0.0f32, 1.0]))),
                |_: &Edge<K>, _, row, rows| Ok(Some(Value::from([row as f32, rows as f32]))),
            );
        table
    }
}

/// `{endpoints, colors, width, segment, picking}` →
/// `{start, end, colors, t, width, picking}`.
///
/// `t` holds the segment's start and end fraction of the whole path, so the
/// color gradient runs across all segments. `params.user.x` scales widths.
pub struct EdgeResolve;

impl ResolveProgram for EdgeResolve {
    fn label(&self) -> &'static str {
        "loom resolve edges"
    }

    fn wgsl(&self) -> &'static str {
        include_str!("shaders/resolve_edges.wgsl")
    }

    fn source_schema(&self) -> Schema {
        Schema::new(vec![
            FieldDescriptor::new("endpoints", GlType::UVEC2),
            FieldDescriptor::new("colors", GlType::UVEC2),
            FieldDescriptor::new("width", GlType::F32),
            FieldDescriptor::new("segment", GlType::VEC2),
            FieldDescriptor::new("picking", GlType::RGBA8),
        ])
        .expect("edge source schema is statically valid")
    }

    fn target_schema(&self) -> Schema {
        Schema::new(vec![
            FieldDescriptor::new("start", GlType::VEC3),
            FieldDescriptor::new("end", GlType::VEC3),
            FieldDescriptor::new("colors", GlType::UVEC2),
            FieldDescriptor::new("t", GlType::VEC2),
            FieldDescriptor::new("width", GlType::F32),
            FieldDescriptor::normalized("picking", GlType::RGBA8),
        ])
        .expect("edge target schema is statically valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{DensePointStore, Point};
    use loom_layout::{pack, PackOptions};

    fn store() -> DensePointStore<char> {
        DensePointStore::from_points(&[
            Point::new('a', 0.0, 0.0, 0.0),
            Point::new('b', 1.0, 0.0, 0.0),
            Point::new('c', 2.0, 0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn via_points_flatten_into_segments() {
        let store = store();
        let mappings = <EdgeClass as EntityClass<char>>::default_mappings(&store.index());
        let edges = [
            Edge::new('x', 'a', 'c').with_via(vec!['b']).with_colors(1, 2).with_width(3.0),
            Edge::new('y', 'c', 'a'),
        ];
        let packed = pack(&edges, &EdgeResolve.source_schema(), &mappings, PackOptions::default()).unwrap();

        assert_eq!(packed.layout().stride(), 32);
        assert_eq!(packed.rows(), 3);
        let row = |r: usize, f: &str| [packed.read(r, f, 0).unwrap(), packed.read(r, f, 1).unwrap()];
        assert_eq!(row(0, "endpoints"), [0.0, 1.0]);
        assert_eq!(row(1, "endpoints"), [1.0, 2.0]);
        assert_eq!(row(0, "segment"), [0.0, 2.0]);
        assert_eq!(row(1, "segment"), [1.0, 2.0]);
        // Plain fields repeat on every segment.
        assert_eq!(row(1, "colors"), [1.0, 2.0]);
        assert_eq!(packed.read(1, "width", 0), Some(3.0));

        assert_eq!(row(2, "endpoints"), [2.0, 0.0]);
        assert_eq!(row(2, "segment"), [0.0, 1.0]);
        assert_eq!(row(2, "colors"), [0.0, 0.0]);
    }

    #[test]
    fn unknown_via_point_fails() {
        let store = store();
        let mappings = <EdgeClass as EntityClass<char>>::default_mappings(&store.index());
        let edges = [Edge::new('x', 'a', 'c').with_via(vec!['z'])];
        let err = pack(&edges, &EdgeResolve.source_schema(), &mappings, PackOptions::default()).unwrap_err();
        assert!(err.to_string().contains("unknown point id 'z'"));
    }

    #[test]
    fn target_stride_is_word_aligned() {
        assert_eq!(EdgeResolve.target_layout().stride(), 48);
    }
}
