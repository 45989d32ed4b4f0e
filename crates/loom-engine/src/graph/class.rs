use loom_layout::MappingTable;

use crate::points::PointIndex;
use crate::resolve::ResolveProgram;

use super::edges::EdgeResolve;
use super::nodes::NodeResolve;

/// The closed set of layer kinds a graph view draws.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Nodes,
    Edges,
}

impl LayerKind {
    pub const ALL: [LayerKind; 2] = [LayerKind::Nodes, LayerKind::Edges];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolve program producing this kind's instance rows.
    pub fn program(self) -> &'static dyn ResolveProgram {
        match self {
            LayerKind::Nodes => &NodeResolve,
            LayerKind::Edges => &EdgeResolve,
        }
    }

    /// Draw shader of this kind.
    pub fn shader(self) -> &'static str {
        match self {
            LayerKind::Nodes => crate::render::NODE_SHADER,
            LayerKind::Edges => crate::render::EDGE_SHADER,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerKind::Nodes => "loom nodes",
            LayerKind::Edges => "loom edges",
        }
    }
}

/// A kind of pickable record that resolves against the point store.
///
/// `K` is the caller's key type, shared by points and entities.
pub trait EntityClass<K> {
    type Record;

    const KIND: LayerKind;

    /// Key reported in picking events.
    fn key(record: &Self::Record) -> K;

    /// Mappings for every source field except `picking`, which the view
    /// fills from the layer's id allocation.
    fn default_mappings(points: &PointIndex<K>) -> MappingTable<Self::Record>;

    fn program() -> &'static dyn ResolveProgram {
        Self::KIND.program()
    }
}
