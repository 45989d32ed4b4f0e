//! Graph view: entity classes, layers and the per-window view object.
//!
//! | Type | Role |
//! |------|------|
//! | [`Node`], [`Edge`] | caller records, keyed by `K` |
//! | [`EntityClass`] | default mappings + resolve program of a record kind |
//! | [`LayerKind`] | closed set of drawable layer kinds |
//! | [`GraphView`] | points, palette, picking, scheduler, camera and layers |

mod class;
mod edges;
mod nodes;
mod view;

pub use class::{EntityClass, LayerKind};
pub use edges::{Edge, EdgeClass, EdgeResolve};
pub use nodes::{Node, NodeClass, NodeResolve};
pub use view::{GraphView, LayerId, ViewConfig};
