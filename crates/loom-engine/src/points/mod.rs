//! Dense point store.
//!
//! Points are the only entities with an absolute position. Nodes and edges
//! reference them by id; ingestion translates ids into dense rows through a
//! [`PointIndex`], and shaders fetch positions by row from the uploaded
//! storage buffer.

mod index;
mod store;

pub use index::PointIndex;
pub use store::{DensePointStore, Point, POINT_STRIDE};
