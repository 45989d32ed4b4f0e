//! Schema-driven binary layout packer.
//!
//! Turns slices of arbitrary records into one contiguous byte buffer whose rows
//! match a declared [`Schema`], ready to upload as a GPU vertex or storage
//! buffer. The crate is dependency-free so layout logic can be tested without a
//! device.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`schema`] | `ScalarKind`, `GlType`, `FieldDescriptor`, `Schema`, `Layout`, `compute_layout` |
//! | [`mapping`] | `FieldMapping`, `MappingTable`, `Attributes`, `Lookup` |
//! | [`value`] | `Value` |
//! | [`pack`] | `pack`, `pack_with`, `PackObserver`, `PackedBuffer` |
//! | [`error`] | `LayoutError`, `MappingError` |
//!
//! # Quick start
//!
//! ```rust
//! use loom_layout::{pack, FieldDescriptor, GlType, MappingTable, PackOptions, Schema, Value};
//!
//! struct Point { x: f32, y: f32 }
//!
//! let schema = Schema::new(vec![FieldDescriptor::new("xy", GlType::VEC2)]).unwrap();
//! let mut mappings = MappingTable::new();
//! mappings.set_fn("xy", |p: &Point, _| Ok(Some(Value::from([p.x, p.y]))));
//!
//! let packed = pack(&[Point { x: 1.0, y: 2.0 }], &schema, &mappings, PackOptions::default()).unwrap();
//! assert_eq!(packed.layout().stride(), 8);
//! assert_eq!(packed.read(0, "xy", 1), Some(2.0));
//! ```

pub mod error;
pub mod mapping;
pub mod pack;
pub mod schema;
pub mod value;

pub use error::{LayoutError, MappingError};
pub use mapping::{Attributes, FieldMapping, FlattenMapping, FnMapping, Lookup, MappedValue, MappingTable};
pub use pack::{pack, pack_with, PackObserver, PackOptions, PackedBuffer};
pub use schema::{compute_layout, FieldDescriptor, FieldSlot, GlType, Layout, ScalarKind, Schema};
pub use value::Value;
