//! Color picking.
//!
//! Every pickable entity gets a unique id in `[0, 2^31)`, drawn into an
//! off-screen target as an RGBA8 color. Reading the pixel under the pointer
//! and decoding it yields the entity. The allocator hands out ids, the router
//! maps them back to caller keys and turns pointer activity into events.

mod allocator;
mod codec;
mod router;
mod target;

pub use allocator::{IdRange, PickingAllocation, PickingAllocator, PickingError};
pub use codec::{decode, encode, ID_SPACE};
pub use router::{PickEvent, PickingHandle, PickingRouter};
pub use target::{PickingTarget, PICKING_FORMAT};
