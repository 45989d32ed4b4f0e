//! GPU resolve pass.
//!
//! Turns packed source rows that reference points by dense row into
//! self-contained render attributes, once per data load, with a compute
//! dispatch. Output row `i` always corresponds to source row `i`.

mod pass;
mod program;

pub use pass::{ResolvePass, ResolvedBuffer, RESOLVE_WORKGROUP_SIZE};
pub use program::{ResolveProgram, RESOLVE_PRELUDE};
