//! Progressive render scheduler.
//!
//! A render request first produces a cheap draft frame plus the picking
//! frame, then refines on timers: medium quality after a short delay, then a
//! two-pass high quality frame. A new request cancels any pending
//! refinement.

mod mode;
mod scheduler;

pub use mode::{FramePlan, PassTarget, RenderMode, RenderPass};
pub use scheduler::{RenderScheduler, SchedulerConfig, TimerToken};
