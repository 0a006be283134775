//! Runtime: owns the section streamer, doors, character pool, LOD manager
//! and performance monitor, and drives them in a fixed order each frame.
//!
//! # Frame order
//! 1. Streamer polls the provider and promotes finished loads.
//! 2. Doors advance; a door may move the player and hold the load mask.
//! 3. Pool schedules full and reduced updates for the active section.
//! 4. Monitor samples the frame and checks budgets once per interval.
//!
//! Residency events are dispatched to the pool and doors as soon as the
//! streamer emits them, so both observe a settled window before LOD does.

mod config;
mod runtime;

pub use config::{ConfigError, RuntimeConfig};
pub use runtime::{FrameInput, Runtime, RuntimeError};

pub fn crate_info() -> &'static str {
    "railstream-runtime v0.1.0"
}
