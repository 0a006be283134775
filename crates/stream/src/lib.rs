//! Streaming: the resident section window, doorway transitions that hide
//! loads, and distance-based detail tiers.
//!
//! # Invariants
//! - Only [`SectionStreamer`] mutates residency; everything else reads it.
//! - Once settled (no load mask), the resident set is exactly the window
//!   around the current section and never exceeds its cap.
//! - A door never waits for a load forever: the fade fallback guarantees
//!   forward progress.

mod door;
mod lod;
mod provider;
mod window;

pub use door::{DoorCategory, DoorConfig, DoorError, DoorTransition};
pub use lod::{DetailAssets, LodConfig, LodEntry, SectionLod};
pub use provider::{
    LatencyProvider, ProviderError, ProviderRequest, StreamingProvider, ThreadedProvider,
};
pub use window::{SectionStreamer, StreamingConfig, StreamingStats};

pub fn crate_info() -> &'static str {
    "railstream-stream v0.1.0"
}
