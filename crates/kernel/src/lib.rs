//! Kernel: the static section registry, the character roster that owns
//! character identity, and the gameplay event bus.
//!
//! # Invariants
//! - The registry is built once and never mutated while managers run.
//! - Events are delivered to every subscriber in publish order.
//! - Managers never own characters; they hold ids and ask the host.

pub mod events;
pub mod registry;
pub mod roster;

pub use events::{EventBus, EventKind, GameplayEvent, SubscriberId};
pub use registry::{Section, SectionRegistry};
pub use roster::{CharacterHost, CharacterRecord, CharacterRoster, TickRate};

pub fn crate_info() -> &'static str {
    "railstream-kernel v0.1.0"
}
