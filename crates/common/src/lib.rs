//! Shared types: section and character identities, poses, and the state
//! enums every manager reports through the event bus.

mod types;

pub use types::{
    AssetHandle, BehaviorState, BudgetMetric, CharacterId, DoorId, DoorState, LodTier, Pose,
    ResidencyState, SectionIndex, ZoneTag,
};

pub fn crate_info() -> &'static str {
    "railstream-common v0.1.0"
}
