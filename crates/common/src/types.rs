use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Index of a section (one train car) along the linear world.
///
/// Indices are stable and contiguous, `0..N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionIndex(pub u32);

impl SectionIndex {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Topological distance along the train.
    pub fn distance(self, other: SectionIndex) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// The section `offset` cars away, or `None` when that would fall off
    /// the front of the train (negative index).
    pub fn offset(self, offset: i64) -> Option<SectionIndex> {
        let target = i64::from(self.0) + offset;
        u32::try_from(target).ok().map(SectionIndex)
    }
}

impl fmt::Display for SectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02}", self.0)
    }
}

/// Opaque handle the streaming provider understands (a sublevel name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetHandle(pub String);

impl AssetHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse grouping of sections, used by LOD tinting and audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ZoneTag {
    #[default]
    Tail,
    Third,
    Second,
    First,
    Engine,
    Subtrain,
    Exterior,
}

/// Unique identifier for a background character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0.to_string())
    }
}

/// Coarse behavior state a character's AI is in. Saved across freeze/thaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorState {
    #[default]
    Idle,
    Wandering,
    Working,
    Talking,
    Sleeping,
    Alerted,
}

/// Position, orientation and behavior of a character at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
    pub behavior: BehaviorState,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            behavior: BehaviorState::Idle,
        }
    }
}

/// Residency of a section. Owned by the streaming manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResidencyState {
    #[default]
    Unloaded,
    Preloading,
    Loaded,
    Active,
}

impl ResidencyState {
    /// Loaded or active: the section's content is in memory.
    pub fn is_resident(self) -> bool {
        matches!(self, Self::Loaded | Self::Active)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unloaded => "UNLOADED",
            Self::Preloading => "PRELOADING",
            Self::Loaded => "LOADED",
            Self::Active => "ACTIVE",
        }
    }
}

/// Identifies one doorway controller within a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoorId(pub u32);

/// Phase of a doorway transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DoorState {
    #[default]
    Closed,
    Opening,
    WaitingForLoad,
    Open,
    Closing,
}

/// Detail tier assigned to a section by distance from the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LodTier {
    /// Active section.
    Full,
    /// Adjacent, seen through doors.
    Reduced,
    /// A few cars away, exterior shell only.
    Shell,
    /// Far away or beyond the visible cap: billboard.
    #[default]
    Impostor,
}

impl LodTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Full => "LOD0 full",
            Self::Reduced => "LOD1 reduced",
            Self::Shell => "LOD2 shell",
            Self::Impostor => "LOD3 impostor",
        }
    }
}

/// A metric the performance monitor checks against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BudgetMetric {
    FrameTime,
    GameThread,
    RenderThread,
    StreamingMemory,
    DetailAssetPool,
    DrawCalls,
    ActiveCharacters,
    SectionLoadTime,
}

impl BudgetMetric {
    pub fn name(self) -> &'static str {
        match self {
            Self::FrameTime => "FrameTime",
            Self::GameThread => "GameThread",
            Self::RenderThread => "RenderThread",
            Self::StreamingMemory => "StreamingMemory",
            Self::DetailAssetPool => "DetailAssetPool",
            Self::DrawCalls => "DrawCalls",
            Self::ActiveCharacters => "ActiveCharacters",
            Self::SectionLoadTime => "SectionLoadTime",
        }
    }
}

impl fmt::Display for BudgetMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
