use railstream_common::{CharacterId, Pose};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How often a character's AI runs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TickRate {
    /// No updates at all (frozen or deactivated).
    #[default]
    Suspended,
    /// Every frame.
    Full,
    /// At a fixed reduced frequency.
    Reduced { hz: f32 },
}

/// The side of the world that owns character identity and lifetime.
///
/// The pool manager only schedules characters; everything it does to a
/// character goes through this trait.
pub trait CharacterHost {
    /// Whether the character still exists.
    fn is_valid(&self, id: CharacterId) -> bool;

    /// Current pose and behavior, if the character exists.
    fn capture(&self, id: CharacterId) -> Option<Pose>;

    /// Put the character back into a previously captured pose.
    fn restore(&mut self, id: CharacterId, pose: &Pose);

    fn set_presence(&mut self, id: CharacterId, visible: bool, collidable: bool);

    fn set_tick_rate(&mut self, id: CharacterId, rate: TickRate);
}

/// Per-character data held by the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub pose: Pose,
    pub visible: bool,
    pub collidable: bool,
    pub tick_rate: TickRate,
}

impl CharacterRecord {
    fn new(pose: Pose) -> Self {
        Self {
            pose,
            visible: true,
            collidable: true,
            tick_rate: TickRate::Full,
        }
    }
}

/// In-memory character store.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterRoster {
    characters: BTreeMap<CharacterId, CharacterRecord>,
}

impl CharacterRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a new character with the given pose. Returns its id.
    pub fn spawn(&mut self, pose: Pose) -> CharacterId {
        let id = CharacterId::new();
        self.spawn_with_id(id, pose);
        id
    }

    /// Spawn a character with a specific id.
    pub fn spawn_with_id(&mut self, id: CharacterId, pose: Pose) {
        self.characters.insert(id, CharacterRecord::new(pose));
    }

    /// Remove a character. Returns its data if it existed.
    pub fn despawn(&mut self, id: CharacterId) -> Option<CharacterRecord> {
        self.characters.remove(&id)
    }

    pub fn get(&self, id: CharacterId) -> Option<&CharacterRecord> {
        self.characters.get(&id)
    }

    pub fn get_mut(&mut self, id: CharacterId) -> Option<&mut CharacterRecord> {
        self.characters.get_mut(&id)
    }

    /// Move a character. Returns false if it does not exist.
    pub fn set_pose(&mut self, id: CharacterId, pose: Pose) -> bool {
        match self.characters.get_mut(&id) {
            Some(record) => {
                record.pose = pose;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CharacterId, &CharacterRecord)> {
        self.characters.iter()
    }
}

impl CharacterHost for CharacterRoster {
    fn is_valid(&self, id: CharacterId) -> bool {
        self.characters.contains_key(&id)
    }

    fn capture(&self, id: CharacterId) -> Option<Pose> {
        self.characters.get(&id).map(|r| r.pose)
    }

    fn restore(&mut self, id: CharacterId, pose: &Pose) {
        if let Some(record) = self.characters.get_mut(&id) {
            record.pose = *pose;
        }
    }

    fn set_presence(&mut self, id: CharacterId, visible: bool, collidable: bool) {
        if let Some(record) = self.characters.get_mut(&id) {
            record.visible = visible;
            record.collidable = collidable;
        }
    }

    fn set_tick_rate(&mut self, id: CharacterId, rate: TickRate) {
        if let Some(record) = self.characters.get_mut(&id) {
            record.tick_rate = rate;
        }
    }
}
