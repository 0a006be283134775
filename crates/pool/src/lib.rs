//! Background character pool.
//!
//! Characters are registered against a section and follow that section's
//! residency: thawed while it is active, frozen while it is merely loaded,
//! hidden while it is unloaded. Only a handful of thawed characters get a
//! full update each frame; the rest tick at a reduced rate.
//!
//! # Invariants
//! - The pool never holds more than `max_pool_size` entries, nor more than
//!   `max_per_section` in one section.
//! - A refused registration changes nothing.
//! - Saved poses are taken only from thawed characters, so a freeze/thaw
//!   round trip restores the last live pose.

use railstream_common::{CharacterId, Pose, ResidencyState, SectionIndex};
use railstream_kernel::{CharacterHost, GameplayEvent, TickRate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_per_section: usize,
    pub max_full_update_per_frame: usize,
    pub reduced_tick_rate_hz: f32,
    pub max_pool_size: usize,
    /// Seconds between sweeps for characters the host no longer knows.
    pub cleanup_interval: f32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_per_section: 20,
            max_full_update_per_frame: 4,
            reduced_tick_rate_hz: 10.0,
            max_pool_size: 40,
            cleanup_interval: 5.0,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("character {0} is already pooled")]
    Duplicate(CharacterId),
    #[error("character {0} does not exist")]
    UnknownCharacter(CharacterId),
    #[error("pool is full ({max} characters)")]
    PoolFull { max: usize },
    #[error("section {section} is full ({max} characters)")]
    SectionFull { section: SectionIndex, max: usize },
    #[error("character {0} is not pooled")]
    NotRegistered(CharacterId),
}

/// Where a pooled character is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Visible, collidable, updating.
    Thawed,
    /// Visible and collidable but not updating.
    Frozen,
    /// Hidden, not collidable, not updating.
    Deactivated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledCharacter {
    pub id: CharacterId,
    pub section: SectionIndex,
    pub phase: Phase,
    pub full_update_this_frame: bool,
    pub saved: Pose,
}

impl PooledCharacter {
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Thawed
    }
}

/// Who updates at which rate this frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSchedule {
    pub full: Vec<CharacterId>,
    pub reduced: Vec<CharacterId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoolStats {
    pub pooled: usize,
    pub active: usize,
    pub full_updates: usize,
}

/// Schedules background characters; the host owns them.
#[derive(Debug, Default)]
pub struct CharacterPool {
    config: PoolConfig,
    /// Registration order, which is also round-robin order.
    entries: Vec<PooledCharacter>,
    /// Next character owed a full update. Survives removals elsewhere in
    /// the pool.
    next_up: Option<CharacterId>,
    cleanup_timer: f32,
    events: Vec<GameplayEvent>,
}

impl CharacterPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Add a character to `section`, putting it straight into the phase
    /// that matches the section's current residency.
    pub fn register_character<H: CharacterHost>(
        &mut self,
        id: CharacterId,
        section: SectionIndex,
        residency: ResidencyState,
        host: &mut H,
    ) -> Result<(), PoolError> {
        if self.position(id).is_some() {
            return Err(PoolError::Duplicate(id));
        }
        if !host.is_valid(id) {
            return Err(PoolError::UnknownCharacter(id));
        }
        if self.entries.len() >= self.config.max_pool_size {
            let count = self.entries.len() + 1;
            tracing::warn!(%id, %section, count, max = self.config.max_pool_size, "pool full; character not registered");
            self.events
                .push(GameplayEvent::CharacterBudgetExceeded { section, count });
            return Err(PoolError::PoolFull {
                max: self.config.max_pool_size,
            });
        }
        let in_section = self.section_count(section);
        if in_section >= self.config.max_per_section {
            let count = in_section + 1;
            tracing::warn!(%id, %section, count, max = self.config.max_per_section, "section full; character not registered");
            self.events
                .push(GameplayEvent::CharacterBudgetExceeded { section, count });
            return Err(PoolError::SectionFull {
                section,
                max: self.config.max_per_section,
            });
        }

        let saved = host.capture(id).unwrap_or_default();
        let mut entry = PooledCharacter {
            id,
            section,
            phase: Phase::Thawed,
            full_update_this_frame: false,
            saved,
        };
        match residency {
            ResidencyState::Active => thaw(&mut entry, host, self.config.reduced_tick_rate_hz),
            ResidencyState::Loaded => freeze(&mut entry, host),
            ResidencyState::Preloading | ResidencyState::Unloaded => deactivate(&mut entry, host),
        }
        tracing::debug!(%id, %section, phase = ?entry.phase, "character pooled");
        self.entries.push(entry);
        self.emit_changed(section);
        Ok(())
    }

    /// Remove a character from the pool and hand back its entry.
    pub fn unregister_character(&mut self, id: CharacterId) -> Result<PooledCharacter, PoolError> {
        let index = self.position(id).ok_or(PoolError::NotRegistered(id))?;
        if self.next_up == Some(id) {
            self.next_up = self.next_candidate_after(index, |_| true);
        }
        let entry = self.entries.remove(index);
        tracing::debug!(%id, section = %entry.section, "character left pool");
        self.emit_changed(entry.section);
        Ok(entry)
    }

    /// Apply a residency change to every character in `section`.
    pub fn on_section_state<H: CharacterHost>(
        &mut self,
        section: SectionIndex,
        state: ResidencyState,
        host: &mut H,
    ) {
        if state == ResidencyState::Preloading {
            return;
        }
        let hz = self.config.reduced_tick_rate_hz;
        let mut touched = false;
        for entry in self.entries.iter_mut().filter(|e| e.section == section) {
            if !host.is_valid(entry.id) {
                continue;
            }
            touched = true;
            match state {
                ResidencyState::Active if entry.phase != Phase::Thawed => thaw(entry, host, hz),
                ResidencyState::Loaded if entry.phase != Phase::Frozen => freeze(entry, host),
                ResidencyState::Unloaded if entry.phase != Phase::Deactivated => {
                    deactivate(entry, host)
                }
                _ => {}
            }
        }
        if touched {
            tracing::debug!(%section, state = state.label(), active = self.active_count(section), "pool followed section");
            self.emit_changed(section);
        }
    }

    /// Per-frame scheduling: grant full updates round-robin among thawed
    /// characters of the active section, reduced rate to the rest.
    pub fn update<H: CharacterHost>(
        &mut self,
        dt: f32,
        active_section: Option<SectionIndex>,
        host: &mut H,
    ) -> FrameSchedule {
        let _span = tracing::info_span!("character_pool_update").entered();

        self.cleanup_timer += dt;
        if self.cleanup_timer >= self.config.cleanup_interval {
            self.cleanup_timer = 0.0;
            self.sweep(&*host);
        }

        for entry in &mut self.entries {
            entry.full_update_this_frame = false;
        }

        let mut schedule = FrameSchedule::default();
        let Some(active_section) = active_section else {
            return schedule;
        };

        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.section == active_section && e.is_active() && host.is_valid(e.id))
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return schedule;
        }

        let count = candidates.len();
        let grant = self.config.max_full_update_per_frame.min(count);
        let start = self
            .next_up
            .and_then(|id| candidates.iter().position(|&i| self.entries[i].id == id))
            .unwrap_or(0);
        for offset in 0..grant {
            let index = candidates[(start + offset) % count];
            self.entries[index].full_update_this_frame = true;
        }
        self.next_up = Some(self.entries[candidates[(start + grant) % count]].id);

        let reduced = TickRate::Reduced {
            hz: self.config.reduced_tick_rate_hz.max(1.0),
        };
        for &index in &candidates {
            let entry = &self.entries[index];
            if entry.full_update_this_frame {
                host.set_tick_rate(entry.id, TickRate::Full);
                schedule.full.push(entry.id);
            } else {
                host.set_tick_rate(entry.id, reduced);
                schedule.reduced.push(entry.id);
            }
        }

        tracing::trace!(
            full = schedule.full.len(),
            reduced = schedule.reduced.len(),
            pooled = self.entries.len(),
            "character pool update complete"
        );
        schedule
    }

    fn sweep<H: CharacterHost>(&mut self, host: &H) {
        if let Some(next) = self.next_up.filter(|id| !host.is_valid(*id)) {
            self.next_up = self
                .position(next)
                .and_then(|index| self.next_candidate_after(index, |e| host.is_valid(e.id)));
        }
        let mut removed = Vec::new();
        self.entries.retain(|e| {
            let keep = host.is_valid(e.id);
            if !keep {
                removed.push(e.section);
            }
            keep
        });
        if removed.is_empty() {
            return;
        }
        tracing::debug!(count = removed.len(), "swept stale characters");
        removed.sort();
        removed.dedup();
        for section in removed {
            self.emit_changed(section);
        }
    }

    fn emit_changed(&mut self, section: SectionIndex) {
        let active_count = self.active_count(section);
        self.events.push(GameplayEvent::CharacterPoolChanged {
            section,
            active_count,
        });
    }

    /// The character after `entries[index]` in round-robin order among
    /// thawed characters of the same section, wrapping around.
    fn next_candidate_after(
        &self,
        index: usize,
        keep: impl Fn(&PooledCharacter) -> bool,
    ) -> Option<CharacterId> {
        let section = self.entries[index].section;
        let len = self.entries.len();
        (1..len)
            .map(|offset| &self.entries[(index + offset) % len])
            .find(|e| e.section == section && e.is_active() && keep(e))
            .map(|e| e.id)
    }

    fn position(&self, id: CharacterId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Thawed characters in a section.
    pub fn active_count(&self, section: SectionIndex) -> usize {
        self.entries
            .iter()
            .filter(|e| e.section == section && e.is_active())
            .count()
    }

    /// All pooled characters assigned to a section, whatever their phase.
    pub fn section_count(&self, section: SectionIndex) -> usize {
        self.entries.iter().filter(|e| e.section == section).count()
    }

    /// Ids of the thawed characters in a section, in registration order.
    pub fn active_in_section(&self, section: SectionIndex) -> Vec<CharacterId> {
        self.entries
            .iter()
            .filter(|e| e.section == section && e.is_active())
            .map(|e| e.id)
            .collect()
    }

    /// Every pooled character, across all sections.
    pub fn total_pooled(&self) -> usize {
        self.entries.len()
    }

    /// Thawed characters across all sections.
    pub fn total_active(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active()).count()
    }

    /// Characters granted a full update in the last `update`.
    pub fn full_update_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.full_update_this_frame)
            .count()
    }

    /// Look up a pooled character by id.
    pub fn get(&self, id: CharacterId) -> Option<&PooledCharacter> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Pooled characters in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PooledCharacter> {
        self.entries.iter()
    }

    /// Pool-wide counts for the overlay and reports.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pooled: self.total_pooled(),
            active: self.total_active(),
            full_updates: self.full_update_count(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// New limits apply to later registrations and the next frame; already
    /// pooled characters are never evicted by a smaller limit.
    pub fn set_config(&mut self, config: PoolConfig) {
        self.config = config;
    }

    pub fn drain_events(&mut self) -> Vec<GameplayEvent> {
        std::mem::take(&mut self.events)
    }
}

fn thaw<H: CharacterHost>(entry: &mut PooledCharacter, host: &mut H, hz: f32) {
    host.restore(entry.id, &entry.saved);
    host.set_presence(entry.id, true, true);
    host.set_tick_rate(entry.id, TickRate::Reduced { hz: hz.max(1.0) });
    entry.phase = Phase::Thawed;
}

fn freeze<H: CharacterHost>(entry: &mut PooledCharacter, host: &mut H) {
    snapshot_if_thawed(entry, &*host);
    host.set_tick_rate(entry.id, TickRate::Suspended);
    host.set_presence(entry.id, true, true);
    entry.phase = Phase::Frozen;
    entry.full_update_this_frame = false;
}

fn deactivate<H: CharacterHost>(entry: &mut PooledCharacter, host: &mut H) {
    snapshot_if_thawed(entry, &*host);
    host.set_tick_rate(entry.id, TickRate::Suspended);
    host.set_presence(entry.id, false, false);
    entry.phase = Phase::Deactivated;
    entry.full_update_this_frame = false;
}

fn snapshot_if_thawed<H: CharacterHost>(entry: &mut PooledCharacter, host: &H) {
    if entry.phase != Phase::Thawed {
        return;
    }
    if let Some(pose) = host.capture(entry.id) {
        entry.saved = pose;
    }
}

pub fn crate_info() -> &'static str {
    "railstream-pool v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use railstream_common::BehaviorState;
    use railstream_kernel::CharacterRoster;
    use std::collections::BTreeSet;

    fn spawn(roster: &mut CharacterRoster, n: usize) -> Vec<CharacterId> {
        (0..n).map(|_| roster.spawn(Pose::default())).collect()
    }

    fn pool_with(
        roster: &mut CharacterRoster,
        section: SectionIndex,
        residency: ResidencyState,
        n: usize,
    ) -> (CharacterPool, Vec<CharacterId>) {
        let mut pool = CharacterPool::new(PoolConfig::default());
        let ids = spawn(roster, n);
        for &id in &ids {
            pool.register_character(id, section, residency, roster).unwrap();
        }
        (pool, ids)
    }

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("pool"));
    }

    #[test]
    fn registration_follows_section_residency() {
        let mut roster = CharacterRoster::new();
        let ids = spawn(&mut roster, 3);
        let mut pool = CharacterPool::new(PoolConfig::default());
        pool.register_character(ids[0], SectionIndex(1), ResidencyState::Active, &mut roster)
            .unwrap();
        pool.register_character(ids[1], SectionIndex(2), ResidencyState::Loaded, &mut roster)
            .unwrap();
        pool.register_character(ids[2], SectionIndex(3), ResidencyState::Unloaded, &mut roster)
            .unwrap();

        assert_eq!(pool.get(ids[0]).unwrap().phase, Phase::Thawed);
        assert_eq!(pool.get(ids[1]).unwrap().phase, Phase::Frozen);
        assert_eq!(pool.get(ids[2]).unwrap().phase, Phase::Deactivated);
        assert!(!roster.get(ids[2]).unwrap().visible);
        assert!(roster.get(ids[1]).unwrap().visible);
        assert_eq!(roster.get(ids[1]).unwrap().tick_rate, TickRate::Suspended);
        assert_eq!(pool.total_active(), 1);
    }

    #[test]
    fn duplicate_and_unknown_are_refused() {
        let mut roster = CharacterRoster::new();
        let (mut pool, ids) = pool_with(&mut roster, SectionIndex(0), ResidencyState::Active, 1);
        assert_eq!(
            pool.register_character(ids[0], SectionIndex(0), ResidencyState::Active, &mut roster),
            Err(PoolError::Duplicate(ids[0]))
        );
        let ghost = CharacterId::new();
        assert_eq!(
            pool.register_character(ghost, SectionIndex(0), ResidencyState::Active, &mut roster),
            Err(PoolError::UnknownCharacter(ghost))
        );
        assert_eq!(pool.total_pooled(), 1);
    }

    #[test]
    fn section_capacity_refusal_changes_nothing() {
        let mut roster = CharacterRoster::new();
        let (mut pool, _) = pool_with(&mut roster, SectionIndex(4), ResidencyState::Active, 20);
        pool.drain_events();

        let extra = roster.spawn(Pose::default());
        let result = pool.register_character(extra, SectionIndex(4), ResidencyState::Active, &mut roster);
        assert_eq!(
            result,
            Err(PoolError::SectionFull {
                section: SectionIndex(4),
                max: 20
            })
        );
        assert_eq!(pool.total_pooled(), 20);
        assert_eq!(pool.active_count(SectionIndex(4)), 20);
        assert!(pool.get(extra).is_none());
        assert_eq!(
            pool.drain_events(),
            vec![GameplayEvent::CharacterBudgetExceeded {
                section: SectionIndex(4),
                count: 21
            }]
        );
    }

    #[test]
    fn pool_capacity_refusal_changes_nothing() {
        let mut roster = CharacterRoster::new();
        let mut pool = CharacterPool::new(PoolConfig::default());
        for section in 0..2 {
            for id in spawn(&mut roster, 20) {
                pool.register_character(id, SectionIndex(section), ResidencyState::Loaded, &mut roster)
                    .unwrap();
            }
        }
        assert_eq!(pool.total_pooled(), 40);

        let extra = roster.spawn(Pose::default());
        assert_eq!(
            pool.register_character(extra, SectionIndex(9), ResidencyState::Active, &mut roster),
            Err(PoolError::PoolFull { max: 40 })
        );
        assert_eq!(pool.total_pooled(), 40);
        assert_eq!(pool.section_count(SectionIndex(9)), 0);
    }

    #[test]
    fn freeze_thaw_round_trip_preserves_pose() {
        let mut roster = CharacterRoster::new();
        let (mut pool, ids) = pool_with(&mut roster, SectionIndex(2), ResidencyState::Active, 1);
        let id = ids[0];
        let live = Pose {
            position: glam::Vec3::new(3.0, 0.0, -1.5),
            rotation: glam::Quat::from_rotation_y(1.2),
            behavior: BehaviorState::Working,
        };
        roster.set_pose(id, live);

        pool.on_section_state(SectionIndex(2), ResidencyState::Loaded, &mut roster);
        assert_eq!(pool.get(id).unwrap().saved, live);
        assert_eq!(pool.active_count(SectionIndex(2)), 0);

        // The world scribbles over the character while it is frozen.
        roster.set_pose(id, Pose::default());
        pool.on_section_state(SectionIndex(2), ResidencyState::Active, &mut roster);
        let record = roster.get(id).unwrap();
        assert_eq!(record.pose, live);
        assert!(record.visible && record.collidable);
        assert_eq!(pool.active_count(SectionIndex(2)), 1);
    }

    #[test]
    fn deactivate_after_freeze_keeps_frozen_snapshot() {
        let mut roster = CharacterRoster::new();
        let (mut pool, ids) = pool_with(&mut roster, SectionIndex(2), ResidencyState::Active, 1);
        let id = ids[0];
        let live = Pose {
            behavior: BehaviorState::Talking,
            ..Pose::default()
        };
        roster.set_pose(id, live);
        pool.on_section_state(SectionIndex(2), ResidencyState::Loaded, &mut roster);
        roster.set_pose(id, Pose::default());
        pool.on_section_state(SectionIndex(2), ResidencyState::Unloaded, &mut roster);

        let entry = pool.get(id).unwrap();
        assert_eq!(entry.phase, Phase::Deactivated);
        assert_eq!(entry.saved, live);
        let record = roster.get(id).unwrap();
        assert!(!record.visible && !record.collidable);
    }

    #[test]
    fn round_robin_reaches_everyone_within_three_frames() {
        let mut roster = CharacterRoster::new();
        let (mut pool, ids) = pool_with(&mut roster, SectionIndex(5), ResidencyState::Active, 10);

        let mut seen = BTreeSet::new();
        for _ in 0..3 {
            let schedule = pool.update(1.0 / 60.0, Some(SectionIndex(5)), &mut roster);
            assert!(schedule.full.len() <= 4);
            assert_eq!(schedule.full.len() + schedule.reduced.len(), 10);
            assert_eq!(pool.full_update_count(), schedule.full.len());
            for id in &schedule.full {
                assert_eq!(roster.get(*id).unwrap().tick_rate, TickRate::Full);
            }
            for id in &schedule.reduced {
                assert_eq!(
                    roster.get(*id).unwrap().tick_rate,
                    TickRate::Reduced { hz: 10.0 }
                );
            }
            seen.extend(schedule.full);
        }
        assert_eq!(seen, ids.into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn rotation_survives_removals_in_other_sections() {
        let mut roster = CharacterRoster::new();
        let mut pool = CharacterPool::new(PoolConfig::default());
        let elsewhere = spawn(&mut roster, 3);
        for &id in &elsewhere {
            pool.register_character(id, SectionIndex(1), ResidencyState::Loaded, &mut roster)
                .unwrap();
        }
        let active = spawn(&mut roster, 10);
        for &id in &active {
            pool.register_character(id, SectionIndex(5), ResidencyState::Active, &mut roster)
                .unwrap();
        }

        let mut seen = BTreeSet::new();
        seen.extend(pool.update(1.0 / 60.0, Some(SectionIndex(5)), &mut roster).full);
        for id in &elsewhere {
            pool.unregister_character(*id).unwrap();
        }
        for _ in 0..2 {
            seen.extend(pool.update(1.0 / 60.0, Some(SectionIndex(5)), &mut roster).full);
        }
        assert_eq!(seen, active.into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn removing_next_in_line_passes_turn_on() {
        let mut roster = CharacterRoster::new();
        let (mut pool, ids) = pool_with(&mut roster, SectionIndex(5), ResidencyState::Active, 10);

        let first = pool.update(1.0 / 60.0, Some(SectionIndex(5)), &mut roster);
        assert_eq!(first.full, ids[..4].to_vec());
        pool.unregister_character(ids[4]).unwrap();

        let second = pool.update(1.0 / 60.0, Some(SectionIndex(5)), &mut roster);
        assert_eq!(second.full, ids[5..9].to_vec());
        let third = pool.update(1.0 / 60.0, Some(SectionIndex(5)), &mut roster);
        assert_eq!(third.full, vec![ids[9], ids[0], ids[1], ids[2]]);
    }

    #[test]
    fn sweep_keeps_rotation_position() {
        let mut roster = CharacterRoster::new();
        let mut pool = CharacterPool::new(PoolConfig::default());
        let stale = roster.spawn(Pose::default());
        pool.register_character(stale, SectionIndex(2), ResidencyState::Loaded, &mut roster)
            .unwrap();
        let ids = spawn(&mut roster, 6);
        for &id in &ids {
            pool.register_character(id, SectionIndex(5), ResidencyState::Active, &mut roster)
                .unwrap();
        }

        let first = pool.update(1.0, Some(SectionIndex(5)), &mut roster);
        assert_eq!(first.full, ids[..4].to_vec());
        roster.despawn(stale);
        // Crosses the cleanup interval, so this frame sweeps first.
        let second = pool.update(4.5, Some(SectionIndex(5)), &mut roster);
        assert!(pool.get(stale).is_none());
        assert_eq!(second.full, vec![ids[4], ids[5], ids[0], ids[1]]);
    }

    #[test]
    fn only_active_section_is_scheduled() {
        let mut roster = CharacterRoster::new();
        let (mut pool, _) = pool_with(&mut roster, SectionIndex(5), ResidencyState::Active, 3);
        let schedule = pool.update(0.016, Some(SectionIndex(6)), &mut roster);
        assert!(schedule.full.is_empty() && schedule.reduced.is_empty());
        let schedule = pool.update(0.016, None, &mut roster);
        assert_eq!(schedule, FrameSchedule::default());
    }

    #[test]
    fn sweep_removes_despawned_characters() {
        let mut roster = CharacterRoster::new();
        let (mut pool, ids) = pool_with(&mut roster, SectionIndex(1), ResidencyState::Active, 3);
        roster.despawn(ids[1]);

        pool.update(4.0, Some(SectionIndex(1)), &mut roster);
        assert_eq!(pool.total_pooled(), 3);
        pool.update(1.0, Some(SectionIndex(1)), &mut roster);
        assert_eq!(pool.total_pooled(), 2);
        assert!(pool.get(ids[1]).is_none());
    }

    #[test]
    fn unregister_removes_entry() {
        let mut roster = CharacterRoster::new();
        let (mut pool, ids) = pool_with(&mut roster, SectionIndex(1), ResidencyState::Active, 2);
        let removed = pool.unregister_character(ids[0]).unwrap();
        assert_eq!(removed.id, ids[0]);
        assert_eq!(pool.total_pooled(), 1);
        assert_eq!(
            pool.unregister_character(ids[0]),
            Err(PoolError::NotRegistered(ids[0]))
        );
    }
}
