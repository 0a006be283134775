use std::collections::BTreeMap;

use railstream_common::{CharacterId, DoorId, Pose, SectionIndex, ZoneTag};
use railstream_kernel::{
    CharacterRoster, EventBus, EventKind, GameplayEvent, SectionRegistry, SubscriberId,
};
use railstream_pool::{CharacterPool, FrameSchedule, PoolError};
use railstream_stream::{
    DetailAssets, DoorConfig, DoorError, DoorTransition, SectionLod, SectionStreamer,
    StreamingProvider,
};
use railstream_tools::{
    overlay_lines, ConsoleCommand, FrameSample, ManagerStats, OverlayLine, PerformanceBudget,
    PerformanceMonitor, PerformanceReport, SectionInspector,
};

use crate::config::RuntimeConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("door {0:?} does not exist")]
    UnknownDoor(DoorId),
    #[error(transparent)]
    Door(#[from] DoorError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// What the host measured for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub dt: f32,
    pub sample: FrameSample,
}

impl FrameInput {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            sample: FrameSample::default(),
        }
    }
}

/// Owns every manager and wires them together.
///
/// Residency changes are dispatched synchronously: the pool and the doors
/// see a section's new state before anything else runs, then LOD follows
/// the current section, and finally every event is published on the bus
/// in the order it was emitted.
pub struct Runtime<P: StreamingProvider> {
    streamer: SectionStreamer<P>,
    doors: BTreeMap<DoorId, DoorTransition>,
    next_door: u32,
    door_template: DoorConfig,
    pool: CharacterPool,
    lod: SectionLod,
    monitor: PerformanceMonitor,
    roster: CharacterRoster,
    bus: EventBus,
    frame: u64,
}

impl<P: StreamingProvider> Runtime<P> {
    pub fn new(config: RuntimeConfig, registry: SectionRegistry, provider: P) -> Self {
        let mut lod = SectionLod::new(config.lod);
        for section in registry.iter() {
            lod.register_section(section.index, DetailAssets::default(), zone_tint(section.zone));
        }
        tracing::info!(sections = registry.len(), "runtime created");
        Self {
            streamer: SectionStreamer::new(config.streaming, registry, provider),
            doors: BTreeMap::new(),
            next_door: 0,
            door_template: config.door,
            pool: CharacterPool::new(config.pool),
            lod,
            monitor: PerformanceMonitor::new(config.monitor, config.budget),
            roster: CharacterRoster::new(),
            bus: EventBus::new(),
            frame: 0,
        }
    }

    // -- streaming --

    pub fn enter_section(&mut self, index: SectionIndex) {
        self.streamer.enter_section(index);
        self.pump();
    }

    // -- doors --

    /// Add a door with its own config. Doors pointing at a section the
    /// registry does not know are ignored.
    pub fn add_door(&mut self, config: DoorConfig) -> Option<DoorId> {
        if let Some(destination) = config.destination {
            if !self.streamer.registry().contains(destination) {
                tracing::debug!(%destination, "door to unknown section ignored");
                return None;
            }
        }
        let id = DoorId(self.next_door);
        self.next_door += 1;
        self.doors.insert(id, DoorTransition::new(id, config));
        Some(id)
    }

    /// Add a door leading to `destination` using the configured defaults.
    pub fn add_door_to(&mut self, destination: SectionIndex) -> Option<DoorId> {
        let config = DoorConfig {
            destination: Some(destination),
            ..self.door_template.clone()
        };
        self.add_door(config)
    }

    pub fn begin_door(&mut self, id: DoorId) -> Result<(), RuntimeError> {
        let door = self.doors.get_mut(&id).ok_or(RuntimeError::UnknownDoor(id))?;
        door.begin_transition(&self.streamer)?;
        self.pump();
        Ok(())
    }

    pub fn cancel_door(&mut self, id: DoorId) -> Result<(), RuntimeError> {
        let door = self.doors.get_mut(&id).ok_or(RuntimeError::UnknownDoor(id))?;
        door.cancel_transition(&mut self.streamer)?;
        self.pump();
        Ok(())
    }

    pub fn door(&self, id: DoorId) -> Option<&DoorTransition> {
        self.doors.get(&id)
    }

    pub fn doors(&self) -> impl Iterator<Item = &DoorTransition> {
        self.doors.values()
    }

    // -- characters --

    /// Spawn a character in the roster and pool it in `section`. A refused
    /// registration despawns the character again.
    pub fn spawn_character(
        &mut self,
        section: SectionIndex,
        pose: Pose,
    ) -> Result<CharacterId, RuntimeError> {
        let id = self.roster.spawn(pose);
        if let Err(err) = self.register_character(id, section) {
            self.roster.despawn(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Pool a character the roster already holds. Unknown sections are
    /// ignored.
    pub fn register_character(
        &mut self,
        id: CharacterId,
        section: SectionIndex,
    ) -> Result<(), RuntimeError> {
        if !self.streamer.registry().contains(section) {
            tracing::debug!(%id, %section, "character in unknown section ignored");
            return Ok(());
        }
        let residency = self.streamer.state(section);
        let result = self
            .pool
            .register_character(id, section, residency, &mut self.roster);
        self.publish_manager_events();
        result.map_err(RuntimeError::from)
    }

    pub fn unregister_character(&mut self, id: CharacterId) -> Result<(), RuntimeError> {
        self.pool.unregister_character(id)?;
        self.publish_manager_events();
        Ok(())
    }

    /// Remove a character from the pool (if pooled) and from the roster.
    pub fn despawn_character(&mut self, id: CharacterId) -> bool {
        match self.pool.unregister_character(id) {
            Ok(_) | Err(PoolError::NotRegistered(_)) => {}
            Err(err) => tracing::debug!(%id, %err, "unregister on despawn"),
        }
        self.publish_manager_events();
        self.roster.despawn(id).is_some()
    }

    // -- frame --

    /// Advance every manager by one frame. Returns who gets a full update.
    pub fn update(&mut self, input: FrameInput) -> FrameSchedule {
        let _span = tracing::info_span!("runtime_update", frame = self.frame).entered();
        self.frame += 1;
        let dt = input.dt;

        self.streamer.update(dt);
        self.pump();

        for door in self.doors.values_mut() {
            door.tick(dt, &mut self.streamer);
        }
        self.pump();

        let current = self.streamer.current_section();
        let schedule = self.pool.update(dt, current, &mut self.roster);
        self.publish_manager_events();

        let stats = self.manager_stats();
        self.monitor.record_frame(dt, input.sample, stats);
        self.bus.publish_all(self.monitor.drain_events());

        tracing::trace!(
            full = schedule.full.len(),
            reduced = schedule.reduced.len(),
            "frame done"
        );
        schedule
    }

    /// Drain streaming events until residency settles, dispatching each to
    /// the pool and the doors before it is published.
    fn pump(&mut self) {
        loop {
            let events = self.streamer.drain_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match &event {
                    GameplayEvent::SectionStateChanged { section, state } => {
                        self.pool.on_section_state(*section, *state, &mut self.roster);
                    }
                    GameplayEvent::SectionLoadComplete { section } => {
                        for door in self.doors.values_mut() {
                            door.on_section_loaded(*section, &mut self.streamer);
                        }
                    }
                    _ => {}
                }
                self.bus.publish(event);
            }
        }
        if let Some(current) = self.streamer.current_section() {
            self.lod.set_active_section(current);
        }
        self.publish_manager_events();
    }

    fn publish_manager_events(&mut self) {
        for door in self.doors.values_mut() {
            self.bus.publish_all(door.drain_events());
        }
        self.bus.publish_all(self.pool.drain_events());
        self.bus.publish_all(self.lod.drain_events());
    }

    pub fn manager_stats(&self) -> ManagerStats {
        let stream = self.streamer.stats();
        let pool = self.pool.stats();
        ManagerStats {
            loaded_sections: stream.loaded_sections,
            streaming_memory_mb: stream.streaming_memory_mb,
            last_load_time_ms: stream.last_load_time_ms,
            active_characters: pool.active,
            pooled_characters: pool.pooled,
        }
    }

    // -- operator controls --

    /// Run a console command and return its text output.
    pub fn execute(&mut self, command: ConsoleCommand) -> String {
        tracing::debug!(?command, "console command");
        match command {
            ConsoleCommand::Help => ConsoleCommand::help_text(),
            ConsoleCommand::ToggleOverlay => {
                let on = self.monitor.toggle_overlay();
                format!("Performance overlay: {}", if on { "ON" } else { "OFF" })
            }
            ConsoleCommand::Report => {
                let report = PerformanceReport::from_monitor(&self.monitor);
                report.log();
                report.to_string()
            }
            ConsoleCommand::CheckBudgets => {
                let violations = self.monitor.check_budget_violations();
                if violations.is_empty() {
                    return "All performance budgets OK.".to_string();
                }
                violations
                    .iter()
                    .map(|v| {
                        tracing::warn!(metric = v.metric.name(), value = v.value, limit = v.limit, "budget violation");
                        format!("VIOLATION: {} ({:.2} > {:.2})", v.metric.name(), v.value, v.limit)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            ConsoleCommand::Sections { only } => {
                let mut lines = vec![SectionInspector::summary(&self.streamer).to_string()];
                match only {
                    Some(index) => lines.push(
                        SectionInspector::inspect_section(&self.streamer, &self.lod, &self.pool, index)
                            .map_or_else(|| format!("section {index} not registered"), |r| r.to_string()),
                    ),
                    None => lines.extend(
                        SectionInspector::resident_rows(&self.streamer, &self.lod, &self.pool)
                            .iter()
                            .map(ToString::to_string),
                    ),
                }
                lines.join("\n")
            }
        }
    }

    /// Overlay lines for the rolling average, when the overlay is on.
    pub fn overlay(&self) -> Option<Vec<OverlayLine>> {
        self.monitor
            .is_overlay_enabled()
            .then(|| overlay_lines(&self.monitor.average_snapshot(), self.monitor.budget()))
    }

    /// Takes effect at the next periodic check.
    pub fn set_budget(&mut self, budget: PerformanceBudget) {
        self.monitor.set_budget(budget);
    }

    // -- bus --

    pub fn subscribe(&mut self) -> SubscriberId {
        self.bus.subscribe()
    }

    pub fn subscribe_to(&mut self, kinds: &[EventKind]) -> SubscriberId {
        self.bus.subscribe_to(kinds)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn drain(&mut self, id: SubscriberId) -> Vec<GameplayEvent> {
        self.bus.drain(id)
    }

    // -- accessors --

    pub fn streamer(&self) -> &SectionStreamer<P> {
        &self.streamer
    }

    pub fn provider_mut(&mut self) -> &mut P {
        self.streamer.provider_mut()
    }

    pub fn pool(&self) -> &CharacterPool {
        &self.pool
    }

    pub fn lod(&self) -> &SectionLod {
        &self.lod
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn roster(&self) -> &CharacterRoster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut CharacterRoster {
        &mut self.roster
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Impostor tint per zone, RGBA.
fn zone_tint(zone: ZoneTag) -> [f32; 4] {
    match zone {
        ZoneTag::Tail => [0.45, 0.40, 0.35, 1.0],
        ZoneTag::Third => [0.55, 0.60, 0.50, 1.0],
        ZoneTag::Second => [0.70, 0.65, 0.55, 1.0],
        ZoneTag::First => [0.90, 0.80, 0.55, 1.0],
        ZoneTag::Engine => [0.95, 0.55, 0.25, 1.0],
        ZoneTag::Subtrain => [0.30, 0.30, 0.35, 1.0],
        ZoneTag::Exterior => [0.85, 0.90, 1.00, 1.0],
    }
}
