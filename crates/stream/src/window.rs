use std::collections::BTreeSet;

use railstream_common::{ResidencyState, SectionIndex};
use railstream_kernel::{GameplayEvent, SectionRegistry};
use serde::{Deserialize, Serialize};

use crate::provider::StreamingProvider;

/// Streaming configuration: window size, preloading and memory budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Maximum number of sections in the resident window.
    pub max_loaded_sections: usize,
    /// Sections on each side of the current one that belong to the window.
    pub window_radius: u32,
    /// Preload the section just past the window in the direction of travel.
    pub preload_ahead: bool,
    /// Budget for estimated resident memory, in megabytes.
    pub memory_budget_mb: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_loaded_sections: 3,
            window_radius: 1,
            preload_ahead: true,
            memory_budget_mb: 240.0,
        }
    }
}

/// Point-in-time streaming statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingStats {
    pub loaded_sections: usize,
    pub preloading_sections: usize,
    pub streaming_memory_mb: f32,
    /// Duration of the most recent completed load, in milliseconds.
    pub last_load_time_ms: f32,
    pub loads_requested: u64,
    pub unloads_requested: u64,
}

/// Owns which sections are resident.
///
/// The window is the current section plus `window_radius` neighbours on
/// each side, clipped to the registry and capped at
/// `max_loaded_sections`. Window members are requested from the provider
/// and move `Preloading -> Loaded/Active` once the provider reports them
/// ready. This is the only writer of residency state.
pub struct SectionStreamer<P> {
    config: StreamingConfig,
    registry: SectionRegistry,
    provider: P,
    states: Vec<ResidencyState>,
    load_started_at: Vec<Option<f32>>,
    /// Sections that belong to the window (requested, maybe not ready yet).
    members: BTreeSet<SectionIndex>,
    /// Out-of-window sections being warmed ahead of travel.
    preloads: BTreeSet<SectionIndex>,
    current: Option<SectionIndex>,
    previous: Option<SectionIndex>,
    load_mask: bool,
    refresh_pending: bool,
    clock: f32,
    last_load_time_ms: f32,
    over_budget: bool,
    loads_requested: u64,
    unloads_requested: u64,
    events: Vec<GameplayEvent>,
}

impl<P: StreamingProvider> SectionStreamer<P> {
    pub fn new(config: StreamingConfig, registry: SectionRegistry, provider: P) -> Self {
        let count = registry.len();
        Self {
            config,
            registry,
            provider,
            states: vec![ResidencyState::Unloaded; count],
            load_started_at: vec![None; count],
            members: BTreeSet::new(),
            preloads: BTreeSet::new(),
            current: None,
            previous: None,
            load_mask: false,
            refresh_pending: false,
            clock: 0.0,
            last_load_time_ms: 0.0,
            over_budget: false,
            loads_requested: 0,
            unloads_requested: 0,
            events: Vec::new(),
        }
    }

    /// Move the player into `index` and rebuild the window around it.
    ///
    /// While the load mask is active only `index` itself is requested; the
    /// rest of the refresh is replayed when the mask clears. Unknown
    /// indices are ignored.
    pub fn enter_section(&mut self, index: SectionIndex) {
        if !self.registry.contains(index) {
            tracing::debug!(%index, "enter_section ignored: unregistered section");
            return;
        }
        if self.current == Some(index) {
            return;
        }

        self.previous = self.current;
        self.current = Some(index);
        tracing::debug!(%index, previous = ?self.previous, "entering section");

        if let Some(previous) = self.previous {
            if self.state(previous) == ResidencyState::Active {
                self.set_state(previous, ResidencyState::Loaded);
            }
        }

        if self.load_mask {
            self.refresh_pending = true;
            self.prioritize(index);
            return;
        }

        self.refresh();
    }

    /// Suppress (or stop suppressing) window churn. Clearing the mask
    /// replays a deferred refresh.
    pub fn set_load_mask_active(&mut self, active: bool) {
        self.load_mask = active;
        if !active && self.refresh_pending {
            self.refresh_pending = false;
            self.refresh();
        }
    }

    /// Poll the provider and promote every window member it reports ready.
    pub fn update(&mut self, dt: f32) {
        let _span = tracing::info_span!("section_stream_update").entered();
        self.clock += dt;
        self.provider.poll(dt);

        let waiting: Vec<SectionIndex> = self
            .members
            .iter()
            .copied()
            .filter(|i| self.state(*i) == ResidencyState::Preloading)
            .collect();
        for index in waiting {
            self.promote_if_ready(index);
        }

        self.check_memory_budget();

        tracing::trace!(
            loaded = self.loaded_count(),
            preloading = self.preloads.len(),
            memory_mb = self.streaming_memory_mb(),
            "section stream update complete"
        );
    }

    fn refresh(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        let desired = self.desired_window(current);

        // Unload members that fell out of the window, furthest first.
        let mut stale: Vec<SectionIndex> = self
            .members
            .iter()
            .copied()
            .filter(|i| !desired.contains(i))
            .collect();
        stale.sort_by_key(|i| std::cmp::Reverse(i.distance(current)));
        for index in stale {
            self.unload(index);
        }

        for &index in &desired {
            if self.members.contains(&index) {
                if self.state(index).is_resident() {
                    let target = self.resident_state_for(index);
                    self.set_state(index, target);
                }
            } else {
                self.request_member(index);
            }
        }

        if self.config.preload_ahead {
            self.refresh_preload(current);
        }

        self.enforce_capacity(current);
    }

    /// Window members ordered by distance from `current` (nearest first),
    /// clipped to the registry and truncated to the cap.
    fn desired_window(&self, current: SectionIndex) -> Vec<SectionIndex> {
        let radius = i64::from(self.config.window_radius);
        let mut desired: Vec<SectionIndex> = (-radius..=radius)
            .filter_map(|offset| current.offset(offset))
            .filter(|i| self.registry.contains(*i))
            .collect();
        desired.sort_by_key(|i| (i.distance(current), i.0));
        desired.truncate(self.config.max_loaded_sections.max(1));
        desired
    }

    fn refresh_preload(&mut self, current: SectionIndex) {
        let direction: i64 = match self.previous {
            Some(previous) if previous.0 > current.0 => -1,
            _ => 1,
        };
        let ahead = i64::from(self.config.window_radius) + 1;
        let target = current
            .offset(direction * ahead)
            .filter(|i| self.registry.contains(*i) && !self.members.contains(i));

        let stale: Vec<SectionIndex> = self
            .preloads
            .iter()
            .copied()
            .filter(|i| Some(*i) != target)
            .collect();
        for index in stale {
            self.unload(index);
        }

        if let Some(target) = target {
            if !self.preloads.contains(&target) {
                self.begin_preload(target);
            }
        }
    }

    /// Make `index` a window member under a load mask, evicting the
    /// furthest members first if the cap would be exceeded.
    fn prioritize(&mut self, index: SectionIndex) {
        if self.members.contains(&index) {
            if self.state(index).is_resident() {
                self.set_state(index, ResidencyState::Active);
            }
            return;
        }
        let cap = self.config.max_loaded_sections.max(1);
        while self.members.len() >= cap {
            if !self.evict_furthest(index) {
                break;
            }
        }
        self.request_member(index);
    }

    fn enforce_capacity(&mut self, current: SectionIndex) {
        let cap = self.config.max_loaded_sections.max(1);
        while self.members.len() > cap {
            if !self.evict_furthest(current) {
                break;
            }
        }
    }

    fn evict_furthest(&mut self, from: SectionIndex) -> bool {
        let furthest = self
            .members
            .iter()
            .copied()
            .filter(|i| *i != from)
            .max_by_key(|i| (i.distance(from), i.0));
        match furthest {
            Some(index) => {
                tracing::debug!(%index, "evicting furthest section");
                self.unload(index);
                true
            }
            None => false,
        }
    }

    fn request_member(&mut self, index: SectionIndex) {
        let Some(asset) = self.registry.get(index).map(|s| s.asset.clone()) else {
            tracing::debug!(%index, "load dropped: unregistered section");
            return;
        };
        self.members.insert(index);
        if self.preloads.remove(&index) {
            tracing::debug!(%index, "promoting preloaded section into window");
        } else {
            tracing::debug!(%index, %asset, "requesting section load");
            self.provider.request_load(&asset);
            self.loads_requested += 1;
            self.load_started_at[index.0 as usize] = Some(self.clock);
            self.set_state(index, ResidencyState::Preloading);
        }
        self.promote_if_ready(index);
    }

    fn begin_preload(&mut self, index: SectionIndex) {
        let Some(asset) = self.registry.get(index).map(|s| s.asset.clone()) else {
            return;
        };
        tracing::debug!(%index, %asset, "preloading section ahead of travel");
        self.provider.request_load(&asset);
        self.loads_requested += 1;
        self.load_started_at[index.0 as usize] = Some(self.clock);
        self.preloads.insert(index);
        self.set_state(index, ResidencyState::Preloading);
    }

    fn unload(&mut self, index: SectionIndex) {
        self.members.remove(&index);
        self.preloads.remove(&index);
        if let Some(asset) = self.registry.get(index).map(|s| s.asset.clone()) {
            tracing::debug!(%index, %asset, "unloading section");
            self.provider.request_unload(&asset);
            self.unloads_requested += 1;
        }
        self.load_started_at[index.0 as usize] = None;
        self.set_state(index, ResidencyState::Unloaded);
    }

    fn promote_if_ready(&mut self, index: SectionIndex) {
        if self.state(index) != ResidencyState::Preloading {
            return;
        }
        let ready = self
            .registry
            .get(index)
            .is_some_and(|s| self.provider.is_ready(&s.asset));
        if !ready {
            return;
        }
        if let Some(started) = self.load_started_at[index.0 as usize].take() {
            self.last_load_time_ms = (self.clock - started) * 1000.0;
        }
        let target = self.resident_state_for(index);
        self.set_state(index, target);
        self.events
            .push(GameplayEvent::SectionLoadComplete { section: index });
    }

    fn resident_state_for(&self, index: SectionIndex) -> ResidencyState {
        if self.current == Some(index) {
            ResidencyState::Active
        } else {
            ResidencyState::Loaded
        }
    }

    fn set_state(&mut self, index: SectionIndex, state: ResidencyState) {
        let Some(slot) = self.states.get_mut(index.0 as usize) else {
            return;
        };
        if *slot == state {
            return;
        }
        tracing::debug!(%index, from = ?*slot, to = ?state, "section state changed");
        *slot = state;
        self.events.push(GameplayEvent::SectionStateChanged {
            section: index,
            state,
        });
    }

    fn check_memory_budget(&mut self) {
        let used_mb = self.streaming_memory_mb();
        let budget_mb = self.config.memory_budget_mb;
        let over = used_mb > budget_mb;
        if over && !self.over_budget {
            tracing::warn!(used_mb, budget_mb, "streaming memory over budget");
            self.events
                .push(GameplayEvent::StreamingBudgetExceeded { used_mb, budget_mb });
        }
        self.over_budget = over;
    }

    /// Residency of a section; unknown indices read as `Unloaded`.
    pub fn state(&self, index: SectionIndex) -> ResidencyState {
        self.states
            .get(index.0 as usize)
            .copied()
            .unwrap_or_default()
    }

    /// True once the section is `Loaded` or `Active`.
    pub fn is_section_ready(&self, index: SectionIndex) -> bool {
        self.state(index).is_resident()
    }

    /// Section the player is in, if any has been entered.
    pub fn current_section(&self) -> Option<SectionIndex> {
        self.current
    }

    /// Sections whose content is in memory (`Loaded` or `Active`).
    pub fn loaded_sections(&self) -> Vec<SectionIndex> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_resident())
            .map(|(i, _)| SectionIndex(i as u32))
            .collect()
    }

    /// Window members, including ones still waiting on the provider.
    pub fn window(&self) -> &BTreeSet<SectionIndex> {
        &self.members
    }

    /// Window members still waiting on the provider.
    pub fn preloading_sections(&self) -> &BTreeSet<SectionIndex> {
        &self.preloads
    }

    /// Number of sections whose content is in memory.
    pub fn loaded_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_resident()).count()
    }

    /// Estimated memory of resident sections, plus half the cost of
    /// sections still loading.
    pub fn streaming_memory_mb(&self) -> f32 {
        self.registry
            .iter()
            .map(|s| match self.state(s.index) {
                ResidencyState::Loaded | ResidencyState::Active => s.estimated_memory_mb,
                ResidencyState::Preloading => s.estimated_memory_mb * 0.5,
                ResidencyState::Unloaded => 0.0,
            })
            .sum()
    }

    /// Whether window churn is currently suppressed.
    pub fn is_load_mask_active(&self) -> bool {
        self.load_mask
    }

    /// A window refresh is waiting for the load mask to clear.
    pub fn is_refresh_pending(&self) -> bool {
        self.refresh_pending
    }

    /// Snapshot of residency counts and memory use.
    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            loaded_sections: self.loaded_count(),
            preloading_sections: self.preloads.len(),
            streaming_memory_mb: self.streaming_memory_mb(),
            last_load_time_ms: self.last_load_time_ms,
            loads_requested: self.loads_requested,
            unloads_requested: self.unloads_requested,
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Drain and return pending events.
    pub fn drain_events(&mut self) -> Vec<GameplayEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending events.
    pub fn events(&self) -> &[GameplayEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LatencyProvider;
    use proptest::prelude::*;

    fn streamer(count: u32, provider: LatencyProvider) -> SectionStreamer<LatencyProvider> {
        SectionStreamer::new(
            StreamingConfig::default(),
            SectionRegistry::uniform(count, 50.0),
            provider,
        )
    }

    fn indices(raw: &[u32]) -> Vec<SectionIndex> {
        raw.iter().copied().map(SectionIndex).collect()
    }

    fn asset(s: &SectionStreamer<LatencyProvider>, i: u32) -> railstream_common::AssetHandle {
        s.registry().get(SectionIndex(i)).unwrap().asset.clone()
    }

    #[test]
    fn streaming_config_defaults() {
        let config = StreamingConfig::default();
        assert_eq!(config.max_loaded_sections, 3);
        assert_eq!(config.window_radius, 1);
        assert!(config.preload_ahead);
        assert_eq!(config.memory_budget_mb, 240.0);
    }

    #[test]
    fn enter_builds_three_wide_window() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        assert_eq!(s.loaded_sections(), indices(&[4, 5, 6]));
        assert_eq!(s.state(SectionIndex(5)), ResidencyState::Active);
        assert_eq!(s.state(SectionIndex(4)), ResidencyState::Loaded);
        assert_eq!(s.current_section(), Some(SectionIndex(5)));
    }

    #[test]
    fn stepping_forward_unloads_trailing_section_once() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        s.enter_section(SectionIndex(6));

        assert_eq!(s.loaded_sections(), indices(&[5, 6, 7]));
        assert_eq!(s.state(SectionIndex(4)), ResidencyState::Unloaded);
        let four = asset(&s, 4);
        assert_eq!(s.provider().unload_requests_for(&four), 1);
    }

    #[test]
    fn reentering_current_section_requests_nothing() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        let before = s.stats();
        let requests_before = s.provider().requests().len();

        s.enter_section(SectionIndex(5));

        let after = s.stats();
        assert_eq!(after.loads_requested, before.loads_requested);
        assert_eq!(after.unloads_requested, before.unloads_requested);
        assert_eq!(s.provider().requests().len(), requests_before);
    }

    #[test]
    fn window_clipped_at_train_ends() {
        let mut s = streamer(10, LatencyProvider::instant());
        s.enter_section(SectionIndex(0));
        assert_eq!(s.loaded_sections(), indices(&[0, 1]));

        s.enter_section(SectionIndex(9));
        assert_eq!(s.loaded_sections(), indices(&[8, 9]));
    }

    #[test]
    fn unknown_section_is_ignored() {
        let mut s = streamer(10, LatencyProvider::instant());
        s.enter_section(SectionIndex(42));
        assert_eq!(s.current_section(), None);
        assert!(s.loaded_sections().is_empty());
        assert!(s.provider().requests().is_empty());
        assert_eq!(s.state(SectionIndex(42)), ResidencyState::Unloaded);
    }

    #[test]
    fn preloads_next_section_in_travel_direction() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        assert!(s.preloading_sections().contains(&SectionIndex(7)));
        assert_eq!(s.state(SectionIndex(7)), ResidencyState::Preloading);

        // Travelling backwards moves the preload behind the player.
        s.enter_section(SectionIndex(4));
        assert!(s.preloading_sections().contains(&SectionIndex(2)));
        assert!(!s.preloading_sections().contains(&SectionIndex(7)));
    }

    #[test]
    fn promoted_preload_is_not_requested_twice() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        s.enter_section(SectionIndex(6));
        let seven = asset(&s, 7);
        assert_eq!(s.provider().load_requests_for(&seven), 1);
        assert_eq!(s.state(SectionIndex(7)), ResidencyState::Loaded);
    }

    #[test]
    fn slow_loads_complete_on_update() {
        let mut s = streamer(100, LatencyProvider::new(0.5));
        s.enter_section(SectionIndex(5));
        assert!(s.loaded_sections().is_empty());
        assert_eq!(s.state(SectionIndex(5)), ResidencyState::Preloading);
        s.drain_events();

        s.update(0.25);
        assert!(s.loaded_sections().is_empty());
        s.update(0.25);
        assert_eq!(s.loaded_sections(), indices(&[4, 5, 6]));
        assert_eq!(s.state(SectionIndex(5)), ResidencyState::Active);

        let completed: Vec<SectionIndex> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameplayEvent::SectionLoadComplete { section } => Some(section),
                _ => None,
            })
            .collect();
        assert_eq!(completed, indices(&[4, 5, 6]));
        assert!((s.stats().last_load_time_ms - 500.0).abs() < 1.0);
    }

    #[test]
    fn load_mask_defers_refresh_until_cleared() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));

        s.set_load_mask_active(true);
        s.enter_section(SectionIndex(6));
        assert!(s.is_refresh_pending());
        // Section 4 is still resident: the refresh has not run yet.
        assert_eq!(s.state(SectionIndex(4)), ResidencyState::Loaded);
        assert_eq!(s.state(SectionIndex(6)), ResidencyState::Active);
        assert!(s.loaded_count() <= 3);

        s.set_load_mask_active(false);
        assert!(!s.is_refresh_pending());
        assert_eq!(s.loaded_sections(), indices(&[5, 6, 7]));
    }

    #[test]
    fn masked_jump_evicts_furthest_to_respect_cap() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        s.set_load_mask_active(true);
        s.enter_section(SectionIndex(20));

        assert!(s.window().len() <= 3);
        assert_eq!(s.state(SectionIndex(20)), ResidencyState::Active);
        // 4 is furthest from 20 after 5 and 6: it goes first.
        assert_eq!(s.state(SectionIndex(4)), ResidencyState::Unloaded);

        s.set_load_mask_active(false);
        assert_eq!(s.loaded_sections(), indices(&[19, 20, 21]));
    }

    #[test]
    fn state_changes_are_reported_once() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        let events = s.drain_events();
        let active: Vec<_> = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    GameplayEvent::SectionStateChanged {
                        section: SectionIndex(5),
                        state: ResidencyState::Active
                    }
                )
            })
            .collect();
        assert_eq!(active.len(), 1);
        assert!(s.events().is_empty());
    }

    #[test]
    fn streaming_memory_counts_preloads_at_half() {
        let mut s = streamer(100, LatencyProvider::instant());
        s.enter_section(SectionIndex(5));
        // Three resident at 50 MB, one preload at 25 MB.
        assert_eq!(s.streaming_memory_mb(), 175.0);
    }

    #[test]
    fn memory_budget_event_is_edge_triggered() {
        let config = StreamingConfig {
            memory_budget_mb: 100.0,
            ..StreamingConfig::default()
        };
        let mut s = SectionStreamer::new(
            config,
            SectionRegistry::uniform(100, 50.0),
            LatencyProvider::instant(),
        );
        s.enter_section(SectionIndex(5));
        s.update(0.016);
        s.update(0.016);
        let exceeded = s
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameplayEvent::StreamingBudgetExceeded { .. }))
            .count();
        assert_eq!(exceeded, 1);
    }

    proptest! {
        #[test]
        fn window_invariant_holds_after_settling(
            steps in proptest::collection::vec((0u32..40, any::<bool>()), 1..30),
        ) {
            let mut s = streamer(40, LatencyProvider::instant());
            let mut masked = false;
            for (target, toggle_mask) in steps {
                if toggle_mask {
                    masked = !masked;
                    s.set_load_mask_active(masked);
                }
                s.enter_section(SectionIndex(target));
                prop_assert!(s.window().len() <= 3);
                prop_assert!(s.loaded_count() <= 3);
            }
            s.set_load_mask_active(false);

            let current = s.current_section().unwrap();
            let expected: Vec<SectionIndex> = [current.offset(-1), Some(current), current.offset(1)]
                .into_iter()
                .flatten()
                .filter(|i| i.0 < 40)
                .collect();
            prop_assert_eq!(s.loaded_sections(), expected);
            prop_assert_eq!(s.state(current), ResidencyState::Active);
        }
    }
}
