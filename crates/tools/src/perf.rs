use railstream_common::BudgetMetric;
use railstream_kernel::GameplayEvent;
use serde::{Deserialize, Serialize};

/// One frame's worth of measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub frame_time_ms: f32,
    pub game_thread_ms: f32,
    pub render_thread_ms: f32,
    pub gpu_time_ms: f32,
    pub fps: f32,
    pub physical_memory_mb: f32,
    pub virtual_memory_mb: f32,
    pub draw_calls: u32,
    pub triangles: u32,
    pub active_characters: u32,
    pub pooled_characters: u32,
    pub loaded_sections: u32,
    pub streaming_memory_mb: f32,
    pub detail_pool_utilization: f32,
    pub last_load_time_ms: f32,
}

/// Engine-side timings and counters the host measures each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub game_thread_ms: f32,
    pub render_thread_ms: f32,
    pub gpu_time_ms: f32,
    pub physical_memory_mb: f32,
    pub virtual_memory_mb: f32,
    pub draw_calls: u32,
    pub triangles: u32,
    /// 0..1 fill of the detail-asset pool.
    pub detail_pool_utilization: f32,
}

/// Counters published by the streaming and pool managers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManagerStats {
    pub loaded_sections: usize,
    pub streaming_memory_mb: f32,
    pub last_load_time_ms: f32,
    pub active_characters: usize,
    pub pooled_characters: usize,
}

/// Thresholds the rolling average is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceBudget {
    pub target_frame_time_ms: f32,
    pub max_game_thread_ms: f32,
    pub max_render_thread_ms: f32,
    pub max_streaming_memory_mb: f32,
    pub max_detail_pool_utilization: f32,
    pub max_draw_calls: u32,
    pub max_active_characters: u32,
    pub max_section_load_time_ms: f32,
}

impl Default for PerformanceBudget {
    fn default() -> Self {
        Self {
            target_frame_time_ms: 16.6,
            max_game_thread_ms: 4.0,
            max_render_thread_ms: 10.0,
            max_streaming_memory_mb: 240.0,
            max_detail_pool_utilization: 0.9,
            max_draw_calls: 200,
            max_active_characters: 20,
            max_section_load_time_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Frames kept for averages (120 is two seconds at 60 fps).
    pub history_len: usize,
    /// Seconds between automatic budget checks.
    pub check_interval: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_len: 120,
            check_interval: 1.0,
        }
    }
}

/// A metric whose rolling average is over its limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetViolation {
    pub metric: BudgetMetric,
    pub value: f32,
    pub limit: f32,
}

/// Fixed-capacity ring of recent snapshots.
#[derive(Debug)]
pub struct SnapshotHistory {
    history: Vec<PerformanceSnapshot>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl SnapshotHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![PerformanceSnapshot::default(); capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, snapshot: PerformanceSnapshot) {
        self.history[self.index] = snapshot;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    pub fn count(&self) -> usize {
        if self.filled {
            self.capacity
        } else {
            self.index
        }
    }

    /// Recorded snapshots, in no particular order.
    pub fn samples(&self) -> &[PerformanceSnapshot] {
        &self.history[..self.count()]
    }

    /// Field-wise mean. Empty history averages to zero.
    pub fn average(&self) -> PerformanceSnapshot {
        let samples = self.samples();
        if samples.is_empty() {
            return PerformanceSnapshot::default();
        }
        let n = samples.len() as f32;
        let mean = |f: fn(&PerformanceSnapshot) -> f32| samples.iter().map(f).sum::<f32>() / n;
        let mean_u32 = |f: fn(&PerformanceSnapshot) -> u32| {
            (samples.iter().map(|s| u64::from(f(s))).sum::<u64>() as f32 / n) as u32
        };
        PerformanceSnapshot {
            frame_time_ms: mean(|s| s.frame_time_ms),
            game_thread_ms: mean(|s| s.game_thread_ms),
            render_thread_ms: mean(|s| s.render_thread_ms),
            gpu_time_ms: mean(|s| s.gpu_time_ms),
            fps: mean(|s| s.fps),
            physical_memory_mb: mean(|s| s.physical_memory_mb),
            virtual_memory_mb: mean(|s| s.virtual_memory_mb),
            draw_calls: mean_u32(|s| s.draw_calls),
            triangles: mean_u32(|s| s.triangles),
            active_characters: mean_u32(|s| s.active_characters),
            pooled_characters: mean_u32(|s| s.pooled_characters),
            loaded_sections: mean_u32(|s| s.loaded_sections),
            streaming_memory_mb: mean(|s| s.streaming_memory_mb),
            detail_pool_utilization: mean(|s| s.detail_pool_utilization),
            last_load_time_ms: mean(|s| s.last_load_time_ms),
        }
    }

    /// Field-wise maximum. `fps` is the lowest seen, since that is the
    /// worst case for it.
    pub fn worst(&self) -> PerformanceSnapshot {
        let samples = self.samples();
        let Some(first) = samples.first() else {
            return PerformanceSnapshot::default();
        };
        samples.iter().skip(1).fold(*first, |w, s| PerformanceSnapshot {
            frame_time_ms: w.frame_time_ms.max(s.frame_time_ms),
            game_thread_ms: w.game_thread_ms.max(s.game_thread_ms),
            render_thread_ms: w.render_thread_ms.max(s.render_thread_ms),
            gpu_time_ms: w.gpu_time_ms.max(s.gpu_time_ms),
            fps: w.fps.min(s.fps),
            physical_memory_mb: w.physical_memory_mb.max(s.physical_memory_mb),
            virtual_memory_mb: w.virtual_memory_mb.max(s.virtual_memory_mb),
            draw_calls: w.draw_calls.max(s.draw_calls),
            triangles: w.triangles.max(s.triangles),
            active_characters: w.active_characters.max(s.active_characters),
            pooled_characters: w.pooled_characters.max(s.pooled_characters),
            loaded_sections: w.loaded_sections.max(s.loaded_sections),
            streaming_memory_mb: w.streaming_memory_mb.max(s.streaming_memory_mb),
            detail_pool_utilization: w.detail_pool_utilization.max(s.detail_pool_utilization),
            last_load_time_ms: w.last_load_time_ms.max(s.last_load_time_ms),
        })
    }
}

/// Samples every frame and periodically checks the rolling average against
/// a [`PerformanceBudget`].
#[derive(Debug)]
pub struct PerformanceMonitor {
    config: MonitorConfig,
    budget: PerformanceBudget,
    history: SnapshotHistory,
    current: PerformanceSnapshot,
    check_timer: f32,
    overlay_enabled: bool,
    events: Vec<GameplayEvent>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default(), PerformanceBudget::default())
    }
}

impl PerformanceMonitor {
    pub fn new(config: MonitorConfig, budget: PerformanceBudget) -> Self {
        Self {
            history: SnapshotHistory::new(config.history_len),
            config,
            budget,
            current: PerformanceSnapshot::default(),
            check_timer: 0.0,
            overlay_enabled: false,
            events: Vec::new(),
        }
    }

    /// Record one frame of `dt` seconds. Runs the budget check whenever
    /// `check_interval` has elapsed.
    pub fn record_frame(&mut self, dt: f32, sample: FrameSample, managers: ManagerStats) {
        let _span = tracing::info_span!("performance_sample").entered();
        let frame_time_ms = dt * 1000.0;
        let snapshot = PerformanceSnapshot {
            frame_time_ms,
            game_thread_ms: sample.game_thread_ms,
            render_thread_ms: sample.render_thread_ms,
            gpu_time_ms: sample.gpu_time_ms,
            fps: if frame_time_ms > 0.0 {
                1000.0 / frame_time_ms
            } else {
                0.0
            },
            physical_memory_mb: sample.physical_memory_mb,
            virtual_memory_mb: sample.virtual_memory_mb,
            draw_calls: sample.draw_calls,
            triangles: sample.triangles,
            active_characters: managers.active_characters as u32,
            pooled_characters: managers.pooled_characters as u32,
            loaded_sections: managers.loaded_sections as u32,
            streaming_memory_mb: managers.streaming_memory_mb,
            detail_pool_utilization: sample.detail_pool_utilization,
            last_load_time_ms: managers.last_load_time_ms,
        };
        self.current = snapshot;
        self.history.record(snapshot);

        self.check_timer += dt;
        if self.check_timer >= self.config.check_interval {
            self.check_timer = 0.0;
            self.check_budgets();
        }
    }

    fn check_budgets(&mut self) {
        for violation in self.check_budget_violations() {
            tracing::warn!(
                metric = violation.metric.name(),
                value = violation.value,
                limit = violation.limit,
                "performance budget violated"
            );
            self.events.push(GameplayEvent::PerformanceBudgetViolated {
                metric: violation.metric,
                value: violation.value,
                limit: violation.limit,
            });
        }
    }

    /// Every metric whose rolling average exceeds its budget, in a fixed
    /// order.
    pub fn check_budget_violations(&self) -> Vec<BudgetViolation> {
        let avg = self.average_snapshot();
        let b = &self.budget;
        let checks = [
            (BudgetMetric::FrameTime, avg.frame_time_ms, b.target_frame_time_ms),
            (BudgetMetric::GameThread, avg.game_thread_ms, b.max_game_thread_ms),
            (BudgetMetric::RenderThread, avg.render_thread_ms, b.max_render_thread_ms),
            (
                BudgetMetric::StreamingMemory,
                avg.streaming_memory_mb,
                b.max_streaming_memory_mb,
            ),
            (
                BudgetMetric::DetailAssetPool,
                avg.detail_pool_utilization,
                b.max_detail_pool_utilization,
            ),
            (
                BudgetMetric::DrawCalls,
                avg.draw_calls as f32,
                b.max_draw_calls as f32,
            ),
            (
                BudgetMetric::ActiveCharacters,
                avg.active_characters as f32,
                b.max_active_characters as f32,
            ),
            (
                BudgetMetric::SectionLoadTime,
                avg.last_load_time_ms,
                b.max_section_load_time_ms,
            ),
        ];
        checks
            .into_iter()
            .filter(|(_, value, limit)| value > limit)
            .map(|(metric, value, limit)| BudgetViolation {
                metric,
                value,
                limit,
            })
            .collect()
    }

    pub fn current_snapshot(&self) -> &PerformanceSnapshot {
        &self.current
    }

    pub fn average_snapshot(&self) -> PerformanceSnapshot {
        self.history.average()
    }

    pub fn worst_snapshot(&self) -> PerformanceSnapshot {
        self.history.worst()
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn budget(&self) -> &PerformanceBudget {
        &self.budget
    }

    /// Takes effect at the next periodic check.
    pub fn set_budget(&mut self, budget: PerformanceBudget) {
        self.budget = budget;
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn set_overlay_enabled(&mut self, enabled: bool) {
        self.overlay_enabled = enabled;
    }

    /// Flip the overlay and return the new setting.
    pub fn toggle_overlay(&mut self) -> bool {
        self.overlay_enabled = !self.overlay_enabled;
        tracing::info!(
            overlay = if self.overlay_enabled { "ON" } else { "OFF" },
            "performance overlay toggled"
        );
        self.overlay_enabled
    }

    pub fn is_overlay_enabled(&self) -> bool {
        self.overlay_enabled
    }

    pub fn drain_events(&mut self) -> Vec<GameplayEvent> {
        std::mem::take(&mut self.events)
    }
}
