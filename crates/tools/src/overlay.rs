use std::fmt;

use crate::perf::{PerformanceBudget, PerformanceSnapshot};

/// Traffic-light coloring of a value against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayColor {
    White,
    Green,
    Yellow,
    Red,
}

impl OverlayColor {
    /// Green under 75% of budget, yellow under 90%, red beyond.
    pub fn for_ratio(current: f32, budget: f32) -> Self {
        let ratio = if budget > 0.0 { current / budget } else { 0.0 };
        if ratio < 0.75 {
            Self::Green
        } else if ratio < 0.9 {
            Self::Yellow
        } else {
            Self::Red
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::White => "WHITE",
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub color: OverlayColor,
    pub text: String,
}

impl OverlayLine {
    fn new(color: OverlayColor, text: String) -> Self {
        Self { color, text }
    }
}

impl fmt::Display for OverlayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:<6}] {}", self.color.label(), self.text)
    }
}

/// Lines of the on-screen debug overlay for an averaged snapshot.
pub fn overlay_lines(avg: &PerformanceSnapshot, budget: &PerformanceBudget) -> Vec<OverlayLine> {
    vec![
        OverlayLine::new(
            OverlayColor::White,
            format!(
                "=== RAILSTREAM PERF ===  {:.1} FPS ({:.2} ms)",
                avg.fps, avg.frame_time_ms
            ),
        ),
        OverlayLine::new(
            OverlayColor::for_ratio(avg.game_thread_ms, budget.max_game_thread_ms),
            format!(
                "Game Thread: {:.2} / {:.2} ms",
                avg.game_thread_ms, budget.max_game_thread_ms
            ),
        ),
        OverlayLine::new(
            OverlayColor::for_ratio(avg.render_thread_ms, budget.max_render_thread_ms),
            format!(
                "Render:      {:.2} / {:.2} ms",
                avg.render_thread_ms, budget.max_render_thread_ms
            ),
        ),
        OverlayLine::new(
            OverlayColor::for_ratio(avg.streaming_memory_mb, budget.max_streaming_memory_mb),
            format!(
                "Streaming:   {:.1} / {:.1} MB ({} sections)",
                avg.streaming_memory_mb, budget.max_streaming_memory_mb, avg.loaded_sections
            ),
        ),
        OverlayLine::new(
            OverlayColor::for_ratio(
                avg.detail_pool_utilization,
                budget.max_detail_pool_utilization,
            ),
            format!(
                "Detail Pool: {:.1}% / {:.1}%",
                avg.detail_pool_utilization * 100.0,
                budget.max_detail_pool_utilization * 100.0
            ),
        ),
        OverlayLine::new(
            OverlayColor::for_ratio(
                avg.active_characters as f32,
                budget.max_active_characters as f32,
            ),
            format!(
                "Characters:  {} / {}",
                avg.active_characters, budget.max_active_characters
            ),
        ),
        OverlayLine::new(
            OverlayColor::White,
            format!("Memory:      {:.0} MB phys", avg.physical_memory_mb),
        ),
    ]
}
