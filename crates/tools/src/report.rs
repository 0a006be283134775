use std::fmt;

use crate::perf::{BudgetViolation, PerformanceBudget, PerformanceMonitor, PerformanceSnapshot};

/// Text report of the rolling window: averages, worst cases and any
/// budget violations.
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    pub average: PerformanceSnapshot,
    pub worst: PerformanceSnapshot,
    pub budget: PerformanceBudget,
    pub violations: Vec<BudgetViolation>,
    pub samples: usize,
}

impl PerformanceReport {
    pub fn from_monitor(monitor: &PerformanceMonitor) -> Self {
        Self {
            average: monitor.average_snapshot(),
            worst: monitor.worst_snapshot(),
            budget: monitor.budget().clone(),
            violations: monitor.check_budget_violations(),
            samples: monitor.history().count(),
        }
    }

    pub fn is_within_budget(&self) -> bool {
        self.violations.is_empty()
    }

    /// Write the report to the log, one line per entry.
    pub fn log(&self) {
        for line in self.to_string().lines() {
            tracing::info!("{line}");
        }
        if !self.violations.is_empty() {
            tracing::warn!(count = self.violations.len(), "performance budget violations");
        }
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, w, b) = (&self.average, &self.worst, &self.budget);
        writeln!(f, "=== PERFORMANCE REPORT ({} samples) ===", self.samples)?;
        writeln!(
            f,
            "Frame Time:  Avg {:.2} ms | Worst {:.2} ms | Budget {:.2} ms",
            a.frame_time_ms, w.frame_time_ms, b.target_frame_time_ms
        )?;
        writeln!(f, "FPS:         Avg {:.1}", a.fps)?;
        writeln!(
            f,
            "Game Thread: Avg {:.2} ms | Worst {:.2} ms | Budget {:.2} ms",
            a.game_thread_ms, w.game_thread_ms, b.max_game_thread_ms
        )?;
        writeln!(
            f,
            "Render:      Avg {:.2} ms | Worst {:.2} ms | Budget {:.2} ms",
            a.render_thread_ms, w.render_thread_ms, b.max_render_thread_ms
        )?;
        writeln!(
            f,
            "Memory:      Physical {:.1} MB | Virtual {:.1} MB",
            a.physical_memory_mb, a.virtual_memory_mb
        )?;
        writeln!(
            f,
            "Streaming:   {:.1} MB loaded | {} sections | Budget {:.1} MB",
            a.streaming_memory_mb, a.loaded_sections, b.max_streaming_memory_mb
        )?;
        writeln!(
            f,
            "Load Time:   Last {:.1} ms | Worst {:.1} ms | Budget {:.1} ms",
            a.last_load_time_ms, w.last_load_time_ms, b.max_section_load_time_ms
        )?;
        writeln!(
            f,
            "Detail Pool: {:.1}% utilization | Budget {:.1}%",
            a.detail_pool_utilization * 100.0,
            b.max_detail_pool_utilization * 100.0
        )?;
        writeln!(
            f,
            "Characters:  {} active | {} pooled | Budget {}",
            a.active_characters, a.pooled_characters, b.max_active_characters
        )?;
        writeln!(f, "Draw Calls:  {} | Budget {}", a.draw_calls, b.max_draw_calls)?;

        if self.violations.is_empty() {
            writeln!(f, "All budgets within limits.")?;
        } else {
            let names: Vec<&str> = self.violations.iter().map(|v| v.metric.name()).collect();
            writeln!(f, "BUDGET VIOLATIONS: {}", names.join(", "))?;
        }
        write!(f, "==========================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::{FrameSample, ManagerStats};

    #[test]
    fn clean_report() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record_frame(0.010, FrameSample::default(), ManagerStats::default());
        let report = PerformanceReport::from_monitor(&monitor);
        assert!(report.is_within_budget());
        assert_eq!(report.samples, 1);
        let text = report.to_string();
        assert!(text.starts_with("=== PERFORMANCE REPORT (1 samples) ==="));
        assert!(text.contains("All budgets within limits."));
    }

    #[test]
    fn report_lists_violations() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record_frame(
            0.010,
            FrameSample {
                draw_calls: 900,
                ..FrameSample::default()
            },
            ManagerStats {
                streaming_memory_mb: 300.0,
                loaded_sections: 3,
                ..ManagerStats::default()
            },
        );
        let text = PerformanceReport::from_monitor(&monitor).to_string();
        assert!(text.contains("BUDGET VIOLATIONS: StreamingMemory, DrawCalls"));
        assert!(text.contains("300.0 MB loaded | 3 sections"));
    }
}
