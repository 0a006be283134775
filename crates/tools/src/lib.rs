//! Developer tooling: performance budget monitor, debug overlay, text
//! reports, section inspector and operator console commands.
//!
//! # Invariants
//! - Everything here observes; nothing changes residency, pooling or LOD.
//! - Budget checks compare the rolling average, never a single frame.

mod console;
mod inspector;
mod overlay;
mod perf;
mod report;

pub use console::{ConsoleCommand, ConsoleError};
pub use inspector::{SectionInspector, SectionRow, StreamingSummary};
pub use overlay::{OverlayColor, OverlayLine, overlay_lines};
pub use perf::{
    BudgetViolation, FrameSample, ManagerStats, MonitorConfig, PerformanceBudget,
    PerformanceMonitor, PerformanceSnapshot, SnapshotHistory,
};
pub use report::PerformanceReport;

pub fn crate_info() -> &'static str {
    "railstream-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
