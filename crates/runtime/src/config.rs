use std::path::Path;

use railstream_pool::PoolConfig;
use railstream_stream::{DoorConfig, LodConfig, StreamingConfig};
use railstream_tools::{MonitorConfig, PerformanceBudget};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Every tunable of the runtime. Missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub streaming: StreamingConfig,
    /// Template for doors added without their own config.
    pub door: DoorConfig,
    pub pool: PoolConfig,
    pub lod: LodConfig,
    pub monitor: MonitorConfig,
    pub budget: PerformanceBudget,
}

impl RuntimeConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as
    /// YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_yaml_str(&text)?
        };
        tracing::info!(path = %path.display(), "runtime config loaded");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.streaming;
        require(s.max_loaded_sections > 0, "streaming.max_loaded_sections must be > 0")?;
        require(s.memory_budget_mb > 0.0, "streaming.memory_budget_mb must be > 0")?;

        let d = &self.door;
        require(
            d.streaming_trigger_threshold > 0.0 && d.streaming_trigger_threshold <= 1.0,
            "door.streaming_trigger_threshold must be in (0, 1]",
        )?;
        require(d.max_load_wait >= 0.0, "door.max_load_wait must be >= 0")?;
        require(d.fade_duration > 0.0, "door.fade_duration must be > 0")?;
        require(d.open_dwell >= 0.0, "door.open_dwell must be >= 0")?;
        require(d.duration_override >= 0.0, "door.duration_override must be >= 0")?;

        let p = &self.pool;
        require(p.max_pool_size > 0, "pool.max_pool_size must be > 0")?;
        require(p.max_per_section > 0, "pool.max_per_section must be > 0")?;
        require(
            p.max_full_update_per_frame > 0,
            "pool.max_full_update_per_frame must be > 0",
        )?;
        require(p.reduced_tick_rate_hz > 0.0, "pool.reduced_tick_rate_hz must be > 0")?;
        require(p.cleanup_interval > 0.0, "pool.cleanup_interval must be > 0")?;

        let l = &self.lod;
        require(
            l.lod1_max_distance <= l.lod2_max_distance,
            "lod.lod1_max_distance must not exceed lod.lod2_max_distance",
        )?;

        let m = &self.monitor;
        require(m.history_len > 0, "monitor.history_len must be > 0")?;
        require(m.check_interval > 0.0, "monitor.check_interval must be > 0")?;
        Ok(())
    }
}

fn require(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid(message.to_string()))
    }
}
