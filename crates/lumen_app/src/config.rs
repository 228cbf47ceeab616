//! Lumen configuration file handling

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use lumen_core::Size;
use lumen_gpu::CacheConfig;
use lumen_layout::ScreenConfig;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Top-level configuration (lumen.toml)
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LumenConfig {
    #[serde(default)]
    pub screen: ScreenSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub scroll: ScrollSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ScreenSection {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

impl Default for ScreenSection {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Visual asset cache tuning
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CacheSection {
    /// Idle time before an unused asset may be freed
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_ms: u64,
    /// Minimum time between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,
    /// Upper bound on frees per sweep, 0 for no bound
    #[serde(default)]
    pub max_frees_per_sweep: usize,
}

fn default_idle_threshold() -> u64 {
    5000
}

fn default_sweep_interval() -> u64 {
    1000
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            idle_threshold_ms: default_idle_threshold(),
            sweep_interval_ms: default_sweep_interval(),
            max_frees_per_sweep: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ScrollSection {
    /// Length of an animated scroll
    #[serde(default = "default_scroll_duration")]
    pub duration_ms: u64,
}

fn default_scroll_duration() -> u64 {
    150
}

impl Default for ScrollSection {
    fn default() -> Self {
        Self {
            duration_ms: default_scroll_duration(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LoggingSection {
    /// `tracing` filter directives, used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl LumenConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: LumenConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> std::result::Result<(), AppError> {
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(AppError::InvalidConfig(format!(
                "screen size {}x{} must be non-zero",
                self.screen.width, self.screen.height
            )));
        }
        if self.cache.sweep_interval_ms > self.cache.idle_threshold_ms {
            tracing::warn!(
                "cache sweep interval {}ms exceeds idle threshold {}ms",
                self.cache.sweep_interval_ms,
                self.cache.idle_threshold_ms
            );
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            idle_threshold: Duration::from_millis(self.cache.idle_threshold_ms),
            sweep_interval: Duration::from_millis(self.cache.sweep_interval_ms),
            max_frees_per_sweep: self.cache.max_frees_per_sweep,
        }
    }

    pub fn screen_config(&self) -> ScreenConfig {
        ScreenConfig {
            size: Size::new(self.screen.width as f32, self.screen.height as f32),
            cache: self.cache_config(),
            scroll_duration: Duration::from_millis(self.scroll.duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = LumenConfig::from_toml("").unwrap();
        assert_eq!(config, LumenConfig::default());
        assert_eq!(config.screen_config(), ScreenConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = LumenConfig::from_toml(
            r#"
            [screen]
            width = 640

            [cache]
            idle_threshold_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.screen.width, 640);
        assert_eq!(config.screen.height, 720);
        assert_eq!(config.cache.sweep_interval_ms, 1000);

        let cache = config.cache_config();
        assert_eq!(cache.idle_threshold, Duration::from_millis(250));
        assert_eq!(config.screen_config().size, Size::new(640.0, 720.0));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = LumenConfig::from_toml("[screen]\nwidth = 0\n").unwrap_err();
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = LumenConfig::default();
        config.scroll.duration_ms = 300;
        config.logging.filter = "lumen_layout=trace".to_string();
        let text = config.to_toml().unwrap();
        assert_eq!(LumenConfig::from_toml(&text).unwrap(), config);
    }
}
