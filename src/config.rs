use serde::{Deserialize, Serialize};

use crate::lane::Lane;

/// Main configuration structure loaded from chip_gate.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    pub thresholds: ThresholdConfig,
    pub cooldown: CooldownConfig,
    pub cache: CacheConfig,
    /// Runtime configuration loaded from environment variables
    pub runtime: RuntimeConfig,
}

/// Per-lane intent thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub commerce: f32,
    pub informational: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            commerce: Lane::Commerce.default_threshold(),
            informational: Lane::Informational.default_threshold(),
        }
    }
}

impl ThresholdConfig {
    pub fn for_lane(&self, lane: Lane) -> f32 {
        match lane {
            Lane::Commerce => self.commerce,
            Lane::Informational => self.informational,
        }
    }
}

/// Cooldown windows
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Minutes a URL stays quiet after an offer was shown
    pub url_window_minutes: u64,
    /// Hours an origin stays quiet after a dismissal
    pub dismiss_window_hours: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            url_window_minutes: 30,
            dismiss_window_hours: 24,
        }
    }
}

impl CooldownConfig {
    pub fn url_window_ms(&self) -> i64 {
        minutes_to_ms(self.url_window_minutes)
    }

    pub fn dismiss_window_ms(&self) -> i64 {
        minutes_to_ms(self.dismiss_window_hours.saturating_mul(60))
    }
}

/// Result cache limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_minutes: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 6 * 60,
            max_entries: 200,
        }
    }
}

impl CacheConfig {
    pub fn ttl_ms(&self) -> i64 {
        minutes_to_ms(self.ttl_minutes)
    }
}

fn minutes_to_ms(minutes: u64) -> i64 {
    i64::try_from(minutes.saturating_mul(60_000)).unwrap_or(i64::MAX)
}

/// Runtime configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Quiet period after the last trigger before a pass runs
    pub debounce_ms: u64,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            log_level: "chip_gate=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={}", key, raw);
            None
        }
    }
}

impl GateConfig {
    /// Load configuration from TOML file and environment variables
    /// Uses CHIP_GATE_CONFIG environment variable or defaults to "chip_gate.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("CHIP_GATE_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path =
            std::env::var("CHIP_GATE_CONFIG").unwrap_or_else(|_| "chip_gate.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Env-first overrides for every tunable
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("CHIP_COMMERCE_THRESHOLD") {
            self.thresholds.commerce = v;
        }
        if let Some(v) = env_parse("CHIP_INFO_THRESHOLD") {
            self.thresholds.informational = v;
        }
        if let Some(v) = env_parse("CHIP_URL_COOLDOWN_MIN") {
            self.cooldown.url_window_minutes = v;
        }
        if let Some(v) = env_parse("CHIP_DISMISS_HOURS") {
            self.cooldown.dismiss_window_hours = v;
        }
        if let Some(v) = env_parse("CHIP_CACHE_TTL_MIN") {
            self.cache.ttl_minutes = v;
        }
        if let Some(v) = env_parse("CHIP_CACHE_MAX") {
            self.cache.max_entries = v;
        }
        if let Some(v) = env_parse("CHIP_DEBOUNCE_MS") {
            self.runtime.debounce_ms = v;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.runtime.log_level = level;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for lane in Lane::ALL {
            let t = self.thresholds.for_lane(lane);
            if !(t > 0.0 && t <= 1.0) {
                anyhow::bail!("{} threshold must be in (0.0, 1.0], got {}", lane, t);
            }
        }
        if self.cooldown.url_window_minutes == 0 {
            anyhow::bail!("CHIP_URL_COOLDOWN_MIN must be > 0");
        }
        if self.cooldown.dismiss_window_hours == 0 {
            anyhow::bail!("CHIP_DISMISS_HOURS must be > 0");
        }
        if self.cache.ttl_minutes == 0 {
            anyhow::bail!("CHIP_CACHE_TTL_MIN must be > 0");
        }
        if self.cache.max_entries == 0 {
            anyhow::bail!("CHIP_CACHE_MAX must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds.for_lane(Lane::Commerce), 0.85);
        assert_eq!(config.thresholds.for_lane(Lane::Informational), 0.75);
        assert_eq!(config.cooldown.url_window_ms(), 30 * 60 * 1000);
        assert_eq!(config.cooldown.dismiss_window_ms(), 24 * 60 * 60 * 1000);
        assert_eq!(config.cache.ttl_ms(), 6 * 60 * 60 * 1000);
        assert_eq!(config.runtime.debounce_ms, 400);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GateConfig::from_toml(
            r#"
            [thresholds]
            commerce = 0.9

            [cache]
            max_entries = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.thresholds.commerce, 0.9);
        assert_eq!(config.thresholds.informational, 0.75);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.ttl_minutes, 360);
        assert_eq!(config.cooldown.url_window_minutes, 30);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut config = GateConfig::default();
        config.thresholds.informational = 1.2;
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.thresholds.commerce = 0.0;
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.cooldown.dismiss_window_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(GateConfig::from_toml("thresholds = 3").is_err());
    }
}
