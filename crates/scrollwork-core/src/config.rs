use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
    #[serde(default)]
    pub pin: PinConfig,
    #[serde(default)]
    pub counter: CounterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Easing curves available to scroll tweens, timelines and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    /// Jump to the end value on completion
    None,
    #[default]
    Linear,
    Power1Out,
    Power2Out,
    Power3Out,
    Power3InOut,
    Cubic,
    Quintic,
    /// `min(1, 1.001 - 2^(-10t))`
    ExpoOut,
}

/// Scroll axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Default duration of programmatic scrolls
    #[serde(default = "default_scroll_duration")]
    pub duration_ms: u64,
    /// Default easing of programmatic scrolls
    #[serde(default = "default_scroll_easing")]
    pub easing: EasingType,
    /// Fraction of the remaining gap closed every tick, in (0, 1]
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f64,
    #[serde(default = "default_wheel_multiplier")]
    pub wheel_multiplier: f64,
    #[serde(default = "default_touch_multiplier")]
    pub touch_multiplier: f64,
    #[serde(default)]
    pub orientation: Orientation,
    /// Disable clamping of the raw position to the scrollable range
    #[serde(default)]
    pub infinite: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_scroll_duration(),
            easing: default_scroll_easing(),
            smoothing_factor: default_smoothing_factor(),
            wheel_multiplier: default_wheel_multiplier(),
            touch_multiplier: default_touch_multiplier(),
            orientation: Orientation::default(),
            infinite: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Frame gaps above this are treated as lag (0 = lag smoothing disabled)
    #[serde(default)]
    pub lag_threshold_ms: u64,
    /// Delta substituted for a lagging frame
    #[serde(default = "default_lag_adjusted")]
    pub lag_adjusted_ms: u64,
    /// Hard ceiling on the delta fed to the pipeline
    #[serde(default = "default_max_delta")]
    pub max_delta_ms: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            lag_threshold_ms: 0,
            lag_adjusted_ms: default_lag_adjusted(),
            max_delta_ms: default_max_delta(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    /// How far before the start boundary an anticipating pin engages
    #[serde(default = "default_anticipate_px")]
    pub anticipate_px: f64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            anticipate_px: default_anticipate_px(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    #[serde(default = "default_counter_duration")]
    pub duration_ms: u64,
    #[serde(default)]
    pub easing: EasingType,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_counter_duration(),
            easing: EasingType::Linear,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scroll_duration() -> u64 {
    1500
}

fn default_scroll_easing() -> EasingType {
    EasingType::ExpoOut
}

fn default_smoothing_factor() -> f64 {
    0.1
}

fn default_wheel_multiplier() -> f64 {
    1.0
}

fn default_touch_multiplier() -> f64 {
    2.0
}

fn default_lag_adjusted() -> u64 {
    33
}

fn default_max_delta() -> u64 {
    1000
}

fn default_anticipate_px() -> f64 {
    8.0
}

fn default_counter_duration() -> u64 {
    2000
}

/// Clamp a numeric option into `[min, max]`, logging when it was out of range.
///
/// NaN maps to `min`.
pub(crate) fn sanitize_f64(field: &str, value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        warn!(field, value, clamped = min, "Invalid option, using minimum");
        return min;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(field, value, clamped, "Option out of range, clamping");
    }
    clamped
}

impl SchedulerConfig {
    /// Return a copy with every numeric option clamped into its valid range
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        let scroll = &mut config.scroll;
        scroll.smoothing_factor =
            sanitize_f64("scroll.smoothing_factor", scroll.smoothing_factor, 0.001, 1.0);
        scroll.wheel_multiplier =
            sanitize_f64("scroll.wheel_multiplier", scroll.wheel_multiplier, 0.0, f64::MAX);
        scroll.touch_multiplier =
            sanitize_f64("scroll.touch_multiplier", scroll.touch_multiplier, 0.0, f64::MAX);

        let ticker = &mut config.ticker;
        if ticker.max_delta_ms == 0 {
            warn!(field = "ticker.max_delta_ms", "Zero frame delta ceiling, using default");
            ticker.max_delta_ms = default_max_delta();
        }
        if ticker.lag_threshold_ms > 0 && ticker.lag_adjusted_ms > ticker.lag_threshold_ms {
            warn!(
                field = "ticker.lag_adjusted_ms",
                value = ticker.lag_adjusted_ms,
                clamped = ticker.lag_threshold_ms,
                "Lag adjustment above threshold, clamping"
            );
            ticker.lag_adjusted_ms = ticker.lag_threshold_ms;
        }

        config.pin.anticipate_px =
            sanitize_f64("pin.anticipate_px", config.pin.anticipate_px, 0.0, f64::MAX);
        config
    }

    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        Ok(config.sanitized())
    }

    /// Save configuration to the default path
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    /// Always uses ~/.config/scrollwork/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("scrollwork")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.scroll.duration_ms, 1500);
        assert_eq!(config.scroll.easing, EasingType::ExpoOut);
        assert_eq!(config.scroll.touch_multiplier, 2.0);
        assert_eq!(config.scroll.orientation, Orientation::Vertical);
        assert!(!config.scroll.infinite);
        assert_eq!(config.ticker.lag_threshold_ms, 0);
        assert_eq!(config.counter.duration_ms, 2000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SchedulerConfig = toml::from_str(
            r#"
            [scroll]
            smoothing_factor = 0.2
            orientation = "horizontal"
            easing = "power3_out"
            "#,
        )
        .unwrap();
        assert_eq!(config.scroll.smoothing_factor, 0.2);
        assert_eq!(config.scroll.orientation, Orientation::Horizontal);
        assert_eq!(config.scroll.easing, EasingType::Power3Out);
        assert_eq!(config.scroll.wheel_multiplier, 1.0);
        assert_eq!(config.pin.anticipate_px, 8.0);
    }

    #[test]
    fn test_sanitized_clamps_out_of_range() {
        let mut config = SchedulerConfig::default();
        config.scroll.smoothing_factor = 3.0;
        config.scroll.wheel_multiplier = -1.0;
        config.pin.anticipate_px = f64::NAN;
        config.ticker.max_delta_ms = 0;

        let config = config.sanitized();
        assert_eq!(config.scroll.smoothing_factor, 1.0);
        assert_eq!(config.scroll.wheel_multiplier, 0.0);
        assert_eq!(config.pin.anticipate_px, 0.0);
        assert_eq!(config.ticker.max_delta_ms, 1000);
    }

    #[test]
    fn test_toml_roundtrip_keeps_easing() {
        let mut config = SchedulerConfig::default();
        config.counter.easing = EasingType::Power1Out;
        let text = config.to_toml().unwrap();
        let parsed: SchedulerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.counter.easing, EasingType::Power1Out);
    }
}
