use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::TooltipSize;
use crate::error::{TourError, TourResult};

/// Public engine bootstrap configuration.
///
/// Serializable so hosts can ship tour tuning next to their step tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourEngineConfig {
    /// Size used for placement until the host reports the rendered tooltip size.
    #[serde(default)]
    pub tooltip_size: TooltipSize,
    #[serde(default = "default_tooltip_offset_px")]
    pub tooltip_offset_px: f64,
    #[serde(default = "default_spotlight_padding_px")]
    pub spotlight_padding_px: f64,
    #[serde(default = "default_focus_delay_ms")]
    pub focus_delay_ms: u64,
    /// Container watched for structural changes and size changes.
    /// `None` watches the whole document.
    #[serde(default = "default_root_selector")]
    pub root_selector: Option<String>,
}

impl Default for TourEngineConfig {
    fn default() -> Self {
        Self {
            tooltip_size: TooltipSize::FALLBACK,
            tooltip_offset_px: default_tooltip_offset_px(),
            spotlight_padding_px: default_spotlight_padding_px(),
            focus_delay_ms: default_focus_delay_ms(),
            root_selector: default_root_selector(),
        }
    }
}

impl TourEngineConfig {
    #[must_use]
    pub fn with_tooltip_size(mut self, width: f64, height: f64) -> Self {
        self.tooltip_size = TooltipSize::new(width, height);
        self
    }

    #[must_use]
    pub fn with_tooltip_offset_px(mut self, offset: f64) -> Self {
        self.tooltip_offset_px = offset;
        self
    }

    #[must_use]
    pub fn with_spotlight_padding_px(mut self, padding: f64) -> Self {
        self.spotlight_padding_px = padding;
        self
    }

    #[must_use]
    pub fn with_focus_delay_ms(mut self, delay_ms: u64) -> Self {
        self.focus_delay_ms = delay_ms;
        self
    }

    #[must_use]
    pub fn with_root_selector(mut self, selector: impl Into<String>) -> Self {
        self.root_selector = Some(selector.into());
        self
    }

    /// Watches the whole document instead of a root container.
    #[must_use]
    pub fn without_root_selector(mut self) -> Self {
        self.root_selector = None;
        self
    }

    #[must_use]
    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    pub fn validate(&self) -> TourResult<()> {
        self.tooltip_size.validate()?;
        for (value, name) in [
            (self.tooltip_offset_px, "tooltip_offset_px"),
            (self.spotlight_padding_px, "spotlight_padding_px"),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TourError::InvalidConfig(format!(
                    "`{name}` must be finite and >= 0"
                )));
            }
        }
        if self
            .root_selector
            .as_deref()
            .is_some_and(|selector| selector.trim().is_empty())
        {
            return Err(TourError::InvalidConfig(
                "`root_selector` must not be blank".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_tooltip_offset_px() -> f64 {
    12.0
}

fn default_spotlight_padding_px() -> f64 {
    4.0
}

fn default_focus_delay_ms() -> u64 {
    100
}

fn default_root_selector() -> Option<String> {
    Some("#root".to_owned())
}

#[cfg(test)]
mod tests {
    use super::TourEngineConfig;
    use crate::core::TooltipSize;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: TourEngineConfig =
            serde_json::from_str(r#"{"tooltip_offset_px": 8.0}"#).expect("config");
        assert_eq!(config.tooltip_offset_px, 8.0);
        assert_eq!(config.tooltip_size, TooltipSize::FALLBACK);
        assert_eq!(config.focus_delay_ms, 100);
        assert_eq!(config.root_selector.as_deref(), Some("#root"));
    }

    #[test]
    fn negative_offset_is_rejected() {
        let config = TourEngineConfig::default().with_tooltip_offset_px(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tooltip_size_is_rejected() {
        let config = TourEngineConfig::default().with_tooltip_size(0.0, 180.0);
        assert!(config.validate().is_err());
    }
}
