//! Immutable tour step definitions.

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::PreferredSide;
use crate::error::{TourError, TourResult};

/// One tour stop: which element to highlight and what to say about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourStep {
    pub selector: String,
    pub title: String,
    pub content: String,
    #[serde(default, rename = "position", alias = "preferred_side")]
    pub preferred_side: PreferredSide,
}

impl TourStep {
    #[must_use]
    pub fn new(
        selector: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            title: title.into(),
            content: content.into(),
            preferred_side: PreferredSide::Unset,
        }
    }

    #[must_use]
    pub fn with_side(mut self, side: PreferredSide) -> Self {
        self.preferred_side = side;
        self
    }
}

/// Ordered, shared, read-only step sequence.
///
/// Cloning is cheap and every clone observes the same steps for the lifetime
/// of a tour session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourSteps {
    steps: Arc<[TourStep]>,
}

impl TourSteps {
    /// Builds a sequence, rejecting steps whose selector is blank.
    pub fn new(steps: Vec<TourStep>) -> TourResult<Self> {
        for (index, step) in steps.iter().enumerate() {
            if step.selector.trim().is_empty() {
                return Err(TourError::InvalidStep {
                    index,
                    reason: "selector must not be blank".to_owned(),
                });
            }
        }
        Ok(Self {
            steps: steps.into(),
        })
    }

    /// Parses a JSON array of steps.
    pub fn from_json(raw: &str) -> TourResult<Self> {
        let steps: Vec<TourStep> = serde_json::from_str(raw)?;
        Self::new(steps)
    }

    pub fn to_json(&self) -> TourResult<String> {
        Ok(serde_json::to_string_pretty(&*self.steps)?)
    }

    #[must_use]
    pub fn is_last(&self, index: usize) -> bool {
        !self.steps.is_empty() && index == self.steps.len() - 1
    }
}

impl Default for TourSteps {
    fn default() -> Self {
        Self {
            steps: Arc::from(Vec::new()),
        }
    }
}

impl Deref for TourSteps {
    type Target = [TourStep];

    fn deref(&self) -> &Self::Target {
        &self.steps
    }
}

impl Serialize for TourSteps {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.steps[..].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TourSteps {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let steps = Vec::<TourStep>::deserialize(deserializer)?;
        Self::new(steps).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{TourStep, TourSteps};
    use crate::core::PreferredSide;
    use crate::error::TourError;

    #[test]
    fn json_position_field_maps_to_preferred_side() {
        let steps = TourSteps::from_json(
            r#"[
                {"selector": ".a", "title": "A", "content": "first", "position": "left"},
                {"selector": ".b", "title": "B", "content": "second"}
            ]"#,
        )
        .expect("steps");

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].preferred_side, PreferredSide::Left);
        assert_eq!(steps[1].preferred_side, PreferredSide::Unset);
    }

    #[test]
    fn blank_selector_is_rejected_with_index() {
        let err = TourSteps::new(vec![
            TourStep::new(".ok", "ok", "ok"),
            TourStep::new("  ", "bad", "bad"),
        ])
        .expect_err("blank selector");
        assert!(matches!(err, TourError::InvalidStep { index: 1, .. }));
    }

    #[test]
    fn empty_sequence_has_no_last_step() {
        let steps = TourSteps::default();
        assert!(steps.is_empty());
        assert!(!steps.is_last(0));
    }
}
