use serde::{Deserialize, Serialize};

use crate::core::{BoundingBox, TooltipPosition, TooltipSize};
use crate::steps::TourStep;

/// Render-ready engine output.
///
/// Always published as a whole; consumers never observe a mix of two
/// recomputations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub visible: bool,
    pub current_step: Option<TourStep>,
    pub current_index: Option<usize>,
    pub total_steps: usize,
    pub tooltip_position: TooltipPosition,
    /// Tooltip size the position was clamped for.
    #[serde(default)]
    pub tooltip_size: TooltipSize,
    pub target_rect: Option<BoundingBox>,
    pub is_last_step: bool,
}

impl EngineState {
    /// No active step.
    #[must_use]
    pub fn hidden(total_steps: usize) -> Self {
        Self {
            total_steps,
            ..Self::default()
        }
    }

    /// Step is current but its target has not been measured (or is missing).
    #[must_use]
    pub fn awaiting_target(step: TourStep, index: usize, total_steps: usize) -> Self {
        Self {
            visible: false,
            current_step: Some(step),
            current_index: Some(index),
            total_steps,
            tooltip_position: TooltipPosition::default(),
            tooltip_size: TooltipSize::default(),
            target_rect: None,
            is_last_step: index + 1 == total_steps,
        }
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.current_index.is_some_and(|index| index > 0)
    }

    /// 1-based "current of total" pair for step counters.
    #[must_use]
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.current_index
            .map(|index| (index + 1, self.total_steps))
    }
}
