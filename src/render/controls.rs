use serde::{Deserialize, Serialize};

use crate::cursor::TourCommand;
use crate::error::TourResult;

use super::RectPrimitive;

/// Buttons rendered inside the tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TourControl {
    Back,
    Next,
    Finish,
    Close,
}

impl TourControl {
    /// Cursor command issued when the control is activated.
    #[must_use]
    pub const fn command(self) -> TourCommand {
        match self {
            Self::Back => TourCommand::Prev,
            Self::Next => TourCommand::Next,
            Self::Finish | Self::Close => TourCommand::End,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Back => "Back",
            Self::Next => "Next",
            Self::Finish => "Finish",
            Self::Close => "Close",
        }
    }
}

/// Placed control with its hit area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPrimitive {
    pub control: TourControl,
    pub label: String,
    pub rect: RectPrimitive,
}

impl ControlPrimitive {
    #[must_use]
    pub fn new(control: TourControl, rect: RectPrimitive) -> Self {
        Self {
            control,
            label: control.label().to_owned(),
            rect,
        }
    }

    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.rect.x
            && x <= self.rect.x + self.rect.width
            && y >= self.rect.y
            && y <= self.rect.y + self.rect.height
    }

    pub fn validate(&self) -> TourResult<()> {
        self.rect.validate()
    }
}
