use serde::{Deserialize, Serialize};

use crate::error::{TourError, TourResult};

/// Host viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns `true` when a tooltip of `size` fits with the edge margin on both axes.
    #[must_use]
    pub fn fits(self, size: TooltipSize, edge_margin: f64) -> bool {
        f64::from(self.width) >= size.width + 2.0 * edge_margin
            && f64::from(self.height) >= size.height + 2.0 * edge_margin
    }
}

/// Element position and size in viewport coordinates.
///
/// Equality is exact field equality; the engine relies on it to skip
/// redundant state publications.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn center_x(self) -> f64 {
        self.left + self.width / 2.0
    }

    #[must_use]
    pub fn center_y(self) -> f64 {
        self.top + self.height / 2.0
    }

    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..self
        }
    }

    /// Grows the box by `margin` on every side.
    #[must_use]
    pub fn inflate(self, margin: f64) -> Self {
        Self {
            top: self.top - margin,
            left: self.left - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.top.is_finite()
            && self.left.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

/// Rendered tooltip dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TooltipSize {
    pub width: f64,
    pub height: f64,
}

impl TooltipSize {
    pub const FALLBACK: Self = Self {
        width: 320.0,
        height: 180.0,
    };

    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn validate(self) -> TourResult<Self> {
        if !self.width.is_finite()
            || !self.height.is_finite()
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(TourError::InvalidTooltipSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

impl Default for TooltipSize {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Top-left corner of the tooltip box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TooltipPosition {
    pub top: f64,
    pub left: f64,
}

impl TooltipPosition {
    #[must_use]
    pub const fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }
}
