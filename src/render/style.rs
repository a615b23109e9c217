use serde::{Deserialize, Serialize};

use crate::error::{TourError, TourResult};

use super::Color;

/// Visual tuning for the tour overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TourStyle {
    pub overlay_color: Color,
    pub spotlight_border_color: Color,
    pub spotlight_border_width_px: f64,
    pub spotlight_corner_radius_px: f64,
    pub tooltip_background: Color,
    pub tooltip_corner_radius_px: f64,
    pub tooltip_padding_px: f64,
    pub title_color: Color,
    pub body_color: Color,
    pub caption_color: Color,
    pub title_font_size_px: f64,
    pub body_font_size_px: f64,
    pub caption_font_size_px: f64,
    pub button_height_px: f64,
    pub button_gap_px: f64,
}

impl Default for TourStyle {
    fn default() -> Self {
        Self {
            overlay_color: Color::rgba(0.0, 0.0, 0.0, 0.5),
            spotlight_border_color: Color::rgb(0.098, 0.463, 0.824),
            spotlight_border_width_px: 3.0,
            spotlight_corner_radius_px: 8.0,
            tooltip_background: Color::rgb(1.0, 1.0, 1.0),
            tooltip_corner_radius_px: 8.0,
            tooltip_padding_px: 20.0,
            title_color: Color::rgba(0.0, 0.0, 0.0, 0.87),
            body_color: Color::rgba(0.0, 0.0, 0.0, 0.6),
            caption_color: Color::rgba(0.0, 0.0, 0.0, 0.6),
            title_font_size_px: 16.0,
            body_font_size_px: 14.0,
            caption_font_size_px: 12.0,
            button_height_px: 30.0,
            button_gap_px: 8.0,
        }
    }
}

impl TourStyle {
    pub fn validate(self) -> TourResult<()> {
        for color in [
            self.overlay_color,
            self.spotlight_border_color,
            self.tooltip_background,
            self.title_color,
            self.body_color,
            self.caption_color,
        ] {
            color.validate()?;
        }
        for (value, name) in [
            (self.spotlight_border_width_px, "spotlight_border_width_px"),
            (self.title_font_size_px, "title_font_size_px"),
            (self.body_font_size_px, "body_font_size_px"),
            (self.caption_font_size_px, "caption_font_size_px"),
            (self.button_height_px, "button_height_px"),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TourError::InvalidConfig(format!(
                    "style `{name}` must be finite and > 0"
                )));
            }
        }
        for (value, name) in [
            (self.spotlight_corner_radius_px, "spotlight_corner_radius_px"),
            (self.tooltip_corner_radius_px, "tooltip_corner_radius_px"),
            (self.tooltip_padding_px, "tooltip_padding_px"),
            (self.button_gap_px, "button_gap_px"),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TourError::InvalidConfig(format!(
                    "style `{name}` must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}
