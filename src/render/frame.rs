use serde::{Deserialize, Serialize};

use crate::core::{Viewport, spotlight_rect};
use crate::engine::{EngineState, TourEngineConfig};
use crate::error::TourResult;

use super::{
    ControlPrimitive, RectPrimitive, TextHAlign, TextPrimitive, TourControl, TourStyle,
};

const CLOSE_BUTTON_SIZE_PX: f64 = 24.0;
const NEXT_BUTTON_WIDTH_PX: f64 = 72.0;
const BACK_BUTTON_WIDTH_PX: f64 = 64.0;
const TITLE_BODY_GAP_PX: f64 = 8.0;

/// Backend-agnostic scene for one tour draw pass.
///
/// Drawn back to front: overlay, spotlight, tooltip box, texts, controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourFrame {
    pub viewport: Viewport,
    pub overlay: Option<RectPrimitive>,
    pub spotlight: Option<RectPrimitive>,
    pub tooltip: Option<RectPrimitive>,
    pub texts: Vec<TextPrimitive>,
    pub controls: Vec<ControlPrimitive>,
}

impl TourFrame {
    #[must_use]
    pub fn empty(viewport: Viewport) -> Self {
        Self {
            viewport,
            overlay: None,
            spotlight: None,
            tooltip: None,
            texts: Vec::new(),
            controls: Vec::new(),
        }
    }

    /// Lays out the overlay for `state`. Hidden states produce an empty frame.
    #[must_use]
    pub fn build(
        state: &EngineState,
        viewport: Viewport,
        config: &TourEngineConfig,
        style: &TourStyle,
    ) -> Self {
        let mut frame = Self::empty(viewport);
        let (Some(step), Some(index), true) = (&state.current_step, state.current_index, state.visible)
        else {
            return frame;
        };

        frame.overlay = Some(
            RectPrimitive::new(0.0, 0.0, f64::from(viewport.width), f64::from(viewport.height))
                .with_fill(style.overlay_color),
        );

        frame.spotlight = state.target_rect.map(|target| {
            let spot = spotlight_rect(target, config.spotlight_padding_px);
            RectPrimitive::new(spot.left, spot.top, spot.width, spot.height)
                .with_stroke(style.spotlight_border_width_px, style.spotlight_border_color)
                .with_corner_radius(style.spotlight_corner_radius_px)
        });

        let size = state.tooltip_size;
        let left = state.tooltip_position.left;
        let top = state.tooltip_position.top;
        let pad = style.tooltip_padding_px;
        frame.tooltip = Some(
            RectPrimitive::new(left, top, size.width, size.height)
                .with_fill(style.tooltip_background)
                .with_corner_radius(style.tooltip_corner_radius_px),
        );

        let title_y = top + pad + style.title_font_size_px;
        frame.texts.push(TextPrimitive::new(
            step.title.clone(),
            left + pad,
            title_y,
            style.title_font_size_px,
            style.title_color,
            TextHAlign::Left,
        ));
        frame.texts.push(TextPrimitive::new(
            step.content.clone(),
            left + pad,
            title_y + TITLE_BODY_GAP_PX + style.body_font_size_px,
            style.body_font_size_px,
            style.body_color,
            TextHAlign::Left,
        ));

        let footer_top = top + size.height - pad - style.button_height_px;
        frame.texts.push(TextPrimitive::new(
            format!("Step {} of {}", index + 1, state.total_steps),
            left + pad,
            footer_top + (style.button_height_px + style.caption_font_size_px) / 2.0,
            style.caption_font_size_px,
            style.caption_color,
            TextHAlign::Left,
        ));

        frame.controls.push(ControlPrimitive::new(
            TourControl::Close,
            RectPrimitive::new(
                left + size.width - pad - CLOSE_BUTTON_SIZE_PX,
                top + pad - CLOSE_BUTTON_SIZE_PX / 4.0,
                CLOSE_BUTTON_SIZE_PX,
                CLOSE_BUTTON_SIZE_PX,
            ),
        ));

        let primary = if state.is_last_step {
            TourControl::Finish
        } else {
            TourControl::Next
        };
        let primary_x = left + size.width - pad - NEXT_BUTTON_WIDTH_PX;
        if state.has_previous() {
            frame.controls.push(ControlPrimitive::new(
                TourControl::Back,
                RectPrimitive::new(
                    primary_x - style.button_gap_px - BACK_BUTTON_WIDTH_PX,
                    footer_top,
                    BACK_BUTTON_WIDTH_PX,
                    style.button_height_px,
                ),
            ));
        }
        frame.controls.push(ControlPrimitive::new(
            primary,
            RectPrimitive::new(
                primary_x,
                footer_top,
                NEXT_BUTTON_WIDTH_PX,
                style.button_height_px,
            ),
        ));

        frame
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overlay.is_none()
            && self.spotlight.is_none()
            && self.tooltip.is_none()
            && self.texts.is_empty()
            && self.controls.is_empty()
    }

    #[must_use]
    pub fn control(&self, control: TourControl) -> Option<&ControlPrimitive> {
        self.controls.iter().find(|placed| placed.control == control)
    }

    /// Topmost control under the pointer.
    #[must_use]
    pub fn hit_test(&self, x: f64, y: f64) -> Option<TourControl> {
        self.controls
            .iter()
            .rev()
            .find(|placed| placed.contains(x, y))
            .map(|placed| placed.control)
    }

    pub fn validate(&self) -> TourResult<()> {
        for rect in [self.overlay, self.spotlight, self.tooltip].into_iter().flatten() {
            rect.validate()?;
        }
        for text in &self.texts {
            text.validate()?;
        }
        for control in &self.controls {
            control.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TourFrame;
    use crate::core::{BoundingBox, TooltipPosition, TooltipSize, Viewport};
    use crate::engine::{EngineState, TourEngineConfig};
    use crate::render::{TourControl, TourStyle};
    use crate::steps::TourStep;

    fn visible_state(index: usize, total: usize) -> EngineState {
        EngineState {
            visible: true,
            current_step: Some(TourStep::new(".card", "Metrics", "Key numbers")),
            current_index: Some(index),
            total_steps: total,
            tooltip_position: TooltipPosition::new(160.0, 75.0),
            tooltip_size: TooltipSize::FALLBACK,
            target_rect: Some(BoundingBox::new(100.0, 100.0, 50.0, 50.0)),
            is_last_step: index + 1 == total,
        }
    }

    #[test]
    fn hidden_state_builds_empty_frame() {
        let frame = TourFrame::build(
            &EngineState::hidden(3),
            Viewport::new(1024, 768),
            &TourEngineConfig::default(),
            &TourStyle::default(),
        );
        assert!(frame.is_empty());
    }

    #[test]
    fn first_step_has_next_but_no_back() {
        let frame = TourFrame::build(
            &visible_state(0, 3),
            Viewport::new(1024, 768),
            &TourEngineConfig::default(),
            &TourStyle::default(),
        );
        assert!(frame.control(TourControl::Next).is_some());
        assert!(frame.control(TourControl::Back).is_none());
        assert!(frame.control(TourControl::Finish).is_none());
        assert!(frame.control(TourControl::Close).is_some());
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn last_step_offers_back_and_finish() {
        let frame = TourFrame::build(
            &visible_state(2, 3),
            Viewport::new(1024, 768),
            &TourEngineConfig::default(),
            &TourStyle::default(),
        );
        assert!(frame.control(TourControl::Back).is_some());
        assert!(frame.control(TourControl::Finish).is_some());
        assert!(frame.control(TourControl::Next).is_none());
        assert!(frame.texts.iter().any(|text| text.text == "Step 3 of 3"));
    }

    #[test]
    fn spotlight_is_target_inflated_by_padding() {
        let frame = TourFrame::build(
            &visible_state(1, 3),
            Viewport::new(1024, 768),
            &TourEngineConfig::default(),
            &TourStyle::default(),
        );
        let spot = frame.spotlight.expect("spotlight");
        assert_eq!((spot.x, spot.y, spot.width, spot.height), (96.0, 96.0, 58.0, 58.0));
    }

    #[test]
    fn hit_test_maps_point_to_control() {
        let frame = TourFrame::build(
            &visible_state(1, 3),
            Viewport::new(1024, 768),
            &TourEngineConfig::default(),
            &TourStyle::default(),
        );
        let next = frame.control(TourControl::Next).expect("next").rect;
        let hit = frame.hit_test(next.x + 1.0, next.y + 1.0);
        assert_eq!(hit, Some(TourControl::Next));
        assert_eq!(frame.hit_test(0.0, 0.0), None);
    }
}
