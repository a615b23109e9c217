use serde::{Deserialize, Serialize};

use super::types::{BoundingBox, TooltipPosition, TooltipSize, Viewport};

/// Minimum distance kept between the tooltip and any viewport edge.
pub const VIEWPORT_EDGE_MARGIN_PX: f64 = 10.0;

/// Side of the target element the tooltip should be placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredSide {
    Top,
    Bottom,
    Left,
    Right,
    /// Anchors the tooltip under the target's left edge without centering.
    #[default]
    Unset,
}

/// Computes the clamped tooltip position for `target`.
///
/// Placement is resolved first, clamping is applied last. Whenever the
/// viewport is at least `tooltip + 2 * VIEWPORT_EDGE_MARGIN_PX` on an axis the
/// result stays inside `[margin, viewport - tooltip - margin]` on that axis;
/// smaller viewports may produce negative coordinates.
#[must_use]
pub fn compute_position(
    target: BoundingBox,
    side: PreferredSide,
    tooltip: TooltipSize,
    offset: f64,
    viewport: Viewport,
) -> TooltipPosition {
    let (top, left) = match side {
        PreferredSide::Bottom => (
            target.bottom() + offset,
            target.center_x() - tooltip.width / 2.0,
        ),
        PreferredSide::Top => (
            target.top - tooltip.height - offset,
            target.center_x() - tooltip.width / 2.0,
        ),
        PreferredSide::Left => (
            target.center_y() - tooltip.height / 2.0,
            target.left - tooltip.width - offset,
        ),
        PreferredSide::Right => (
            target.center_y() - tooltip.height / 2.0,
            target.right() + offset,
        ),
        PreferredSide::Unset => (target.bottom() + offset, target.left),
    };

    clamp_to_viewport(TooltipPosition::new(top, left), tooltip, viewport)
}

/// Pulls `position` back inside the viewport minus the edge margin.
///
/// The lower bound wins over the upper bound, matching `max(min(..))`.
#[must_use]
pub fn clamp_to_viewport(
    position: TooltipPosition,
    tooltip: TooltipSize,
    viewport: Viewport,
) -> TooltipPosition {
    let max_top = f64::from(viewport.height) - tooltip.height - VIEWPORT_EDGE_MARGIN_PX;
    let max_left = f64::from(viewport.width) - tooltip.width - VIEWPORT_EDGE_MARGIN_PX;

    TooltipPosition {
        top: VIEWPORT_EDGE_MARGIN_PX.max(position.top.min(max_top)),
        left: VIEWPORT_EDGE_MARGIN_PX.max(position.left.min(max_left)),
    }
}

/// Highlight rectangle drawn around the target.
#[must_use]
pub fn spotlight_rect(target: BoundingBox, padding: f64) -> BoundingBox {
    target.inflate(padding)
}

#[cfg(test)]
mod tests {
    use super::{PreferredSide, compute_position, spotlight_rect};
    use crate::core::{BoundingBox, TooltipPosition, TooltipSize, Viewport};

    const TOOLTIP: TooltipSize = TooltipSize::new(100.0, 50.0);

    #[test]
    fn left_side_centers_vertically() {
        let target = BoundingBox::new(200.0, 100.0, 50.0, 50.0);
        let pos = compute_position(
            target,
            PreferredSide::Left,
            TOOLTIP,
            10.0,
            Viewport::new(1024, 768),
        );
        assert_eq!(pos, TooltipPosition::new(100.0, 90.0));
    }

    #[test]
    fn right_side_starts_after_target_edge() {
        let target = BoundingBox::new(200.0, 100.0, 50.0, 50.0);
        let pos = compute_position(
            target,
            PreferredSide::Right,
            TOOLTIP,
            10.0,
            Viewport::new(1024, 768),
        );
        assert_eq!(pos, TooltipPosition::new(100.0, 260.0));
    }

    #[test]
    fn unset_side_anchors_bottom_left_without_centering() {
        let target = BoundingBox::new(300.0, 100.0, 80.0, 40.0);
        let pos = compute_position(
            target,
            PreferredSide::Unset,
            TOOLTIP,
            12.0,
            Viewport::new(1024, 768),
        );
        assert_eq!(pos, TooltipPosition::new(152.0, 300.0));
    }

    #[test]
    fn degenerate_viewport_prefers_lower_bound() {
        let target = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        let pos = compute_position(
            target,
            PreferredSide::Bottom,
            TooltipSize::FALLBACK,
            12.0,
            Viewport::new(200, 100),
        );
        assert_eq!(pos, TooltipPosition::new(10.0, 10.0));
    }

    #[test]
    fn spotlight_inflates_every_side() {
        let target = BoundingBox::new(20.0, 30.0, 100.0, 40.0);
        let spot = spotlight_rect(target, 4.0);
        assert_eq!(spot, BoundingBox::new(16.0, 26.0, 108.0, 48.0));
        assert_eq!(spot.right(), target.right() + 4.0);
        assert_eq!(spot.bottom(), target.bottom() + 4.0);
    }

    #[test]
    fn side_deserializes_lowercase_names() {
        let side: PreferredSide = serde_json::from_str("\"left\"").expect("side");
        assert_eq!(side, PreferredSide::Left);
    }
}
