pub mod geometry;
pub mod types;

pub use geometry::{
    PreferredSide, VIEWPORT_EDGE_MARGIN_PX, clamp_to_viewport, compute_position, spotlight_rect,
};
pub use types::{BoundingBox, TooltipPosition, TooltipSize, Viewport};
