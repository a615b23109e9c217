mod controls;
mod frame;
mod null_presenter;
mod primitives;
mod style;

pub use controls::{ControlPrimitive, TourControl};
pub use frame::TourFrame;
pub use null_presenter::NullPresenter;
pub use primitives::{Color, RectPrimitive, Stroke, TextHAlign, TextPrimitive};
pub use style::TourStyle;

use crate::error::TourResult;

/// Contract implemented by any presentation backend.
///
/// Backends receive a fully laid out `TourFrame` so drawing code stays
/// isolated from tour state and host observation.
pub trait TourPresenter {
    fn present(&mut self, frame: &TourFrame) -> TourResult<()>;
}
