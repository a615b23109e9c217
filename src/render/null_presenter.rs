use crate::error::TourResult;
use crate::render::{TourFrame, TourPresenter};

/// No-op presenter used by tests and headless engine usage.
///
/// It still validates frame content so tests can catch invalid geometry before
/// a real backend is introduced.
#[derive(Debug, Default)]
pub struct NullPresenter {
    pub frames_presented: usize,
    pub last_text_count: usize,
    pub last_control_count: usize,
    pub last_was_empty: bool,
}

impl TourPresenter for NullPresenter {
    fn present(&mut self, frame: &TourFrame) -> TourResult<()> {
        frame.validate()?;
        self.frames_presented += 1;
        self.last_text_count = frame.texts.len();
        self.last_control_count = frame.controls.len();
        self.last_was_empty = frame.is_empty();
        Ok(())
    }
}
