mod config;
mod runtime;
mod state;

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::cursor::{CursorHandle, CursorSubscription, TourCommand};
use crate::error::TourResult;
use crate::host::TourHost;
use crate::render::{TourFrame, TourPresenter, TourStyle};
use crate::steps::TourSteps;

pub use config::TourEngineConfig;
pub use state::EngineState;

use runtime::EngineShared;

/// Main orchestration facade consumed by host applications.
///
/// `TourEngine` follows a shared [`CursorHandle`], resolves the current
/// step's target through the host, and keeps [`EngineState`] in sync with
/// layout signals. Every signal funnels into one recompute per animation
/// frame. Dropping the engine (or calling [`dispose`](Self::dispose)) releases
/// all host observers, the pending frame and the pending focus timer.
pub struct TourEngine<H: TourHost + 'static> {
    shared: Rc<EngineShared<H>>,
    cursor_subscription: Option<CursorSubscription>,
    style: TourStyle,
    last_presented_revision: Option<u64>,
}

impl<H: TourHost + 'static> TourEngine<H> {
    /// Creates an engine bound to `cursor`.
    ///
    /// If the cursor is already active the current step is picked up
    /// immediately.
    pub fn new(
        host: Rc<H>,
        cursor: CursorHandle,
        steps: TourSteps,
        config: TourEngineConfig,
    ) -> TourResult<Self> {
        config.validate()?;
        debug!(total_steps = steps.len(), "creating tour engine");

        let shared = EngineShared::new(host, cursor.clone(), steps, config);
        let cursor_subscription = cursor.subscribe(shared.cursor_listener());
        shared.sync_with_cursor(false);

        Ok(Self {
            shared,
            cursor_subscription: Some(cursor_subscription),
            style: TourStyle::default(),
            last_presented_revision: None,
        })
    }

    /// Latest published state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// Incremented on every effective state publication.
    #[must_use]
    pub fn state_revision(&self) -> u64 {
        self.shared.revision()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.shared.state().visible
    }

    #[must_use]
    pub fn steps(&self) -> &TourSteps {
        self.shared.steps()
    }

    #[must_use]
    pub fn config(&self) -> &TourEngineConfig {
        self.shared.config()
    }

    #[must_use]
    pub fn cursor(&self) -> &CursorHandle {
        self.shared.cursor()
    }

    #[must_use]
    pub fn host(&self) -> &Rc<H> {
        self.shared.host()
    }

    /// Sends `command` through the shared cursor.
    pub fn dispatch(&self, command: TourCommand) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.shared.cursor().send(command)
    }

    /// Schedules a recompute for a layout change the host observers cannot see.
    pub fn request_recompute(&self) {
        self.shared.schedule_recompute();
    }

    #[must_use]
    pub fn has_pending_recompute(&self) -> bool {
        self.shared.has_pending_recompute()
    }

    #[must_use]
    pub fn has_pending_focus(&self) -> bool {
        self.shared.has_pending_focus()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Releases every observer and pending task; later signals are ignored.
    pub fn dispose(&mut self) {
        self.cursor_subscription = None;
        self.shared.dispose();
    }

    #[must_use]
    pub fn style(&self) -> &TourStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: TourStyle) -> TourResult<()> {
        style.validate()?;
        self.style = style;
        self.last_presented_revision = None;
        Ok(())
    }

    /// Builds the overlay frame for the current state.
    #[must_use]
    pub fn build_frame(&self) -> TourFrame {
        TourFrame::build(
            &self.shared.state(),
            self.shared.host().viewport(),
            self.shared.config(),
            &self.style,
        )
    }

    pub fn present<P: TourPresenter>(&mut self, presenter: &mut P) -> TourResult<()> {
        let frame = self.build_frame();
        presenter.present(&frame)?;
        self.last_presented_revision = Some(self.state_revision());
        Ok(())
    }

    /// Presents only when the state changed since the last presentation.
    pub fn present_if_changed<P: TourPresenter>(&mut self, presenter: &mut P) -> TourResult<bool> {
        if self.last_presented_revision == Some(self.state_revision()) {
            return Ok(false);
        }
        self.present(presenter)?;
        Ok(true)
    }
}

impl<H: TourHost + 'static> Drop for TourEngine<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<H: TourHost + 'static> fmt::Debug for TourEngine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TourEngine")
            .field("state", &self.shared.state())
            .field("revision", &self.shared.revision())
            .field("disposed", &self.shared.is_disposed())
            .finish()
    }
}
