use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::core::{BoundingBox, TooltipSize, VIEWPORT_EDGE_MARGIN_PX, Viewport, compute_position};
use crate::cursor::{CursorChange, CursorHandle, TourCommand};
use crate::host::{ChangeCallback, FrameId, TimerId, TourHost};
use crate::observe::{self, Subscription};
use crate::steps::TourSteps;

use super::{EngineState, TourEngineConfig};

/// A scheduled one-shot host task plus the ticket that must still be current
/// when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTask<T> {
    id: T,
    ticket: u64,
}

/// Inputs of the last published placement.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LayoutKey {
    rect: BoundingBox,
    viewport: Viewport,
    tooltip: TooltipSize,
}

/// Observers and caches that live exactly as long as one active step.
struct StepSession<H: TourHost> {
    index: usize,
    generation: u64,
    root: Option<H::Element>,
    target: Option<H::Element>,
    rig: Option<Subscription<H>>,
    _window: Subscription<H>,
    _structure: Subscription<H>,
    last_layout: Option<LayoutKey>,
    focus_pending: bool,
}

struct EngineRuntime<H: TourHost> {
    generation: u64,
    next_ticket: u64,
    session: Option<StepSession<H>>,
    pending_frame: Option<PendingTask<FrameId>>,
    pending_focus: Option<PendingTask<TimerId>>,
    disposed: bool,
}

impl<H: TourHost> EngineRuntime<H> {
    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn session_generation(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.generation)
    }
}

struct Published {
    state: EngineState,
    revision: u64,
}

/// Engine internals shared with host callbacks through weak references.
///
/// Host callbacks only ever hold a `Weak` to this value, so once the owning
/// `TourEngine` is gone no callback can reach it.
pub(super) struct EngineShared<H: TourHost> {
    this: Weak<EngineShared<H>>,
    host: Rc<H>,
    cursor: CursorHandle,
    steps: TourSteps,
    config: TourEngineConfig,
    runtime: RefCell<EngineRuntime<H>>,
    published: RefCell<Published>,
}

impl<H: TourHost + 'static> EngineShared<H> {
    pub(super) fn new(
        host: Rc<H>,
        cursor: CursorHandle,
        steps: TourSteps,
        config: TourEngineConfig,
    ) -> Rc<Self> {
        let total_steps = steps.len();
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            host,
            cursor,
            steps,
            config,
            runtime: RefCell::new(EngineRuntime {
                generation: 0,
                next_ticket: 0,
                session: None,
                pending_frame: None,
                pending_focus: None,
                disposed: false,
            }),
            published: RefCell::new(Published {
                state: EngineState::hidden(total_steps),
                revision: 0,
            }),
        })
    }

    pub(super) fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub(super) fn cursor(&self) -> &CursorHandle {
        &self.cursor
    }

    pub(super) fn steps(&self) -> &TourSteps {
        &self.steps
    }

    pub(super) fn config(&self) -> &TourEngineConfig {
        &self.config
    }

    pub(super) fn state(&self) -> EngineState {
        self.published.borrow().state.clone()
    }

    pub(super) fn revision(&self) -> u64 {
        self.published.borrow().revision
    }

    pub(super) fn is_disposed(&self) -> bool {
        self.runtime.borrow().disposed
    }

    pub(super) fn has_pending_recompute(&self) -> bool {
        self.runtime.borrow().pending_frame.is_some()
    }

    pub(super) fn has_pending_focus(&self) -> bool {
        self.runtime.borrow().pending_focus.is_some()
    }

    pub(super) fn has_session(&self) -> bool {
        self.runtime.borrow().session.is_some()
    }

    pub(super) fn cursor_listener(&self) -> Rc<dyn Fn(CursorChange)> {
        let engine = self.this.clone();
        Rc::new(move |change: CursorChange| {
            if let Some(engine) = engine.upgrade() {
                engine.sync_with_cursor(change.command == TourCommand::Start);
            }
        })
    }

    /// Reconciles the step session with the cursor.
    ///
    /// `restart` rebuilds the session even when the index did not move.
    pub(super) fn sync_with_cursor(&self, restart: bool) {
        if self.is_disposed() {
            return;
        }

        let cursor = self.cursor.snapshot();
        let Some(index) = cursor.active_index() else {
            if self.has_session() {
                debug!("tour inactive, releasing step");
            }
            self.teardown_session();
            self.publish(EngineState::hidden(self.steps.len()));
            return;
        };

        if index >= self.steps.len() {
            debug!(
                index,
                total_steps = self.steps.len(),
                "cursor past last step, ending tour"
            );
            self.teardown_session();
            self.publish(EngineState::hidden(self.steps.len()));
            self.cursor.send(TourCommand::End);
            return;
        }

        let same_step = self
            .runtime
            .borrow()
            .session
            .as_ref()
            .is_some_and(|session| session.index == index);
        if same_step && !restart {
            return;
        }

        self.begin_session(index);
    }

    fn begin_session(&self, index: usize) {
        self.teardown_session();

        let step = &self.steps[index];
        let generation = {
            let mut runtime = self.runtime.borrow_mut();
            runtime.generation += 1;
            runtime.generation
        };

        let root = self
            .config
            .root_selector
            .as_deref()
            .and_then(|selector| self.host.find_one(selector));
        let window = observe::attach_window(&self.host, self.layout_callback(generation));
        let structure = observe::watch_structure(
            &self.host,
            root.as_ref(),
            self.structure_callback(generation),
        );
        let target = self.host.find_one(&step.selector);
        let rig = target.as_ref().map(|target| {
            observe::attach(
                &self.host,
                target,
                self.layout_callback(generation),
                root.as_ref(),
            )
        });

        debug!(
            index,
            selector = %step.selector,
            target_found = target.is_some(),
            "tour step activated"
        );

        self.runtime.borrow_mut().session = Some(StepSession {
            index,
            generation,
            root,
            target,
            rig,
            _window: window,
            _structure: structure,
            last_layout: None,
            focus_pending: true,
        });

        self.publish(EngineState::awaiting_target(
            step.clone(),
            index,
            self.steps.len(),
        ));
        self.schedule_recompute();
    }

    /// Cancels pending work and releases every observer of the current step.
    pub(super) fn teardown_session(&self) {
        let (session, frame, focus) = {
            let mut runtime = self.runtime.borrow_mut();
            (
                runtime.session.take(),
                runtime.pending_frame.take(),
                runtime.pending_focus.take(),
            )
        };
        if let Some(frame) = frame {
            self.host.cancel_frame(frame.id);
        }
        if let Some(focus) = focus {
            self.host.clear_timeout(focus.id);
        }
        if let Some(session) = session {
            trace!(index = session.index, "step session released");
            drop(session);
        }
    }

    pub(super) fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.teardown_session();
        self.runtime.borrow_mut().disposed = true;
        debug!("tour engine disposed");
    }

    fn layout_callback(&self, generation: u64) -> ChangeCallback {
        let engine = self.this.clone();
        Rc::new(move || {
            if let Some(engine) = engine.upgrade() {
                if engine.is_current(generation) {
                    engine.schedule_recompute();
                }
            }
        })
    }

    fn structure_callback(&self, generation: u64) -> ChangeCallback {
        let engine = self.this.clone();
        Rc::new(move || {
            if let Some(engine) = engine.upgrade() {
                if engine.is_current(generation) {
                    engine.resolve_target();
                    engine.schedule_recompute();
                }
            }
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        let runtime = self.runtime.borrow();
        !runtime.disposed && runtime.session_generation() == Some(generation)
    }

    /// Queues one recompute for the next animation frame, superseding any
    /// recompute that is still pending.
    pub(super) fn schedule_recompute(&self) {
        let (ticket, superseded) = {
            let mut runtime = self.runtime.borrow_mut();
            if runtime.disposed || runtime.session.is_none() {
                return;
            }
            let ticket = runtime.issue_ticket();
            (ticket, runtime.pending_frame.take())
        };
        if let Some(frame) = superseded {
            trace!(ticket = frame.ticket, "superseded pending recompute");
            self.host.cancel_frame(frame.id);
        }

        let engine = self.this.clone();
        let id = self.host.request_frame(Box::new(move || {
            if let Some(engine) = engine.upgrade() {
                engine.on_frame(ticket);
            }
        }));
        self.runtime.borrow_mut().pending_frame = Some(PendingTask { id, ticket });
    }

    fn on_frame(&self, ticket: u64) {
        {
            let mut runtime = self.runtime.borrow_mut();
            if runtime.disposed || runtime.pending_frame.map(|frame| frame.ticket) != Some(ticket)
            {
                trace!(ticket, "dropping stale recompute");
                return;
            }
            runtime.pending_frame = None;
        }
        self.recompute();
    }

    /// Re-queries the current step's target and moves the observation rig to
    /// it when the element changed.
    fn resolve_target(&self) -> Option<H::Element> {
        let (index, generation, root, current) = {
            let runtime = self.runtime.borrow();
            let session = runtime.session.as_ref()?;
            (
                session.index,
                session.generation,
                session.root.clone(),
                session.target.clone(),
            )
        };

        let found = self.host.find_one(&self.steps[index].selector);
        if found == current {
            return found;
        }

        let rig = found.as_ref().map(|target| {
            observe::attach(
                &self.host,
                target,
                self.layout_callback(generation),
                root.as_ref(),
            )
        });
        let previous_rig = {
            let mut runtime = self.runtime.borrow_mut();
            let session = runtime.session.as_mut()?;
            session.target = found.clone();
            session.last_layout = None;
            std::mem::replace(&mut session.rig, rig)
        };
        drop(previous_rig);

        debug!(
            index,
            target_found = found.is_some(),
            "tour target re-resolved"
        );
        found
    }

    fn recompute(&self) {
        let Some(index) = self
            .runtime
            .borrow()
            .session
            .as_ref()
            .map(|session| session.index)
        else {
            return;
        };
        if self.cursor.snapshot().active_index() != Some(index) {
            self.sync_with_cursor(false);
            return;
        }

        let step = &self.steps[index];
        let Some(target) = self.resolve_target() else {
            trace!(index, selector = %step.selector, "tour target missing");
            self.publish(EngineState::awaiting_target(
                step.clone(),
                index,
                self.steps.len(),
            ));
            return;
        };

        let key = LayoutKey {
            rect: self.host.bounding_box(&target),
            viewport: self.host.viewport(),
            tooltip: self
                .host
                .tooltip_size()
                .unwrap_or(self.config.tooltip_size),
        };
        let unchanged = self
            .runtime
            .borrow()
            .session
            .as_ref()
            .is_some_and(|session| session.last_layout == Some(key));
        if unchanged && self.published.borrow().state.visible {
            trace!(index, "tour layout unchanged, skipping publish");
            return;
        }

        if !key.rect.is_finite() {
            warn!(index, rect = ?key.rect, "host reported a non-finite target box");
            self.publish(EngineState::awaiting_target(
                step.clone(),
                index,
                self.steps.len(),
            ));
            return;
        }

        if !key.viewport.is_valid() || !key.viewport.fits(key.tooltip, VIEWPORT_EDGE_MARGIN_PX) {
            warn!(
                viewport_width = key.viewport.width,
                viewport_height = key.viewport.height,
                tooltip_width = key.tooltip.width,
                tooltip_height = key.tooltip.height,
                "viewport smaller than tooltip, placement cannot be fully clamped"
            );
        }

        let tooltip_position = compute_position(
            key.rect,
            step.preferred_side,
            key.tooltip,
            self.config.tooltip_offset_px,
            key.viewport,
        );

        let focus = {
            let mut runtime = self.runtime.borrow_mut();
            let Some(session) = runtime.session.as_mut() else {
                return;
            };
            session.last_layout = Some(key);
            std::mem::take(&mut session.focus_pending)
        };

        self.publish(EngineState {
            visible: true,
            current_step: Some(step.clone()),
            current_index: Some(index),
            total_steps: self.steps.len(),
            tooltip_position,
            tooltip_size: key.tooltip,
            target_rect: Some(key.rect),
            is_last_step: self.steps.is_last(index),
        });

        if focus {
            self.schedule_focus();
        }
    }

    fn schedule_focus(&self) {
        let (ticket, previous) = {
            let mut runtime = self.runtime.borrow_mut();
            if runtime.disposed {
                return;
            }
            let ticket = runtime.issue_ticket();
            (ticket, runtime.pending_focus.take())
        };
        if let Some(previous) = previous {
            self.host.clear_timeout(previous.id);
        }

        let engine = self.this.clone();
        let id = self.host.set_timeout(
            self.config.focus_delay(),
            Box::new(move || {
                if let Some(engine) = engine.upgrade() {
                    engine.on_focus_timer(ticket);
                }
            }),
        );
        self.runtime.borrow_mut().pending_focus = Some(PendingTask { id, ticket });
    }

    fn on_focus_timer(&self, ticket: u64) {
        {
            let mut runtime = self.runtime.borrow_mut();
            if runtime.disposed || runtime.pending_focus.map(|focus| focus.ticket) != Some(ticket)
            {
                return;
            }
            runtime.pending_focus = None;
        }
        trace!("moving focus to tooltip");
        self.host.focus_tooltip();
    }

    /// Replaces the published state; returns `false` when nothing changed.
    fn publish(&self, state: EngineState) -> bool {
        let mut published = self.published.borrow_mut();
        if published.state == state {
            return false;
        }
        published.state = state;
        published.revision += 1;
        true
    }
}
