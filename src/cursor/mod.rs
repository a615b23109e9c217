//! Step cursor state machine and its shared command handle.
//!
//! `TourCursor` is the plain two-state machine. `CursorHandle` wraps it for
//! sharing between whoever issues navigation commands and the engine that
//! reacts to them: the only write path is [`CursorHandle::send`], and every
//! effective change is pushed synchronously to subscribers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Navigation command accepted by the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "index", rename_all = "snake_case")]
pub enum TourCommand {
    Start,
    Next,
    Prev,
    Jump(usize),
    End,
}

/// Current step index plus active flag.
///
/// While inactive `current_index` carries no rendering meaning. While active
/// it may point past the last step; the engine turns that into an end of tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TourCursor {
    current_index: usize,
    active: bool,
}

impl TourCursor {
    #[must_use]
    pub fn current_index(self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        self.active
    }

    /// Index of the current step, `None` while inactive.
    #[must_use]
    pub fn active_index(self) -> Option<usize> {
        self.active.then_some(self.current_index)
    }

    pub fn start(&mut self) {
        self.active = true;
        self.current_index = 0;
    }

    pub fn next(&mut self) {
        if self.active {
            self.current_index = self.current_index.saturating_add(1);
        }
    }

    pub fn prev(&mut self) {
        if self.active {
            self.current_index = self.current_index.saturating_sub(1);
        }
    }

    pub fn jump(&mut self, index: usize) {
        if self.active {
            self.current_index = index;
        }
    }

    pub fn end(&mut self) {
        self.active = false;
        self.current_index = 0;
    }

    pub fn apply(&mut self, command: TourCommand) {
        match command {
            TourCommand::Start => self.start(),
            TourCommand::Next => self.next(),
            TourCommand::Prev => self.prev(),
            TourCommand::Jump(index) => self.jump(index),
            TourCommand::End => self.end(),
        }
    }
}

/// Change notification delivered to cursor subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorChange {
    pub command: TourCommand,
    pub previous: TourCursor,
    pub current: TourCursor,
}

pub type CursorListener = Rc<dyn Fn(CursorChange)>;

struct CursorShared {
    state: Cell<TourCursor>,
    revision: Cell<u64>,
    listeners: RefCell<IndexMap<u64, CursorListener>>,
    next_listener_id: Cell<u64>,
    /// Changes waiting for delivery, oldest first.
    outbox: RefCell<VecDeque<CursorChange>>,
    delivering: Cell<bool>,
}

/// Shared handle to one tour cursor.
#[derive(Clone)]
pub struct CursorHandle {
    shared: Rc<CursorShared>,
}

impl Default for CursorHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CursorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorHandle")
            .field("state", &self.shared.state.get())
            .field("revision", &self.shared.revision.get())
            .field("listeners", &self.shared.listeners.borrow().len())
            .finish()
    }
}

impl CursorHandle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(CursorShared {
                state: Cell::new(TourCursor::default()),
                revision: Cell::new(0),
                listeners: RefCell::new(IndexMap::new()),
                next_listener_id: Cell::new(0),
                outbox: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> TourCursor {
        self.shared.state.get()
    }

    /// Number of effective changes applied so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.shared.revision.get()
    }

    /// Applies `command` and notifies subscribers.
    ///
    /// Commands that leave the cursor untouched are dropped silently, except
    /// `Start`, which always restarts the tour. Returns whether the change was
    /// queued for subscribers.
    ///
    /// A command sent from inside a listener takes effect immediately but is
    /// delivered only after every listener has seen the change being
    /// delivered, so all subscribers observe changes in application order.
    pub fn send(&self, command: TourCommand) -> bool {
        let previous = self.shared.state.get();
        let mut current = previous;
        current.apply(command);

        if current == previous && command != TourCommand::Start {
            trace!(?command, "cursor command ignored");
            return false;
        }

        self.shared.state.set(current);
        self.shared.revision.set(self.shared.revision.get() + 1);
        trace!(?command, ?previous, ?current, "cursor changed");

        self.shared.outbox.borrow_mut().push_back(CursorChange {
            command,
            previous,
            current,
        });
        if self.shared.delivering.replace(true) {
            return true;
        }

        loop {
            let Some(change) = self.shared.outbox.borrow_mut().pop_front() else {
                break;
            };
            let listeners: Vec<CursorListener> =
                self.shared.listeners.borrow().values().cloned().collect();
            for listener in listeners {
                listener(change);
            }
        }
        self.shared.delivering.set(false);
        true
    }

    /// Registers `listener`; it stays registered while the returned handle lives.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: CursorListener) -> CursorSubscription {
        let id = self.shared.next_listener_id.get();
        self.shared.next_listener_id.set(id + 1);
        self.shared.listeners.borrow_mut().insert(id, listener);
        CursorSubscription {
            shared: Rc::downgrade(&self.shared),
            id,
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.listeners.borrow().len()
    }

    pub fn start(&self) -> bool {
        self.send(TourCommand::Start)
    }

    pub fn next(&self) -> bool {
        self.send(TourCommand::Next)
    }

    pub fn prev(&self) -> bool {
        self.send(TourCommand::Prev)
    }

    pub fn jump(&self, index: usize) -> bool {
        self.send(TourCommand::Jump(index))
    }

    pub fn end(&self) -> bool {
        self.send(TourCommand::End)
    }
}

/// Keeps a cursor listener registered until dropped.
pub struct CursorSubscription {
    shared: Weak<CursorShared>,
    id: u64,
}

impl CursorSubscription {
    pub fn unsubscribe(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.listeners.borrow_mut().shift_remove(&self.id);
        }
        self.shared = Weak::new();
    }
}

impl Drop for CursorSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
