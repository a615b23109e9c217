//! Capability boundary between the tour engine and the live document.
//!
//! Every capability takes `&self`; implementations use interior mutability and
//! are shared behind an `Rc`. Callbacks handed to a capability must be
//! delivered later, never from inside the call that registered them.

mod headless;

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{BoundingBox, TooltipSize, Viewport};

pub use headless::{ElementId, HeadlessHost, HeadlessStats};

/// Handle returned by observer registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

/// Handle of a requested animation frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

/// Handle of a one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// Repeatable notification callback.
pub type ChangeCallback = Rc<dyn Fn()>;

/// One-shot task callback.
pub type TaskCallback = Box<dyn FnOnce()>;

/// Resolves selectors to elements and watches the document structure.
pub trait ElementLookup {
    type Element: Clone + PartialEq + fmt::Debug;

    /// Returns the first element matching `selector`, if any.
    fn find_one(&self, selector: &str) -> Option<Self::Element>;

    /// Current box of `element` in viewport coordinates.
    fn bounding_box(&self, element: &Self::Element) -> BoundingBox;

    /// Watches child-list changes in the subtree of `root` (whole document when `None`).
    fn observe_structural_changes(
        &self,
        root: Option<&Self::Element>,
        callback: ChangeCallback,
    ) -> ObserverId;

    /// Detaches any observer registered through this host. Unknown ids are ignored.
    fn disconnect(&self, observer: ObserverId);
}

/// Size, intersection and window-level layout notifications.
pub trait LayoutObservers: ElementLookup {
    fn observe_resize(&self, elements: &[Self::Element], callback: ChangeCallback) -> ObserverId;

    fn observe_intersection(
        &self,
        element: &Self::Element,
        thresholds: &[f64],
        callback: ChangeCallback,
    ) -> ObserverId;

    /// Window resize plus scroll of the window or any nested scroll container.
    fn observe_window(&self, callback: ChangeCallback) -> ObserverId;
}

pub trait FrameScheduler {
    fn request_frame(&self, callback: TaskCallback) -> FrameId;
    fn cancel_frame(&self, frame: FrameId);
}

pub trait TimerScheduler {
    fn set_timeout(&self, delay: Duration, callback: TaskCallback) -> TimerId;
    fn clear_timeout(&self, timer: TimerId);
}

pub trait ViewportMetrics {
    fn viewport(&self) -> Viewport;
}

/// The rendered tooltip container.
pub trait TooltipSurface {
    /// Actual rendered size once the tooltip has been laid out.
    fn tooltip_size(&self) -> Option<TooltipSize>;

    /// Moves keyboard focus to the tooltip container.
    fn focus_tooltip(&self);
}

/// Everything the engine needs from its environment.
pub trait TourHost:
    LayoutObservers + FrameScheduler + TimerScheduler + ViewportMetrics + TooltipSurface
{
}

impl<T> TourHost for T where
    T: LayoutObservers + FrameScheduler + TimerScheduler + ViewportMetrics + TooltipSurface
{
}
