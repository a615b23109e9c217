//! Observation rig: groups host observers behind one releasable handle.
//!
//! Nothing here throttles; callers coalesce bursts themselves.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use crate::host::{ChangeCallback, ElementLookup, LayoutObservers, ObserverId};

/// Intersection ratios that trigger a change notification.
pub const INTERSECTION_THRESHOLDS: [f64; 3] = [0.0, 0.5, 1.0];

/// Owns a set of host observers until released or dropped.
pub struct Subscription<H: ElementLookup> {
    host: Rc<H>,
    observers: SmallVec<[ObserverId; 2]>,
    released: bool,
}

impl<H: ElementLookup> Subscription<H> {
    fn new(host: &Rc<H>, observers: SmallVec<[ObserverId; 2]>) -> Self {
        Self {
            host: Rc::clone(host),
            observers,
            released: false,
        }
    }

    /// Detaches every observer. Calling it again does nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for observer in self.observers.drain(..) {
            self.host.disconnect(observer);
        }
        trace!("observation subscription released");
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    #[must_use]
    pub fn observers(&self) -> &[ObserverId] {
        &self.observers
    }
}

impl<H: ElementLookup> Drop for Subscription<H> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<H: ElementLookup> fmt::Debug for Subscription<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("observers", &self.observers)
            .field("released", &self.released)
            .finish()
    }
}

/// Watches `target` for size and visibility changes.
///
/// Size changes of `scroll_root` are reported through the same callback.
#[must_use = "dropping the subscription detaches the observers"]
pub fn attach<H: LayoutObservers>(
    host: &Rc<H>,
    target: &H::Element,
    on_change: ChangeCallback,
    scroll_root: Option<&H::Element>,
) -> Subscription<H> {
    let mut resized: SmallVec<[H::Element; 2]> = SmallVec::new();
    resized.push(target.clone());
    if let Some(root) = scroll_root {
        resized.push(root.clone());
    }

    let resize = host.observe_resize(&resized, Rc::clone(&on_change));
    let intersection = host.observe_intersection(target, &INTERSECTION_THRESHOLDS, on_change);
    trace!(?target, ?scroll_root, "observation rig attached");

    let mut observers = SmallVec::new();
    observers.push(resize);
    observers.push(intersection);
    Subscription::new(host, observers)
}

/// Window resize and capturing scroll listeners.
#[must_use = "dropping the subscription detaches the listeners"]
pub fn attach_window<H: LayoutObservers>(host: &Rc<H>, on_change: ChangeCallback) -> Subscription<H> {
    let observer = host.observe_window(on_change);
    let mut observers = SmallVec::new();
    observers.push(observer);
    Subscription::new(host, observers)
}

/// Structural mutation watcher on `root`'s subtree.
#[must_use = "dropping the subscription detaches the watcher"]
pub fn watch_structure<H: ElementLookup>(
    host: &Rc<H>,
    root: Option<&H::Element>,
    on_change: ChangeCallback,
) -> Subscription<H> {
    let observer = host.observe_structural_changes(root, on_change);
    let mut observers = SmallVec::new();
    observers.push(observer);
    Subscription::new(host, observers)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{attach, attach_window, watch_structure};
    use crate::core::{BoundingBox, Viewport};
    use crate::host::HeadlessHost;

    fn counting_callback() -> (Rc<Cell<usize>>, Rc<dyn Fn()>) {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        (count, Rc::new(move || sink.set(sink.get() + 1)))
    }

    #[test]
    fn attach_reports_target_and_root_resizes() {
        let host = Rc::new(HeadlessHost::new(Viewport::new(1024, 768)));
        let root = host.insert_element("#root", BoundingBox::new(0.0, 0.0, 1024.0, 2000.0));
        let target = host.insert_element(".card", BoundingBox::new(100.0, 100.0, 50.0, 50.0));
        let (count, callback) = counting_callback();

        let _subscription = attach(&host, &target, callback, Some(&root));
        host.flush_notifications();
        let initial = count.get();

        host.set_rect(root, BoundingBox::new(0.0, 0.0, 900.0, 2000.0));
        host.flush_notifications();
        assert_eq!(count.get(), initial + 1);

        host.set_rect(target, BoundingBox::new(100.0, 100.0, 70.0, 50.0));
        host.flush_notifications();
        assert_eq!(count.get(), initial + 2);
    }

    #[test]
    fn release_is_idempotent_and_detaches_everything() {
        let host = Rc::new(HeadlessHost::new(Viewport::new(1024, 768)));
        let target = host.insert_element(".card", BoundingBox::new(100.0, 100.0, 50.0, 50.0));
        let (count, callback) = counting_callback();

        let mut subscription = attach(&host, &target, callback, None);
        assert_eq!(host.active_observer_count(), 2);

        subscription.release();
        subscription.release();
        assert!(subscription.is_released());
        assert_eq!(host.active_observer_count(), 0);

        host.set_rect(target, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        host.flush_notifications();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn dropping_window_and_structure_subscriptions_detaches() {
        let host = Rc::new(HeadlessHost::new(Viewport::new(1024, 768)));
        let (count, callback) = counting_callback();
        {
            let _window = attach_window(&host, Rc::clone(&callback));
            let _structure = watch_structure(&host, None, callback);
            assert_eq!(host.active_observer_count(), 2);
            host.scroll_by(0.0, 10.0);
            host.insert_element(".late", BoundingBox::new(0.0, 0.0, 10.0, 10.0));
            host.flush_notifications();
            assert_eq!(count.get(), 2);
        }
        assert_eq!(host.active_observer_count(), 0);
    }
}
