use std::cell::RefCell;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{BoundingBox, TooltipSize, Viewport};

use super::{
    ChangeCallback, ElementLookup, FrameId, FrameScheduler, LayoutObservers, ObserverId,
    TaskCallback, TimerId, TimerScheduler, TooltipSurface, ViewportMetrics,
};

/// Element handle issued by [`HeadlessHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Counters exposed for assertions in tests and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeadlessStats {
    pub frames_requested: usize,
    pub frames_cancelled: usize,
    pub frames_run: usize,
    pub timers_set: usize,
    pub timers_cleared: usize,
    pub notifications_delivered: usize,
    pub focus_requests: usize,
}

#[derive(Debug, Clone)]
struct HeadlessElement {
    selector: String,
    rect: BoundingBox,
    attached: bool,
}

enum ObserverKind {
    Structural,
    Resize(SmallVec<[ElementId; 2]>),
    Intersection {
        element: ElementId,
        thresholds: SmallVec<[f64; 3]>,
        bucket: usize,
    },
    Window,
}

struct Registration {
    kind: ObserverKind,
    callback: ChangeCallback,
}

struct PendingTimer {
    due_ms: u128,
    callback: TaskCallback,
}

enum Retired {
    Notification(ChangeCallback),
    Task(TaskCallback),
}

#[derive(Default)]
struct HeadlessState {
    viewport: Viewport,
    now_ms: u128,
    next_id: u64,
    elements: IndexMap<ElementId, HeadlessElement>,
    observers: IndexMap<ObserverId, Registration>,
    frames: IndexMap<FrameId, TaskCallback>,
    timers: IndexMap<TimerId, PendingTimer>,
    pending: Vec<ObserverId>,
    retired: Vec<Retired>,
    tooltip_size: Option<TooltipSize>,
    stats: HeadlessStats,
}

impl HeadlessState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn queue(&mut self, observer: ObserverId) {
        if !self.pending.contains(&observer) {
            self.pending.push(observer);
        }
    }

    fn queue_matching(&mut self, mut predicate: impl FnMut(&ObserverKind) -> bool) {
        let ids: Vec<ObserverId> = self
            .observers
            .iter()
            .filter(|(_, registration)| predicate(&registration.kind))
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.queue(id);
        }
    }

    fn intersection_ratio(&self, element: ElementId) -> f64 {
        let Some(element) = self.elements.get(&element).filter(|e| e.attached) else {
            return 0.0;
        };
        let rect = element.rect;
        let area = rect.width * rect.height;
        if area <= 0.0 {
            return 0.0;
        }
        let left = rect.left.max(0.0);
        let top = rect.top.max(0.0);
        let right = rect.right().min(f64::from(self.viewport.width));
        let bottom = rect.bottom().min(f64::from(self.viewport.height));
        if right <= left || bottom <= top {
            return 0.0;
        }
        ((right - left) * (bottom - top)) / area
    }

    fn refresh_intersections(&mut self) {
        let mut crossed = Vec::new();
        let ratios: Vec<(ObserverId, f64)> = self
            .observers
            .iter()
            .filter_map(|(id, registration)| match &registration.kind {
                ObserverKind::Intersection { element, .. } => {
                    Some((*id, self.intersection_ratio(*element)))
                }
                _ => None,
            })
            .collect();
        for (id, ratio) in ratios {
            if let Some(ObserverKind::Intersection {
                thresholds, bucket, ..
            }) = self.observers.get_mut(&id).map(|r| &mut r.kind)
            {
                let next = threshold_bucket(ratio, thresholds);
                if next != *bucket {
                    *bucket = next;
                    crossed.push(id);
                }
            }
        }
        for id in crossed {
            self.queue(id);
        }
    }

    fn register(&mut self, kind: ObserverKind, callback: ChangeCallback) -> ObserverId {
        let id = ObserverId(self.allocate_id());
        self.observers.insert(id, Registration { kind, callback });
        id
    }
}

fn threshold_bucket(ratio: f64, thresholds: &[f64]) -> usize {
    thresholds
        .iter()
        .filter(|threshold| {
            if **threshold <= 0.0 {
                ratio > 0.0
            } else {
                ratio >= **threshold
            }
        })
        .count()
}

/// Deterministic in-memory document used for headless runs and tests.
///
/// Elements match a selector by exact string equality and are found in
/// insertion order. Observer notifications are queued and delivered by
/// [`flush_notifications`](Self::flush_notifications); animation frames run on
/// [`run_frame`](Self::run_frame); timers fire on
/// [`advance_time`](Self::advance_time). Resize and intersection observers
/// deliver an initial notification after registration, as browsers do.
pub struct HeadlessHost {
    state: RefCell<HeadlessState>,
}

impl HeadlessHost {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                viewport,
                ..HeadlessState::default()
            }),
        }
    }

    /// Mounts an element and notifies structural watchers.
    pub fn insert_element(&self, selector: impl Into<String>, rect: BoundingBox) -> ElementId {
        let mut state = self.state.borrow_mut();
        let id = ElementId(state.allocate_id());
        state.elements.insert(
            id,
            HeadlessElement {
                selector: selector.into(),
                rect,
                attached: true,
            },
        );
        state.queue_matching(|kind| matches!(kind, ObserverKind::Structural));
        state.refresh_intersections();
        id
    }

    /// Unmounts an element. Its handle stays valid and reports an empty box.
    pub fn remove_element(&self, element: ElementId) {
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.elements.get_mut(&element) else {
            return;
        };
        if !entry.attached {
            return;
        }
        entry.attached = false;
        state.queue_matching(|kind| matches!(kind, ObserverKind::Structural));
        state.queue_matching(|kind| matches!(kind, ObserverKind::Resize(watched) if watched.contains(&element)));
        state.refresh_intersections();
    }

    /// Moves or resizes an element without touching the document structure.
    pub fn set_rect(&self, element: ElementId, rect: BoundingBox) {
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.elements.get_mut(&element) else {
            return;
        };
        let resized = entry.rect.width != rect.width || entry.rect.height != rect.height;
        entry.rect = rect;
        if resized {
            state.queue_matching(
                |kind| matches!(kind, ObserverKind::Resize(watched) if watched.contains(&element)),
            );
        }
        state.refresh_intersections();
    }

    /// Scrolls page content by `(dx, dy)`, shifting every element the opposite way.
    pub fn scroll_by(&self, dx: f64, dy: f64) {
        let mut state = self.state.borrow_mut();
        for element in state.elements.values_mut() {
            element.rect = element.rect.translated(-dx, -dy);
        }
        state.queue_matching(|kind| matches!(kind, ObserverKind::Window));
        state.refresh_intersections();
    }

    pub fn resize_viewport(&self, viewport: Viewport) {
        let mut state = self.state.borrow_mut();
        state.viewport = viewport;
        state.queue_matching(|kind| matches!(kind, ObserverKind::Window));
        state.refresh_intersections();
    }

    pub fn set_tooltip_size(&self, size: Option<TooltipSize>) {
        self.state.borrow_mut().tooltip_size = size;
    }

    /// Delivers queued observer notifications. Returns how many ran.
    pub fn flush_notifications(&self) -> usize {
        let mut delivered = 0;
        loop {
            let callbacks: Vec<ChangeCallback> = {
                let mut state = self.state.borrow_mut();
                let pending = std::mem::take(&mut state.pending);
                pending
                    .into_iter()
                    .filter_map(|id| state.observers.get(&id).map(|r| r.callback.clone()))
                    .collect()
            };
            if callbacks.is_empty() {
                break;
            }
            for callback in callbacks {
                callback();
                delivered += 1;
            }
        }
        self.state.borrow_mut().stats.notifications_delivered += delivered;
        delivered
    }

    /// Flushes notifications, then runs every frame callback requested before
    /// this call. Frames requested while running wait for the next frame.
    pub fn run_frame(&self) -> usize {
        self.flush_notifications();
        let frames: Vec<TaskCallback> = {
            let mut state = self.state.borrow_mut();
            std::mem::take(&mut state.frames).into_values().collect()
        };
        let count = frames.len();
        for frame in frames {
            frame();
        }
        self.state.borrow_mut().stats.frames_run += count;
        count
    }

    /// Advances the clock and fires due timers in deadline order.
    pub fn advance_time(&self, by: Duration) -> usize {
        let target = {
            let mut state = self.state.borrow_mut();
            state.now_ms += by.as_millis();
            state.now_ms
        };
        let mut fired = 0;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .timers
                    .iter()
                    .filter(|(_, timer)| timer.due_ms <= target)
                    .min_by_key(|(id, timer)| (timer.due_ms, **id))
                    .map(|(id, _)| *id);
                due.and_then(|id| state.timers.shift_remove(&id))
            };
            let Some(timer) = next else {
                break;
            };
            (timer.callback)();
            fired += 1;
        }
        fired
    }

    /// Runs notifications and frames until both queues are empty, bounded by
    /// `max_rounds`. Returns the number of frames run.
    pub fn settle(&self, max_rounds: usize) -> usize {
        let mut frames = 0;
        for _ in 0..max_rounds {
            let ran = self.run_frame();
            frames += ran;
            let idle = {
                let state = self.state.borrow();
                state.pending.is_empty() && state.frames.is_empty()
            };
            if ran == 0 && idle {
                break;
            }
        }
        frames
    }

    /// Invokes every callback that was disconnected, cancelled or cleared.
    ///
    /// Models notifications already in flight when a subscriber tore down.
    pub fn replay_retired(&self) -> usize {
        let retired = std::mem::take(&mut self.state.borrow_mut().retired);
        let count = retired.len();
        for entry in retired {
            match entry {
                Retired::Notification(callback) => callback(),
                Retired::Task(callback) => callback(),
            }
        }
        count
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        let now_ms = self.state.borrow().now_ms;
        Duration::from_millis(u64::try_from(now_ms).unwrap_or(u64::MAX))
    }

    #[must_use]
    pub fn active_observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    #[must_use]
    pub fn pending_frame_count(&self) -> usize {
        self.state.borrow().frames.len()
    }

    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    #[must_use]
    pub fn pending_notification_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    #[must_use]
    pub fn stats(&self) -> HeadlessStats {
        self.state.borrow().stats
    }
}

impl ElementLookup for HeadlessHost {
    type Element = ElementId;

    fn find_one(&self, selector: &str) -> Option<ElementId> {
        self.state
            .borrow()
            .elements
            .iter()
            .find(|(_, element)| element.attached && element.selector == selector)
            .map(|(id, _)| *id)
    }

    fn bounding_box(&self, element: &ElementId) -> BoundingBox {
        self.state
            .borrow()
            .elements
            .get(element)
            .filter(|element| element.attached)
            .map(|element| element.rect)
            .unwrap_or_default()
    }

    fn observe_structural_changes(
        &self,
        _root: Option<&ElementId>,
        callback: ChangeCallback,
    ) -> ObserverId {
        // Every element lives under the single root in this model.
        self.state
            .borrow_mut()
            .register(ObserverKind::Structural, callback)
    }

    fn disconnect(&self, observer: ObserverId) {
        let mut state = self.state.borrow_mut();
        if let Some(registration) = state.observers.shift_remove(&observer) {
            state.pending.retain(|id| *id != observer);
            state
                .retired
                .push(Retired::Notification(registration.callback));
        }
    }
}

impl LayoutObservers for HeadlessHost {
    fn observe_resize(&self, elements: &[ElementId], callback: ChangeCallback) -> ObserverId {
        let mut state = self.state.borrow_mut();
        let id = state.register(
            ObserverKind::Resize(elements.iter().copied().collect()),
            callback,
        );
        state.queue(id);
        id
    }

    fn observe_intersection(
        &self,
        element: &ElementId,
        thresholds: &[f64],
        callback: ChangeCallback,
    ) -> ObserverId {
        let mut state = self.state.borrow_mut();
        let thresholds: SmallVec<[f64; 3]> = thresholds.iter().copied().collect();
        let bucket = threshold_bucket(state.intersection_ratio(*element), &thresholds);
        let id = state.register(
            ObserverKind::Intersection {
                element: *element,
                thresholds,
                bucket,
            },
            callback,
        );
        state.queue(id);
        id
    }

    fn observe_window(&self, callback: ChangeCallback) -> ObserverId {
        self.state
            .borrow_mut()
            .register(ObserverKind::Window, callback)
    }
}

impl FrameScheduler for HeadlessHost {
    fn request_frame(&self, callback: TaskCallback) -> FrameId {
        let mut state = self.state.borrow_mut();
        let id = FrameId(state.allocate_id());
        state.frames.insert(id, callback);
        state.stats.frames_requested += 1;
        id
    }

    fn cancel_frame(&self, frame: FrameId) {
        let mut state = self.state.borrow_mut();
        if let Some(callback) = state.frames.shift_remove(&frame) {
            state.retired.push(Retired::Task(callback));
            state.stats.frames_cancelled += 1;
        }
    }
}

impl TimerScheduler for HeadlessHost {
    fn set_timeout(&self, delay: Duration, callback: TaskCallback) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = TimerId(state.allocate_id());
        let due_ms = state.now_ms + delay.as_millis();
        state.timers.insert(id, PendingTimer { due_ms, callback });
        state.stats.timers_set += 1;
        id
    }

    fn clear_timeout(&self, timer: TimerId) {
        let mut state = self.state.borrow_mut();
        if let Some(pending) = state.timers.shift_remove(&timer) {
            state.retired.push(Retired::Task(pending.callback));
            state.stats.timers_cleared += 1;
        }
    }
}

impl ViewportMetrics for HeadlessHost {
    fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }
}

impl TooltipSurface for HeadlessHost {
    fn tooltip_size(&self) -> Option<TooltipSize> {
        self.state.borrow().tooltip_size
    }

    fn focus_tooltip(&self) {
        self.state.borrow_mut().stats.focus_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{HeadlessHost, threshold_bucket};
    use crate::core::{BoundingBox, Viewport};
    use crate::host::{ElementLookup, FrameScheduler, LayoutObservers};

    fn counter() -> (Rc<Cell<usize>>, Rc<dyn Fn()>) {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        (count, Rc::new(move || sink.set(sink.get() + 1)))
    }

    #[test]
    fn threshold_bucket_counts_crossed_thresholds() {
        let thresholds = [0.0, 0.5, 1.0];
        assert_eq!(threshold_bucket(0.0, &thresholds), 0);
        assert_eq!(threshold_bucket(0.2, &thresholds), 1);
        assert_eq!(threshold_bucket(0.5, &thresholds), 2);
        assert_eq!(threshold_bucket(1.0, &thresholds), 3);
    }

    #[test]
    fn position_only_change_skips_resize_observers() {
        let host = HeadlessHost::new(Viewport::new(800, 600));
        let el = host.insert_element(".card", BoundingBox::new(10.0, 10.0, 50.0, 50.0));
        let (count, callback) = counter();
        host.observe_resize(&[el], callback);
        host.flush_notifications();
        assert_eq!(count.get(), 1);

        host.set_rect(el, BoundingBox::new(20.0, 20.0, 50.0, 50.0));
        host.flush_notifications();
        assert_eq!(count.get(), 1);

        host.set_rect(el, BoundingBox::new(20.0, 20.0, 60.0, 50.0));
        host.flush_notifications();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn scrolling_out_of_view_crosses_intersection_threshold() {
        let host = HeadlessHost::new(Viewport::new(800, 600));
        let el = host.insert_element(".row", BoundingBox::new(0.0, 100.0, 100.0, 100.0));
        let (count, callback) = counter();
        host.observe_intersection(&el, &[0.0, 0.5, 1.0], callback);
        host.flush_notifications();
        assert_eq!(count.get(), 1);

        host.scroll_by(0.0, 50.0);
        host.flush_notifications();
        assert_eq!(count.get(), 1);

        host.scroll_by(0.0, 100.0);
        host.flush_notifications();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn cancelled_frame_does_not_run_until_replayed() {
        let host = HeadlessHost::new(Viewport::new(800, 600));
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let frame = host.request_frame(Box::new(move || flag.set(true)));
        host.cancel_frame(frame);

        assert_eq!(host.run_frame(), 0);
        assert!(!ran.get());
        assert_eq!(host.replay_retired(), 1);
        assert!(ran.get());
    }

    #[test]
    fn timers_fire_in_deadline_order_as_time_advances() {
        use crate::host::TimerScheduler;
        use std::cell::RefCell;
        use std::time::Duration;

        let host = HeadlessHost::new(Viewport::new(800, 600));
        let fired = Rc::new(RefCell::new(Vec::new()));
        for (label, delay) in [("late", 150), ("early", 50)] {
            let sink = Rc::clone(&fired);
            host.set_timeout(
                Duration::from_millis(delay),
                Box::new(move || sink.borrow_mut().push(label)),
            );
        }

        assert_eq!(host.advance_time(Duration::from_millis(100)), 1);
        assert_eq!(host.now(), Duration::from_millis(100));
        assert_eq!(host.advance_time(Duration::from_millis(100)), 1);
        assert_eq!(*fired.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn notifications_stay_queued_until_flushed() {
        let host = HeadlessHost::new(Viewport::new(800, 600));
        let el = host.insert_element(".card", BoundingBox::new(10.0, 10.0, 50.0, 50.0));
        let (count, callback) = counter();
        host.observe_resize(&[el], callback);
        assert_eq!(host.pending_notification_count(), 1);
        assert_eq!(count.get(), 0);

        assert_eq!(host.flush_notifications(), 1);
        assert_eq!(host.pending_notification_count(), 0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn removed_element_is_not_found() {
        let host = HeadlessHost::new(Viewport::new(800, 600));
        let el = host.insert_element(".gone", BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        host.remove_element(el);
        assert_eq!(host.find_one(".gone"), None);
        assert_eq!(host.bounding_box(&el), BoundingBox::default());
    }
}
