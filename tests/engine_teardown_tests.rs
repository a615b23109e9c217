use std::rc::Rc;

use tour_rs::core::{BoundingBox, Viewport};
use tour_rs::host::HeadlessHost;
use tour_rs::{CursorHandle, TourEngine, TourEngineConfig, TourStep, TourSteps};

fn two_step_setup() -> (Rc<HeadlessHost>, CursorHandle, TourEngine<HeadlessHost>) {
    let host = Rc::new(HeadlessHost::new(Viewport::new(1024, 768)));
    host.insert_element("#root", BoundingBox::new(0.0, 0.0, 1024.0, 2000.0));
    host.insert_element(".card", BoundingBox::new(100.0, 100.0, 50.0, 50.0));
    host.insert_element(".chart", BoundingBox::new(200.0, 300.0, 300.0, 200.0));
    host.flush_notifications();

    let cursor = CursorHandle::new();
    let steps = TourSteps::new(vec![
        TourStep::new(".card", "Metrics", "Key numbers"),
        TourStep::new(".chart", "Trends", "Weekly trend"),
    ])
    .expect("steps");
    let engine = TourEngine::new(
        Rc::clone(&host),
        cursor.clone(),
        steps,
        TourEngineConfig::default(),
    )
    .expect("engine");
    (host, cursor, engine)
}

#[test]
fn dispose_releases_observers_frames_and_timers() {
    let (host, cursor, mut engine) = two_step_setup();
    cursor.start();
    host.run_frame();
    engine.request_recompute();
    assert!(host.pending_timer_count() > 0);
    assert!(host.pending_frame_count() > 0);

    engine.dispose();

    assert!(engine.is_disposed());
    assert_eq!(host.active_observer_count(), 0);
    assert_eq!(host.pending_frame_count(), 0);
    assert_eq!(host.pending_timer_count(), 0);
    assert_eq!(cursor.subscriber_count(), 0);
}

#[test]
fn callbacks_in_flight_after_dispose_are_ignored() {
    let (host, cursor, mut engine) = two_step_setup();
    cursor.start();
    host.run_frame();
    engine.request_recompute();
    let state = engine.state();
    let revision = engine.state_revision();

    engine.dispose();
    assert!(host.replay_retired() > 0);
    host.settle(4);

    assert_eq!(engine.state(), state);
    assert_eq!(engine.state_revision(), revision);
    assert_eq!(host.stats().focus_requests, 0);
    assert_eq!(host.pending_frame_count(), 0);
}

#[test]
fn disposed_engine_ignores_cursor_and_dispatch() {
    let (host, cursor, mut engine) = two_step_setup();
    cursor.start();
    host.run_frame();
    let revision = engine.state_revision();

    engine.dispose();
    cursor.next();
    assert!(!engine.dispatch(tour_rs::TourCommand::Prev));
    engine.request_recompute();
    host.settle(4);

    assert_eq!(engine.state_revision(), revision);
    assert_eq!(host.pending_frame_count(), 0);
}

#[test]
fn dropping_engine_detaches_everything() {
    let (host, cursor, engine) = two_step_setup();
    cursor.start();
    host.run_frame();

    drop(engine);

    assert_eq!(host.active_observer_count(), 0);
    assert_eq!(host.pending_frame_count(), 0);
    assert_eq!(host.pending_timer_count(), 0);
    assert_eq!(cursor.subscriber_count(), 0);
    host.replay_retired();
    host.scroll_by(0.0, 10.0);
    host.settle(4);
    assert_eq!(host.stats().focus_requests, 0);
}

#[test]
fn stale_callbacks_from_previous_step_do_not_touch_current_step() {
    let (host, cursor, engine) = two_step_setup();
    cursor.start();
    host.run_frame();

    cursor.next();
    let awaiting = engine.state();
    let revision = engine.state_revision();
    assert_eq!(awaiting.current_index, Some(1));

    // previous step's observers and focus timer fire late
    host.replay_retired();
    assert_eq!(engine.state(), awaiting);
    assert_eq!(engine.state_revision(), revision);
    assert_eq!(host.stats().focus_requests, 0);

    host.run_frame();
    let state = engine.state();
    assert!(state.visible);
    assert_eq!(state.current_index, Some(1));
    assert_eq!(
        state.target_rect,
        Some(BoundingBox::new(200.0, 300.0, 300.0, 200.0))
    );
}

#[test]
fn ending_the_tour_releases_step_observers_but_keeps_following_cursor() {
    let (host, cursor, engine) = two_step_setup();
    cursor.start();
    host.run_frame();

    cursor.end();
    assert!(!engine.is_visible());
    assert_eq!(host.active_observer_count(), 0);
    assert_eq!(cursor.subscriber_count(), 1);

    cursor.start();
    host.run_frame();
    assert!(engine.is_visible());
}
