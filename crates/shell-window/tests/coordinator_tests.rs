//! Window coordinator behaviour against a recording host.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use shell_test_utils::{HostEvent, RecordingHost};
use shell_window::{
    CloseDecision, ContentMessage, CoordinatorConfig, EditState, Error, OpenPolicy,
    OutboundMessage, TabKind, WindowCoordinator, WindowId, WindowOptions, WindowState,
};
use tokio::time::Instant;

fn coordinator_with(config: CoordinatorConfig) -> (Arc<RecordingHost>, WindowCoordinator) {
    let host = RecordingHost::new();
    let coordinator = WindowCoordinator::new(host.clone(), config);
    (host, coordinator)
}

fn coordinator() -> (Arc<RecordingHost>, WindowCoordinator) {
    coordinator_with(CoordinatorConfig::default())
}

fn focused_count(coordinator: &WindowCoordinator) -> usize {
    coordinator.snapshot().iter().filter(|w| w.focused).count()
}

// ============================================================================
// Opening and focus
// ============================================================================

#[test]
fn test_open_registers_focused_window_with_default_size() {
    let (host, coordinator) = coordinator();

    let window = coordinator.open("home", WindowOptions::default()).unwrap();

    assert_eq!(window.state, WindowState::Open);
    assert!(window.focused);
    assert!(!window.ready_to_close);
    assert_eq!(window.options.width, Some(900));
    assert_eq!(window.options.height, Some(600));
    assert_eq!(coordinator.len(), 1);
    assert_eq!(host.created_count(), 1);
}

#[test]
fn test_explicit_size_wins_over_default() {
    let (_host, coordinator) = coordinator();
    let window = coordinator
        .open("project", WindowOptions::default().with_size(1200, 800))
        .unwrap();
    assert_eq!(window.options.width, Some(1200));
    assert_eq!(window.options.height, Some(800));
}

#[rstest]
#[case(OpenPolicy::FocusExisting, 1)]
#[case(OpenPolicy::AlwaysCreate, 2)]
fn test_open_same_locator_twice(#[case] policy: OpenPolicy, #[case] expected_windows: usize) {
    let (host, coordinator) = coordinator_with(CoordinatorConfig {
        open_policy: policy,
        ..CoordinatorConfig::default()
    });

    let first = coordinator.open("a", WindowOptions::default()).unwrap();
    coordinator.open("b", WindowOptions::default()).unwrap();
    let second = coordinator.open("a", WindowOptions::default()).unwrap();

    assert_eq!(coordinator.len(), expected_windows + 1);
    assert_eq!(host.created_count(), expected_windows + 1);
    assert_eq!(first.id == second.id, policy == OpenPolicy::FocusExisting);
    assert_eq!(coordinator.focused().unwrap().id, second.id);
    assert_eq!(focused_count(&coordinator), 1);
}

#[test]
fn test_reopening_a_closing_locator_creates_a_new_window() {
    let (host, coordinator) = coordinator();
    let closing = coordinator.open("a", WindowOptions::default()).unwrap();
    assert_eq!(coordinator.handle_close_attempt(closing.id), CloseDecision::Veto);

    let reopened = coordinator.open("a", WindowOptions::default()).unwrap();
    assert_ne!(reopened.id, closing.id);
    assert_eq!(reopened.state, WindowState::Open);
    assert_eq!(host.created_count(), 2);
    assert_eq!(coordinator.focused().unwrap().id, reopened.id);

    // The old window finishes closing; the new one keeps the shell alive.
    coordinator.acknowledge_ready_to_close(closing.id);
    assert_eq!(coordinator.len(), 1);
    assert!(coordinator.get(reopened.id).is_some());
    assert!(!coordinator.is_terminated());
    assert_eq!(host.quit_count(), 0);

    // An open window for the locator is reused again.
    assert_eq!(
        coordinator.open("a", WindowOptions::default()).unwrap().id,
        reopened.id
    );
}

#[test]
fn test_host_creation_failure_leaves_registry_unchanged() {
    let (host, coordinator) = coordinator();
    let home = coordinator.open("home", WindowOptions::default()).unwrap();

    host.fail_creates("no display");
    let err = coordinator.open("project", WindowOptions::default()).unwrap_err();

    assert!(matches!(err, Error::HostCreationFailed { ref locator, .. } if locator == "project"));
    assert_eq!(coordinator.len(), 1);
    assert_eq!(coordinator.focused().unwrap().id, home.id);

    host.allow_creates();
    let project = coordinator.open("project", WindowOptions::default()).unwrap();
    assert_ne!(project.id, home.id);
}

#[test]
fn test_request_focus_by_locator() {
    let (host, coordinator) = coordinator();
    let home = coordinator.open("home", WindowOptions::default()).unwrap();
    coordinator.open("project", WindowOptions::default()).unwrap();

    assert!(coordinator.request_focus("home"));
    assert_eq!(coordinator.focused().unwrap().id, home.id);
    assert!(host.events().contains(&HostEvent::Focused(1)));

    assert!(!coordinator.request_focus("missing"));
    assert_eq!(coordinator.focused().unwrap().id, home.id);
}

#[test]
fn test_host_focus_change_for_unknown_window_keeps_flags() {
    let (_host, coordinator) = coordinator();
    let home = coordinator.open("home", WindowOptions::default()).unwrap();
    let project = coordinator.open("project", WindowOptions::default()).unwrap();

    assert!(coordinator.host_focus_changed(home.id));
    assert!(!coordinator.host_focus_changed(WindowId::new(99)));

    assert_eq!(coordinator.focused().unwrap().id, home.id);
    assert!(!coordinator.get(project.id).unwrap().focused);
}

// ============================================================================
// Close negotiation
// ============================================================================

#[test]
fn test_close_attempt_vetoes_and_sends_one_before_close() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();
    let handle = host.last_handle();

    let decision = coordinator.handle_close_attempt(window.id);

    assert_eq!(decision, CloseDecision::Veto);
    assert_eq!(host.sent_to(handle), vec![OutboundMessage::BeforeClose]);
    assert!(host.destroyed().is_empty());
    assert_eq!(
        coordinator.get(window.id).unwrap().state,
        WindowState::CloseRequested
    );
}

#[test]
fn test_acknowledge_closes_and_terminates_last_window() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();
    let handle = host.last_handle();

    coordinator.handle_close_attempt(window.id);
    let decision = coordinator.acknowledge_ready_to_close(window.id);

    match decision {
        CloseDecision::Allow(closed) => {
            assert_eq!(closed.state, WindowState::Closed);
            assert!(closed.ready_to_close);
        }
        other => panic!("expected Allow, got {other:?}"),
    }
    assert_eq!(host.destroyed(), vec![handle]);
    assert!(coordinator.is_empty());
    assert!(coordinator.is_terminated());
    assert_eq!(host.quit_count(), 1);
}

#[test]
fn test_closing_non_last_window_does_not_terminate() {
    let (host, coordinator) = coordinator();
    let home = coordinator.open("home", WindowOptions::default()).unwrap();
    let project = coordinator.open("project", WindowOptions::default()).unwrap();

    coordinator.handle_close_attempt(project.id);
    coordinator.acknowledge_ready_to_close(project.id);

    assert_eq!(coordinator.len(), 1);
    assert!(!coordinator.is_terminated());
    assert_eq!(host.quit_count(), 0);

    coordinator.handle_close_attempt(home.id);
    coordinator.acknowledge_ready_to_close(home.id);
    assert_eq!(host.quit_count(), 1);
}

#[test]
fn test_out_of_order_acknowledgements_across_windows() {
    let (host, coordinator) = coordinator();
    let a = coordinator.open("a", WindowOptions::default()).unwrap();
    let b = coordinator.open("b", WindowOptions::default()).unwrap();

    coordinator.handle_close_attempt(a.id);
    coordinator.handle_close_attempt(b.id);
    coordinator.acknowledge_ready_to_close(b.id);
    assert_eq!(host.quit_count(), 0);
    coordinator.acknowledge_ready_to_close(a.id);

    assert_eq!(host.destroyed(), vec![2, 1]);
    assert_eq!(host.quit_count(), 1);
    assert_eq!(host.live_handles(), 0);
}

#[test]
fn test_repeated_close_attempts_each_send_before_close() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();

    coordinator.handle_close_attempt(window.id);
    coordinator.handle_close_attempt(window.id);

    assert_eq!(host.sent_to(host.last_handle()).len(), 2);
    assert_eq!(coordinator.len(), 1);
}

#[test]
fn test_unknown_window_operations_are_noops() {
    let (host, coordinator) = coordinator();
    coordinator.open("home", WindowOptions::default()).unwrap();
    let unknown = WindowId::new(42);
    let before = host.events().len();

    assert_eq!(coordinator.handle_close_attempt(unknown), CloseDecision::Unknown);
    assert_eq!(coordinator.acknowledge_ready_to_close(unknown), CloseDecision::Unknown);
    assert!(!coordinator.reload(unknown));
    assert!(!coordinator.request_reload(unknown));
    assert!(!coordinator.resize_request(unknown, 10, 10));
    assert!(!coordinator.update_edit_state(unknown, EditState::default()));
    assert!(!coordinator.update_active_tab(unknown, Some(TabKind::Home)));

    assert_eq!(host.events().len(), before);
    assert_eq!(coordinator.len(), 1);
}

#[test]
fn test_termination_happens_once_and_blocks_new_windows() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();
    coordinator.acknowledge_ready_to_close(window.id);

    // Late events for the destroyed window
    assert_eq!(coordinator.handle_close_attempt(window.id), CloseDecision::Unknown);
    assert_eq!(coordinator.acknowledge_ready_to_close(window.id), CloseDecision::Unknown);

    assert!(matches!(
        coordinator.open("home", WindowOptions::default()),
        Err(Error::Terminated)
    ));
    assert_eq!(host.quit_count(), 1);
}

// ============================================================================
// Reload, resize, reported state
// ============================================================================

#[test]
fn test_reload_clears_history_without_lifecycle_change() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();
    let handle = host.last_handle();

    assert!(coordinator.request_reload(window.id));
    assert_eq!(host.sent_to(handle), vec![OutboundMessage::Reload]);

    coordinator.handle_content_message(window.id, ContentMessage::Reload);
    let events = host.events();
    assert!(events.contains(&HostEvent::Reloaded(handle)));
    assert!(events.contains(&HostEvent::HistoryCleared(handle)));
    assert_eq!(coordinator.get(window.id).unwrap().state, WindowState::Open);
}

#[test]
fn test_resize_ignored_while_maximized() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();
    let handle = host.last_handle();

    host.set_maximized(handle, true);
    assert!(!coordinator.resize_request(window.id, 800, 500));

    host.set_maximized(handle, false);
    assert!(coordinator.resize_request(window.id, 800, 500));
    assert_eq!(
        host.count(|e| matches!(e, HostEvent::Resized { .. })),
        1
    );
}

#[test]
fn test_content_reported_state_is_recorded() {
    let (_host, coordinator) = coordinator();
    let window = coordinator.open("project", WindowOptions::default()).unwrap();

    coordinator.handle_content_message(
        window.id,
        ContentMessage::from_json(r#"{"type":"set-window-state","modified":true,"undo":"Move"}"#)
            .unwrap(),
    );
    coordinator.handle_content_message(
        window.id,
        ContentMessage::SetActiveTab {
            tab: Some(TabKind::Instrument),
        },
    );

    let snapshot = coordinator.get(window.id).unwrap();
    assert!(snapshot.edit_state.modified);
    assert_eq!(snapshot.edit_state.undo.as_deref(), Some("Move"));
    assert_eq!(snapshot.active_tab, Some(TabKind::Instrument));
}

#[test]
fn test_prevent_suspension_is_idempotent_and_released_on_quit() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();

    coordinator.set_prevent_suspension(true);
    coordinator.set_prevent_suspension(true);
    assert!(coordinator.is_suspension_prevented());
    assert_eq!(host.count(|e| matches!(e, HostEvent::PowerSaveStarted(_))), 1);

    coordinator.acknowledge_ready_to_close(window.id);
    assert!(!coordinator.is_suspension_prevented());
    assert_eq!(host.count(|e| matches!(e, HostEvent::PowerSaveStopped(1))), 1);
}

// ============================================================================
// Grace period
// ============================================================================

#[test]
fn test_no_grace_period_waits_indefinitely() {
    let (host, coordinator) = coordinator();
    let window = coordinator.open("home", WindowOptions::default()).unwrap();
    coordinator.handle_close_attempt(window.id);

    let far_future = Instant::now() + Duration::from_secs(24 * 60 * 60);
    assert!(coordinator.expire_close_requests(far_future).is_empty());
    assert_eq!(coordinator.len(), 1);
    assert_eq!(host.quit_count(), 0);
}

#[test]
fn test_grace_period_force_closes_unresponsive_window() {
    let (host, coordinator) = coordinator_with(CoordinatorConfig {
        close_grace_period: Some(Duration::from_secs(5)),
        ..CoordinatorConfig::default()
    });
    let stuck = coordinator.open("stuck", WindowOptions::default()).unwrap();
    let idle = coordinator.open("idle", WindowOptions::default()).unwrap();

    coordinator.handle_close_attempt(stuck.id);
    let now = Instant::now();

    assert!(coordinator.expire_close_requests(now).is_empty());
    let expired = coordinator.expire_close_requests(now + Duration::from_secs(6));

    assert_eq!(expired, vec![stuck.id]);
    assert!(coordinator.get(stuck.id).is_none());
    assert!(coordinator.get(idle.id).is_some());
    assert_eq!(host.quit_count(), 0);
}

// ============================================================================
// Focus exclusivity under arbitrary operation sequences
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Open(u8),
    Focus(u8),
    HostFocus(u64),
    Close(u64),
    Ack(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4).prop_map(Op::Open),
        (0u8..4).prop_map(Op::Focus),
        (1u64..8).prop_map(Op::HostFocus),
        (1u64..8).prop_map(Op::Close),
        (1u64..8).prop_map(Op::Ack),
    ]
}

proptest! {
    #[test]
    fn prop_at_most_one_window_focused(
        ops in proptest::collection::vec(op(), 1..40),
        always_create in any::<bool>(),
    ) {
        let policy = if always_create { OpenPolicy::AlwaysCreate } else { OpenPolicy::FocusExisting };
        let (host, coordinator) = coordinator_with(CoordinatorConfig {
            open_policy: policy,
            ..CoordinatorConfig::default()
        });

        for op in ops {
            match op {
                Op::Open(n) => { let _ = coordinator.open(&format!("w{n}"), WindowOptions::default()); }
                Op::Focus(n) => { coordinator.request_focus(&format!("w{n}")); }
                Op::HostFocus(id) => { coordinator.host_focus_changed(WindowId::new(id)); }
                Op::Close(id) => { coordinator.handle_close_attempt(WindowId::new(id)); }
                Op::Ack(id) => { coordinator.acknowledge_ready_to_close(WindowId::new(id)); }
            }
            prop_assert!(focused_count(&coordinator) <= 1);
            prop_assert_eq!(host.live_handles(), coordinator.len());
            prop_assert!(host.quit_count() <= 1);
        }

        if host.quit_count() == 1 {
            prop_assert!(coordinator.is_empty());
        }
    }
}
