use super::*;
use crate::connection::LifecycleEvent;
use crate::testing::{FakeComposer, FakeConnector, FakeList, FakeNetwork, FakeScope, FakeSend};

fn binder() -> (UiBinder, Rc<FakeNetwork>) {
    let (connector, network) = FakeConnector::pair();
    (UiBinder::new(ChatConfig::default(), connector), network)
}

// =============================================================
// bind
// =============================================================

#[test]
fn bind_is_idempotent_per_widget() {
    let (binder, network) = binder();
    let scope = FakeScope::empty_widget();

    assert!(binder.bind(&scope).is_some());
    assert!(binder.bind(&scope).is_none());
    assert!(binder.bind(&scope).is_none());

    assert_eq!(scope.fake_send().click_handlers(), 1);
    assert_eq!(scope.fake_composer().keydown_handlers(), 1);
    assert_eq!(scope.fake_composer().input_handlers(), 1);

    network.connect();
    scope.fake_composer().type_text("once");
    scope.fake_send().click();
    assert_eq!(network.emitted_count(), 1);
}

#[test]
fn binding_marker_matches_binding_id() {
    let (binder, _network) = binder();
    let scope = FakeScope::empty_widget();
    let binding = binder.bind(&scope).expect("binding");

    assert!(binding.is_bound());
    assert_eq!(scope.fake_list().get(DATA_BINDING).as_deref(), Some(binding.id()));
}

#[test]
fn incomplete_widget_is_skipped_without_connecting() {
    let (binder, network) = binder();
    let mut scope = FakeScope::empty_widget();
    scope.send = None;

    assert!(binder.bind(&scope).is_none());
    assert!(binder.bind(&FakeScope::default()).is_none());
    assert_eq!(network.opens.get(), 0);
    assert!(!binder.connection().is_open());
}

#[test]
fn widgets_share_one_connection() {
    let (binder, network) = binder();
    let first = FakeScope::empty_widget();
    let swapped = FakeScope::empty_widget();

    binder.bind(&first).expect("first");
    binder.bind(&swapped).expect("swapped");

    assert_eq!(network.opens.get(), 1);
    assert_eq!(binder.bindings().live().len(), 2);
}

#[test]
fn send_control_follows_connection_health() {
    let (binder, network) = binder();
    let scope = FakeScope::empty_widget();
    binder.bind(&scope).expect("binding");
    assert!(scope.fake_send().disabled.get());

    network.connect();
    assert!(!scope.fake_send().disabled.get());

    network.fire(LifecycleEvent::Disconnect("io server disconnect".to_owned()));
    assert!(scope.fake_send().disabled.get());
}

#[test]
fn widget_bound_after_connect_starts_enabled() {
    let (binder, network) = binder();
    binder.bind(&FakeScope::empty_widget()).expect("first");
    network.connect();

    let late = FakeScope::empty_widget();
    binder.bind(&late).expect("late");
    assert!(!late.fake_send().disabled.get());
}

// =============================================================
// receiver id and current user
// =============================================================

#[test]
fn receiver_id_prefers_composer_then_send_control() {
    let (binder, _network) = binder();

    let from_composer = FakeScope::widget(
        FakeList::with_data(&[]),
        FakeComposer::with_data(&[(DATA_RECEIVER_ID, "12")]),
        FakeSend::with_data(&[(DATA_RECEIVER_ID, "99")]),
    );
    assert_eq!(binder.bind(&from_composer).expect("binding").receiver_id(), 12);

    let from_send = FakeScope::widget(
        FakeList::with_data(&[]),
        FakeComposer::with_data(&[(DATA_RECEIVER_ID, " ")]),
        FakeSend::with_data(&[(DATA_RECEIVER_ID, "99")]),
    );
    assert_eq!(binder.bind(&from_send).expect("binding").receiver_id(), 99);
}

#[test]
fn malformed_receiver_id_defaults_to_unknown() {
    assert_eq!(parse_receiver_id(Some("abc".to_owned())), UNKNOWN_RECEIVER);
    assert_eq!(parse_receiver_id(Some("-3".to_owned())), UNKNOWN_RECEIVER);
    assert_eq!(parse_receiver_id(None), UNKNOWN_RECEIVER);
    assert_eq!(parse_receiver_id(Some(" 42 ".to_owned())), 42);
}

#[test]
fn current_user_is_trimmed_and_lowercased() {
    let (binder, _network) = binder();
    let scope = FakeScope::widget(
        FakeList::with_data(&[(DATA_CURRENT_USER, "  Bob ")]),
        FakeComposer::with_data(&[]),
        FakeSend::with_data(&[]),
    );
    assert_eq!(binder.bind(&scope).expect("binding").current_user(), "bob");
}

// =============================================================
// keyboard and live messages
// =============================================================

#[test]
fn enter_sends_and_shift_enter_inserts_newline() {
    let (binder, network) = binder();
    let scope = FakeScope::empty_widget();
    binder.bind(&scope).expect("binding");
    network.connect();

    let composer = scope.fake_composer();
    composer.type_text("line one");
    assert!(!composer.press("Enter", true));
    assert_eq!(network.emitted_count(), 0);

    assert!(composer.press("Enter", false));
    assert_eq!(network.emitted_count(), 1);
    assert_eq!(composer.current_value(), "");
}

#[test]
fn enter_is_suppressed_even_when_nothing_is_sent() {
    let (binder, network) = binder();
    let scope = FakeScope::empty_widget();
    binder.bind(&scope).expect("binding");

    assert!(scope.fake_composer().press("Enter", false));
    assert_eq!(network.emitted_count(), 0);
}

#[test]
fn inbound_message_renders_in_live_widgets() {
    let (binder, network) = binder();
    let scope = FakeScope::widget(
        FakeList::with_data(&[(DATA_CURRENT_USER, "bob")]),
        FakeComposer::with_data(&[]),
        FakeSend::with_data(&[]),
    );
    binder.bind(&scope).expect("binding");

    network.receive(serde_json::json!({
        "sender": "Alice",
        "content": "hi",
        "timestamp": "2024-05-01T10:15:00+00:00",
    }));

    let list = scope.fake_list();
    let bubbles = list.bubbles.borrow();
    assert_eq!(bubbles.len(), 1);
    assert_eq!(bubbles[0].side, render::Side::Other);
    assert_eq!(bubbles[0].display_name, "Alice");
    assert!(!bubbles[0].time_label.is_empty());
    assert_eq!(list.scrolls.get(), 1);
}

#[test]
fn detached_widgets_are_pruned() {
    let (binder, network) = binder();
    let old = FakeScope::empty_widget();
    let fresh = FakeScope::empty_widget();
    binder.bind(&old).expect("old");
    binder.bind(&fresh).expect("fresh");

    old.fake_list().detach();
    network.receive(serde_json::json!({"sender": "Alice", "content": "hi"}));

    assert_eq!(old.fake_list().rendered(), 0);
    assert_eq!(fresh.fake_list().rendered(), 1);
    assert_eq!(binder.bindings().live().len(), 1);
}
