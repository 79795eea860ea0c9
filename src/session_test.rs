use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::identity::Identity;
use crate::store::ActivityMode;

/// Transport double that records every call into a shared log.
struct MockTransport {
    log: Rc<RefCell<Vec<String>>>,
}

impl MockTransport {
    fn new() -> (Self, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Self { log: Rc::clone(&log) }, log)
    }
}

impl ChannelTransport for MockTransport {
    fn connect(&mut self) {
        self.log.borrow_mut().push("connect".to_owned());
    }

    fn disconnect(&mut self) {
        self.log.borrow_mut().push("disconnect".to_owned());
    }

    fn send_typing(&mut self, section_index: u32, is_typing: bool) {
        self.log
            .borrow_mut()
            .push(format!("typing {section_index} {is_typing}"));
    }

    fn send_edit(&mut self, section_index: u32, field: &str, value: &Value, persist: bool) {
        self.log
            .borrow_mut()
            .push(format!("edit {section_index} {field} {value} {persist}"));
    }

    fn send_section_focus(&mut self, section_index: u32) {
        self.log.borrow_mut().push(format!("focus {section_index}"));
    }

    fn request_active_users(&mut self) {
        self.log.borrow_mut().push("active_users".to_owned());
    }
}

fn alice() -> Option<Identity> {
    Some(Identity {
        id: "u1".to_owned(),
        name: "Alice".to_owned(),
        email: None,
        avatar_url: None,
    })
}

fn started() -> (CollabSession<MockTransport>, Rc<RefCell<Vec<String>>>) {
    let (transport, log) = MockTransport::new();
    let session = CollabSession::start(&alice(), transport).expect("start");
    (session, log)
}

// =============================================================
// Startup and identity
// =============================================================

#[test]
fn start_without_identity_refuses_to_connect() {
    let (transport, log) = MockTransport::new();
    let none: Option<Identity> = None;

    let err = CollabSession::start(&none, transport).expect_err("should fail");

    assert!(matches!(err, SessionError::MissingIdentity));
    assert!(log.borrow().is_empty(), "no connect attempt may be made");
}

#[test]
fn start_seeds_current_user_and_connects() {
    let (session, log) = started();

    assert_eq!(*log.borrow(), vec!["connect"]);
    assert_eq!(session.status(), ConnectionStatus::Connecting);

    let me = session.state().current_user.as_ref().expect("current user");
    assert_eq!(me.id, "u1");
    assert_eq!(me.mode, ActivityMode::Viewing);
    assert!(session.state().viewers.is_empty());
}

#[test]
fn connected_callback_requests_initial_snapshot() {
    let (mut session, log) = started();

    session.handle_connected();

    assert!(session.is_connected());
    assert_eq!(*log.borrow(), vec!["connect", "active_users"]);
}

// =============================================================
// Inbound messages
// =============================================================

#[test]
fn inbound_snapshot_populates_viewers() {
    let (mut session, _log) = started();
    session.handle_connected();

    session.handle_message(
        r#"{"kind":"active_users","users":[
            {"userId":"u1","userName":"Alice"},
            {"userId":"u2","userName":"Bob"}
        ]}"#,
    );

    assert_eq!(session.state().viewers.len(), 1);
    assert_eq!(session.state().viewers[0].id, "u2");
}

#[test]
fn inbound_focus_claim_locks_section() {
    let (mut session, _log) = started();

    session.handle_message(
        r#"{"kind":"section_focus","userId":"u2","userName":"Bob","sectionIndex":2}"#,
    );

    assert_eq!(session.state().locked_sections["2"].id, "u2");
}

#[test]
fn malformed_message_leaves_state_untouched() {
    let (mut session, _log) = started();
    session.handle_message(
        r#"{"kind":"section_focus","userId":"u2","userName":"Bob","sectionIndex":2}"#,
    );
    let before = session.state().clone();

    session.handle_message("{{{ not json");
    session.handle_message(r#"{"kind":"section_focus","userId":"u9"}"#);
    session.handle_message(r#"{"noKind":true}"#);

    assert_eq!(*session.state(), before);
}

#[test]
fn unknown_kind_is_ignored_for_forward_compatibility() {
    let (mut session, _log) = started();
    session.handle_message(r#"{"kind":"cursor_moved","userId":"u2","x":4}"#);
    assert!(session.state().viewers.is_empty());
}

// =============================================================
// Outbound intents
// =============================================================

#[test]
fn outbound_intents_pass_through_without_touching_state() {
    let (mut session, log) = started();
    session.handle_connected();
    let before = session.state().clone();

    session.send_typing(3, true);
    session.send_section_focus(3);
    session.send_edit(3, "title", &serde_json::json!("Photosynthesis"), true);
    session.send_typing(3, false);

    assert_eq!(
        *log.borrow(),
        vec![
            "connect",
            "active_users",
            "typing 3 true",
            "focus 3",
            "edit 3 title \"Photosynthesis\" true",
            "typing 3 false",
        ]
    );
    assert_eq!(*session.state(), before, "intents are not reflected locally");
}

// =============================================================
// Disconnect and teardown
// =============================================================

#[test]
fn disconnect_keeps_last_known_view() {
    let (mut session, _log) = started();
    session.handle_connected();
    session.handle_message(
        r#"{"kind":"section_focus","userId":"u2","userName":"Bob","sectionIndex":0}"#,
    );

    session.handle_disconnected();

    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    assert_eq!(session.state().viewers.len(), 1);
    assert!(session.state().locked_sections.contains_key("0"));
}

#[test]
fn shutdown_disconnects_before_clearing_the_store() {
    let (mut session, log) = started();
    session.handle_connected();
    session.handle_message(
        r#"{"kind":"active_users","users":[{"userId":"u2","userName":"Bob"}]}"#,
    );

    // The reset notification lands in the same log as transport calls, so
    // the relative order of disconnect and reset is observable.
    let order = Rc::clone(&log);
    session.subscribe(move |state| {
        if state.viewers.is_empty() && state.current_user.is_none() {
            order.borrow_mut().push("store-reset".to_owned());
        }
    });

    session.shutdown();

    let calls = log.borrow();
    let disconnect_at = calls.iter().position(|c| c == "disconnect").expect("disconnect");
    let reset_at = calls.iter().position(|c| c == "store-reset").expect("reset");
    assert!(disconnect_at < reset_at, "must disconnect before reset");
    assert!(session.state().viewers.is_empty());
    assert!(session.state().current_user.is_none());
    assert!(session.state().locked_sections.is_empty());
}

#[test]
fn shutdown_is_safe_to_call_repeatedly() {
    let (mut session, log) = started();

    session.shutdown();
    session.shutdown();

    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    let disconnects = log.borrow().iter().filter(|c| *c == "disconnect").count();
    assert_eq!(disconnects, 2, "transport disconnect is idempotent by contract");
}

#[test]
fn messages_after_shutdown_apply_to_an_empty_store_only() {
    // The host is expected to stop delivering after disconnect; if one
    // straggler arrives anyway it must not resurrect the session view
    // beyond what that single envelope describes.
    let (mut session, _log) = started();
    session.shutdown();

    session.handle_message(r#"{"kind":"typing","userId":"u2","isTyping":true}"#);

    assert!(session.state().viewers.is_empty());
}

// =============================================================
// Subscriptions
// =============================================================

#[test]
fn subscribers_observe_reduced_state() {
    let (mut session, _log) = started();
    let counts = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&counts);
    session.subscribe(move |state| sink.borrow_mut().push(state.viewers.len()));

    session.handle_message(
        r#"{"kind":"active_users","users":[{"userId":"u2","userName":"Bob"}]}"#,
    );

    assert_eq!(*counts.borrow(), vec![1]);
}

#[test]
fn unsubscribe_through_session_stops_delivery() {
    let (mut session, _log) = started();
    let count = Rc::new(RefCell::new(0usize));
    let sink = Rc::clone(&count);
    let id = session.subscribe(move |_| *sink.borrow_mut() += 1);

    session.unsubscribe(id);
    session.handle_message(
        r#"{"kind":"active_users","users":[{"userId":"u2","userName":"Bob"}]}"#,
    );

    assert_eq!(*count.borrow(), 0);
}
