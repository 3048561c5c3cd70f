use frames::{Geometry, Point, Rgb, Style};
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use super::*;

// =============================================================================
// helpers
// =============================================================================

struct Peer {
    user: User,
    conn: Conn,
    rx: mpsc::Receiver<ServerEvent>,
}

fn peer(id: &str, name: &str) -> Peer {
    let (tx, rx) = mpsc::channel(16);
    Peer {
        user: User { id: id.into(), display_name: name.into(), color: Rgb::new(1, 2, 3) },
        conn: Conn { client_id: Uuid::new_v4(), tx },
        rx,
    }
}

fn rect(id: &str, x: f64) -> Shape {
    Shape {
        id: id.into(),
        geometry: Geometry::Rectangle { start: Point::new(0.0, 0.0), end: Point::new(x, x) },
        style: Style::default(),
        owner_id: "a".into(),
    }
}

fn create(reg: &mut Registry, room: &str, p: &Peer) -> Vec<ServerEvent> {
    reg.create_room(room, p.user.clone(), p.conn.clone())
}

fn join(reg: &mut Registry, room: &str, p: &Peer) -> Result<Vec<ServerEvent>, RegistryError> {
    reg.join_room(room, p.user.clone(), p.conn.clone())
}

async fn recv(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("relay receive timed out")
        .expect("relay channel closed")
}

fn assert_quiet(rx: &mut mpsc::Receiver<ServerEvent>) {
    assert!(rx.try_recv().is_err(), "expected no relayed event");
}

fn names(users: &[User]) -> Vec<&str> {
    users.iter().map(|u| u.display_name.as_str()).collect()
}

// =============================================================================
// create / join
// =============================================================================

#[test]
fn create_replies_room_joined_only() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");

    let reply = create(&mut reg, "r1", &a);

    assert_eq!(reply, vec![ServerEvent::RoomJoined { room_id: "r1".into(), users: vec![a.user.clone()] }]);
    assert!(reg.contains("r1"));
    assert_eq!(reg.snapshot("r1"), Some(Vec::new()));
}

#[test]
fn join_unknown_room_is_not_found() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");

    let err = join(&mut reg, "nope", &a).unwrap_err();

    assert!(matches!(err, RegistryError::RoomNotFound(ref id) if id == "nope"));
    assert_eq!(err.error_code(), "E_ROOM_NOT_FOUND");
    assert!(!reg.contains("nope"), "failed join must not create a room");
}

#[tokio::test]
async fn join_replies_snapshot_and_notifies_others() {
    let mut reg = Registry::new();
    let mut a = peer("a", "alice");
    let b = peer("b", "bob");
    create(&mut reg, "r1", &a);
    reg.record_shape("r1", rect("s1", 5.0), a.conn.client_id).unwrap();

    let reply = join(&mut reg, "r1", &b).unwrap();

    assert_eq!(reply.len(), 2);
    let ServerEvent::RoomJoined { room_id, users } = &reply[0] else {
        panic!("expected roomJoined first, got {:?}", reply[0]);
    };
    assert_eq!(room_id, "r1");
    assert_eq!(names(users), ["alice", "bob"]);
    assert_eq!(reply[1], ServerEvent::InitialShapes(vec![rect("s1", 5.0)]));

    let ServerEvent::UserJoined { user, users } = recv(&mut a.rx).await else {
        panic!("expected userJoined");
    };
    assert_eq!(user.id, "b");
    assert_eq!(users.len(), 2);
}

#[test]
fn create_on_live_room_behaves_as_join() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let b = peer("b", "bob");
    create(&mut reg, "r1", &a);
    reg.record_shape("r1", rect("s1", 1.0), a.conn.client_id).unwrap();

    let reply = create(&mut reg, "r1", &b);

    assert_eq!(reply.len(), 2);
    assert_eq!(reply[1], ServerEvent::InitialShapes(vec![rect("s1", 1.0)]));
    assert_eq!(reg.snapshot("r1").unwrap().len(), 1, "existing log must survive");
}

#[test]
fn users_are_sorted_by_name_then_id() {
    let mut reg = Registry::new();
    let z = peer("z", "zed");
    let a2 = peer("a2", "amy");
    let a1 = peer("a1", "amy");
    create(&mut reg, "r1", &z);
    join(&mut reg, "r1", &a2).unwrap();
    join(&mut reg, "r1", &a1).unwrap();

    let detail = reg.detail("r1").unwrap();

    let ids: Vec<&str> = detail.users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["a1", "a2", "z"]);
}

// =============================================================================
// shapes
// =============================================================================

#[tokio::test]
async fn draw_then_update_leaves_one_amended_entry() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let mut b = peer("b", "bob");
    create(&mut reg, "r1", &a);
    join(&mut reg, "r1", &b).unwrap();

    reg.record_shape("r1", rect("s1", 1.0), a.conn.client_id).unwrap();
    reg.amend_shape("r1", rect("s1", 9.0), a.conn.client_id).unwrap();

    assert_eq!(reg.snapshot("r1").unwrap(), vec![rect("s1", 9.0)]);
    assert_eq!(recv(&mut b.rx).await, ServerEvent::DrawShape(rect("s1", 1.0)));
    assert_eq!(recv(&mut b.rx).await, ServerEvent::UpdateShape(rect("s1", 9.0)));
}

#[test]
fn repeated_draw_overwrites_in_place() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    create(&mut reg, "r1", &a);
    reg.record_shape("r1", rect("s1", 1.0), a.conn.client_id).unwrap();
    reg.record_shape("r1", rect("s2", 2.0), a.conn.client_id).unwrap();

    reg.record_shape("r1", rect("s1", 3.0), a.conn.client_id).unwrap();

    assert_eq!(reg.snapshot("r1").unwrap(), vec![rect("s1", 3.0), rect("s2", 2.0)]);
}

#[test]
fn amend_unknown_shape_is_not_relayed() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let mut b = peer("b", "bob");
    create(&mut reg, "r1", &a);
    join(&mut reg, "r1", &b).unwrap();

    let err = reg.amend_shape("r1", rect("ghost", 1.0), a.conn.client_id).unwrap_err();

    assert!(matches!(err, RegistryError::UnknownShape(ref id) if id == "ghost"));
    assert!(reg.snapshot("r1").unwrap().is_empty());
    assert_quiet(&mut b.rx);
}

#[test]
fn sender_never_receives_own_relay() {
    let mut reg = Registry::new();
    let mut a = peer("a", "alice");
    create(&mut reg, "r1", &a);

    reg.record_shape("r1", rect("s1", 1.0), a.conn.client_id).unwrap();
    reg.amend_shape("r1", rect("s1", 2.0), a.conn.client_id).unwrap();
    reg.clear_room("r1", a.conn.client_id).unwrap();

    assert_quiet(&mut a.rx);
}

#[test]
fn shape_ops_on_missing_room_fail_without_creating_it() {
    let mut reg = Registry::new();
    let id = Uuid::new_v4();

    assert!(matches!(reg.record_shape("r9", rect("s", 1.0), id), Err(RegistryError::RoomNotFound(_))));
    assert!(matches!(reg.amend_shape("r9", rect("s", 1.0), id), Err(RegistryError::RoomNotFound(_))));
    assert!(matches!(reg.clear_room("r9", id), Err(RegistryError::RoomNotFound(_))));
    assert!(reg.room_ids().is_empty());
}

#[test]
fn non_member_cannot_mutate_room() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    create(&mut reg, "r1", &a);

    let err = reg.record_shape("r1", rect("s1", 1.0), Uuid::new_v4()).unwrap_err();

    assert!(matches!(err, RegistryError::NotJoined(_)));
    assert!(reg.snapshot("r1").unwrap().is_empty());
}

#[tokio::test]
async fn clear_empties_log_and_notifies_others() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let mut b = peer("b", "bob");
    create(&mut reg, "r1", &a);
    join(&mut reg, "r1", &b).unwrap();
    reg.record_shape("r1", rect("s1", 1.0), a.conn.client_id).unwrap();
    recv(&mut b.rx).await;

    reg.clear_room("r1", a.conn.client_id).unwrap();

    assert!(reg.snapshot("r1").unwrap().is_empty());
    assert_eq!(recv(&mut b.rx).await, ServerEvent::ClearCanvas);
}

#[test]
fn full_outbox_drops_event_for_that_member_only() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let (tx, mut rx) = mpsc::channel(1);
    let slow = User { id: "s".into(), display_name: "slow".into(), color: Rgb::BLACK };
    create(&mut reg, "r1", &a);
    reg.join_room("r1", slow, Conn { client_id: Uuid::new_v4(), tx }).unwrap();

    reg.record_shape("r1", rect("s1", 1.0), a.conn.client_id).unwrap();
    reg.record_shape("r1", rect("s2", 2.0), a.conn.client_id).unwrap();

    assert_eq!(rx.try_recv().unwrap(), ServerEvent::DrawShape(rect("s1", 1.0)));
    assert!(rx.try_recv().is_err());
    assert_eq!(reg.snapshot("r1").unwrap().len(), 2, "log is unaffected by relay loss");
}

// =============================================================================
// leave
// =============================================================================

#[tokio::test]
async fn leave_notifies_remaining_and_last_leave_deletes_room() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let mut b = peer("b", "bob");
    create(&mut reg, "r1", &a);
    join(&mut reg, "r1", &b).unwrap();

    assert!(reg.leave("r1", "a", a.conn.client_id));

    let ServerEvent::UserLeft { user_id, users } = recv(&mut b.rx).await else {
        panic!("expected userLeft");
    };
    assert_eq!(user_id, "a");
    assert_eq!(names(&users), ["bob"]);
    assert!(reg.contains("r1"));

    assert!(reg.leave("r1", "b", b.conn.client_id));
    assert!(!reg.contains("r1"));
    assert!(reg.summaries().is_empty());
}

#[test]
fn room_is_gone_after_last_leave_so_join_fails() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let b = peer("b", "bob");
    create(&mut reg, "r1", &a);
    reg.record_shape("r1", rect("s1", 1.0), a.conn.client_id).unwrap();
    reg.leave("r1", "a", a.conn.client_id);

    assert!(matches!(join(&mut reg, "r1", &b), Err(RegistryError::RoomNotFound(_))));

    create(&mut reg, "r1", &b);
    assert_eq!(reg.snapshot("r1"), Some(Vec::new()), "recreated room starts empty");
}

#[test]
fn stale_connection_cannot_evict_reconnected_user() {
    let mut reg = Registry::new();
    let old = peer("a", "alice");
    let new = peer("a", "alice");
    create(&mut reg, "r1", &old);
    join(&mut reg, "r1", &new).unwrap();

    assert!(!reg.leave("r1", "a", old.conn.client_id));

    assert!(reg.contains("r1"));
    assert_eq!(reg.detail("r1").unwrap().users.len(), 1);
    assert!(reg.leave("r1", "a", new.conn.client_id));
    assert!(!reg.contains("r1"));
}

#[test]
fn leave_unknown_room_or_user_is_noop() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    create(&mut reg, "r1", &a);

    assert!(!reg.leave("r2", "a", a.conn.client_id));
    assert!(!reg.leave("r1", "nobody", a.conn.client_id));
    assert!(reg.contains("r1"));
}

// =============================================================================
// queries
// =============================================================================

#[test]
fn summaries_are_sorted_and_counted() {
    let mut reg = Registry::new();
    let a = peer("a", "alice");
    let b = peer("b", "bob");
    create(&mut reg, "zeta", &a);
    create(&mut reg, "alpha", &b);
    reg.record_shape("zeta", rect("s1", 1.0), a.conn.client_id).unwrap();

    assert_eq!(reg.room_ids(), ["alpha", "zeta"]);
    assert_eq!(
        reg.summaries(),
        vec![
            RoomSummary { room_id: "alpha".into(), member_count: 1, shape_count: 0 },
            RoomSummary { room_id: "zeta".into(), member_count: 1, shape_count: 1 },
        ]
    );
    assert!(reg.detail("missing").is_none());
}
