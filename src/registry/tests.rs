use super::{ClientHandle, ConnectionRegistry};
use crate::state::{Channel, StateStore};
use crate::transport::message::ServerMessage;
use serde_json::json;
use tokio::sync::mpsc::Receiver;
use axum::extract::ws::Message as WsMessage;

fn decode(msg: WsMessage) -> ServerMessage {
    match msg {
        WsMessage::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("Expected a text message, got {other:?}"),
    }
}

fn registry() -> (ConnectionRegistry, StateStore) {
    let store = StateStore::new();
    (ConnectionRegistry::new(store.clone()), store)
}

fn gps_envelope() -> ServerMessage {
    let gps = Channel::Gps.default_reading();
    ServerMessage::gps_update(gps)
}

#[test]
fn test_client_handles_get_unique_ids() {
    let (a, _rx_a) = ClientHandle::channel(4);
    let (b, _rx_b) = ClientHandle::channel(4);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_register_sends_welcome_with_current_snapshot() {
    let (registry, store) = registry();
    let reading = match json!({"voltage": 5.0}) {
        serde_json::Value::Object(m) => m,
        _ => unreachable!(),
    };
    store.set(Channel::Solar, reading.clone());
    store.set_broker_connected(true);

    let (handle, mut rx) = ClientHandle::channel(4);
    registry.register(handle).unwrap();

    match decode(rx.try_recv().unwrap()) {
        ServerMessage::Connection {
            current_data,
            mqtt_connected,
            status,
            ..
        } => {
            assert_eq!(status, "connected");
            assert_eq!(current_data.solar, reading);
            assert!(mqtt_connected);
        }
        other => panic!("Expected welcome, got {other:?}"),
    }
    assert!(rx.try_recv().is_err(), "exactly one welcome");
}

#[test]
fn test_welcome_precedes_broadcast() {
    let (registry, _) = registry();
    let (handle, mut rx) = ClientHandle::channel(4);
    registry.register(handle).unwrap();
    registry.broadcast(&gps_envelope());

    assert!(matches!(
        decode(rx.try_recv().unwrap()),
        ServerMessage::Connection { .. }
    ));
    assert!(matches!(
        decode(rx.try_recv().unwrap()),
        ServerMessage::GpsData { .. }
    ));
}

#[test]
fn test_register_with_closed_outbox_is_rejected() {
    let (registry, _) = registry();
    let (handle, rx) = ClientHandle::channel(4);
    drop(rx);
    assert!(registry.register(handle).is_err());
    assert!(registry.is_empty());
}

#[test]
fn test_broadcast_isolates_failing_client() {
    let (registry, _) = registry();
    let mut receivers: Vec<Option<Receiver<WsMessage>>> = Vec::new();
    let mut ids = Vec::new();
    for _ in 0..5 {
        let (handle, rx) = ClientHandle::channel(4);
        ids.push(handle.id);
        registry.register(handle).unwrap();
        receivers.push(Some(rx));
    }

    // client 2 goes away
    receivers[2] = None;

    let delivered = registry.broadcast(&gps_envelope());
    assert_eq!(delivered, 4);
    assert_eq!(registry.len(), 4);
    assert!(!registry.contains(&ids[2]));

    for rx in receivers.iter_mut().flatten() {
        let _welcome = rx.try_recv().unwrap();
        assert!(matches!(
            decode(rx.try_recv().unwrap()),
            ServerMessage::GpsData { .. }
        ));
    }
}

#[test]
fn test_broadcast_drops_client_with_full_outbox() {
    let (registry, _) = registry();
    let (slow, _slow_rx) = ClientHandle::channel(1);
    let slow_id = slow.id;
    registry.register(slow).unwrap(); // welcome fills the outbox
    let (fast, mut fast_rx) = ClientHandle::channel(8);
    registry.register(fast).unwrap();

    assert_eq!(registry.broadcast(&gps_envelope()), 1);
    assert!(!registry.contains(&slow_id));
    let _welcome = fast_rx.try_recv().unwrap();
    assert!(fast_rx.try_recv().is_ok());
}

#[test]
fn test_unregister_is_idempotent() {
    let (registry, _) = registry();
    let (handle, _rx) = ClientHandle::channel(4);
    let id = handle.id;
    let (other, _other_rx) = ClientHandle::channel(4);
    registry.register(handle).unwrap();
    registry.register(other).unwrap();

    assert!(registry.unregister(&id));
    assert_eq!(registry.len(), 1);
    assert!(!registry.unregister(&id));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_close_all_closes_outboxes() {
    let (registry, _) = registry();
    let (handle, mut rx) = ClientHandle::channel(4);
    registry.register(handle).unwrap();

    assert_eq!(registry.close_all(), 1);
    assert!(registry.is_empty());
    let _welcome = rx.try_recv().unwrap();
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
    ));
}

#[tokio::test]
async fn test_concurrent_register_and_broadcast() {
    let (registry, _) = registry();
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let (handle, rx) = ClientHandle::channel(64);
            let id = handle.id;
            registry.register(handle).unwrap();
            registry.broadcast(&gps_envelope());
            registry.unregister(&id);
            registry.unregister(&id);
            drop(rx);
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert!(registry.is_empty());
}

#[test]
fn test_reply_path_closes_with_registration() {
    let (registry, _) = registry();
    let (handle, mut rx) = ClientHandle::channel(4);
    let id = handle.id;
    let replies = handle.downgrade();
    registry.register(handle).unwrap();

    replies.send_json(&ServerMessage::pong(None)).unwrap();
    assert!(registry.unregister(&id));
    assert!(replies.send_json(&ServerMessage::pong(None)).is_err());

    assert!(matches!(decode(rx.try_recv().unwrap()), ServerMessage::Connection { .. }));
    assert!(matches!(decode(rx.try_recv().unwrap()), ServerMessage::Pong { .. }));
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
    ));
}
