use super::{Channel, Reading, StateStore};
use serde_json::{Value, json};
use std::thread;

fn reading(value: Value) -> Reading {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn test_defaults_before_any_data() {
    let store = StateStore::new();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.current_data.solar["voltage"], json!(0));
    assert_eq!(snapshot.current_data.turbine["power"], json!(0));
    assert_eq!(snapshot.current_data.gps["latitude"], json!(-7.2575));
    assert!(!snapshot.broker_connected);
}

#[test]
fn test_set_replaces_reading_wholesale() {
    let store = StateStore::new();
    store.set(Channel::Solar, reading(json!({"voltage": 12.1, "extra": true})));
    store.set(Channel::Solar, reading(json!({"voltage": 13.0})));

    let solar = store.get(Channel::Solar);
    assert_eq!(solar.len(), 1);
    assert_eq!(solar["voltage"], json!(13.0));
}

#[test]
fn test_set_many_touches_only_named_channels() {
    let store = StateStore::new();
    let gps_before = store.get(Channel::Gps);
    store.set_many(vec![(Channel::Turbine, reading(json!({"power": 3})))]);

    assert_eq!(store.get(Channel::Turbine)["power"], json!(3));
    assert_eq!(store.get(Channel::Solar), Channel::Solar.default_reading());
    assert_eq!(store.get(Channel::Gps), gps_before);
}

#[test]
fn test_snapshot_serializes_lowercase_channels() {
    let store = StateStore::new();
    store.set_broker_connected(true);
    let json = serde_json::to_value(store.snapshot()).unwrap();
    assert!(json["current_data"]["solar"].is_object());
    assert!(json["current_data"]["gps"].is_object());
    assert_eq!(json["broker_connected"], json!(true));
    assert_eq!(serde_json::to_value(Channel::Turbine).unwrap(), json!("turbine"));
}

#[test]
fn test_concurrent_readers_never_see_partial_readings() {
    let store = StateStore::new();
    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for i in 0..500 {
                store.set(Channel::Solar, reading(json!({"voltage": i, "ampere": i})));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let solar = store.get(Channel::Solar);
                    assert_eq!(solar["voltage"], solar["ampere"]);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}
