use super::settings::Settings;
use super::load_config;
use crate::utils::BridgeError;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn with_settings_dir<F: FnOnce()>(toml: Option<&str>, f: F) {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    if let Some(toml) = toml {
        fs::create_dir_all("config").expect("create config dir");
        fs::write("config/default.toml", toml).expect("write config file");
    }

    f();

    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.port, 8000);
    assert_eq!(settings.broker.port, 8883);
    assert!(settings.broker.use_tls);
    assert_eq!(settings.broker.topics.solar, "wattscope/sensor/solar");
    assert_eq!(settings.broker.topics.sensor, "wattscope/sensor");
    assert_eq!(settings.bridge.reconnect_interval_secs, 10);
    assert_eq!(settings.bridge.ingest_capacity, 1024);
}

#[test]
fn defaults_alone_are_rejected() {
    let err = Settings::default().validate().unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let toml = r#"
        log_level = "debug"

        [server]
        port = 9000

        [broker]
        host = "broker.example.com"
        username = "device"
        password = "secret"
        use_tls = false

        [broker.topics]
        gps = "fleet/gps"

        [bridge]
        ingest_capacity = 16
    "#;

    with_settings_dir(Some(toml), || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.broker.host, "broker.example.com");
        assert!(!cfg.broker.use_tls);
        assert_eq!(cfg.broker.topics.gps, "fleet/gps");
        assert_eq!(cfg.broker.topics.solar, "wattscope/sensor/solar");
        assert_eq!(cfg.bridge.ingest_capacity, 16);
        assert_eq!(cfg.log_level, "debug");
    });
}

#[test]
#[serial]
fn load_config_reads_environment() {
    with_settings_dir(None, || {
        temp_env::with_vars(
            [
                ("WATTBRIDGE__BROKER__HOST", Some("env-broker")),
                ("WATTBRIDGE__BROKER__USERNAME", Some("u")),
                ("WATTBRIDGE__BROKER__PASSWORD", Some("p")),
                ("WATTBRIDGE__BROKER__PORT", Some("1883")),
            ],
            || {
                let cfg = load_config().expect("load_config failed");
                assert_eq!(cfg.broker.host, "env-broker");
                assert_eq!(cfg.broker.port, 1883);
            },
        );
    });
}

#[test]
#[serial]
fn missing_credentials_fail_startup() {
    let toml = r#"
        [broker]
        host = "broker.example.com"
    "#;

    with_settings_dir(Some(toml), || {
        let err = load_config().unwrap_err();
        assert!(err.to_string().contains("username"));
    });
}
