//! Shared helpers: the error taxonomy, logging setup and timestamps.

pub mod error;
pub mod logging;

pub use error::{BridgeError, Result};

use chrono::{SecondsFormat, Utc};
use tokio::sync::watch;

/// Current wall-clock time as an RFC 3339 string with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Resolves once the shutdown flag is set, or once its sender is gone.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        logging::init("info");
        logging::init("debug");
        logging::init("bogus");
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let ts = super::timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with('Z'));
    }
}
