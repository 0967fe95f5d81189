//! The bridge core between the broker link and the client registry.
//!
//! - `queue`: the ingest queue handing messages across tasks.
//! - `dispatcher`: routes messages into the state store and broadcasts.
//! - `supervisor`: periodic reconnect with backoff.

pub mod backoff;
pub mod dispatcher;
pub mod queue;
pub mod supervisor;

pub use dispatcher::{Dispatcher, Update};
pub use queue::{IngestReceiver, IngestSender};
pub use supervisor::{ReconnectSchedule, ReconnectSupervisor};
