//! In-memory current state: channels, readings and the shared snapshot.

pub mod channel;
pub mod store;

pub use channel::{Channel, Reading};
pub use store::{CurrentData, StateSnapshot, StateStore};

#[cfg(test)]
mod tests;
