//! The registry of live WebSocket clients and best-effort fan-out.

pub mod client;
pub mod engine;

pub use client::{ClientHandle, ClientId, ReplyHandle};
pub use engine::ConnectionRegistry;

#[cfg(test)]
mod tests;
