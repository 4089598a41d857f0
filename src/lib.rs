//! # chat-client
//!
//! Browser-side realtime chat synchronization for server-rendered pages.
//!
//! The crate keeps one Socket.IO connection per page, binds it to the chat
//! widget exactly once per DOM instance (including after partial-page swaps),
//! renders a preloaded backlog once, and appends live messages as bubbles
//! while the send button tracks connection health.
//!
//! The core modules are plain Rust over the traits in [`dom`] and
//! [`connection`]; the `browser` feature adds the `web-sys` implementations,
//! the Socket.IO transport and the wasm entry points.

pub mod binder;
pub mod config;
pub mod connection;
pub mod dom;
pub mod history;
pub mod input;
pub mod message;
pub mod render;
pub mod transport;

#[cfg(feature = "browser")]
pub mod browser;

#[cfg(test)]
mod testing;
