//! Shared building blocks for Yoriai, a collaborative to-do list.
//!
//! - `domain`: the room document (`SharedState`) and the pure rules applied to it
//! - `protocol`: WebSocket messages exchanged between the relay server and clients
//! - `time` / `logger`: ambient utilities used by both binaries

pub mod domain;
pub mod logger;
pub mod protocol;
pub mod time;
