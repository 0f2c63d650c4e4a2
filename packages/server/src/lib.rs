//! Room document relay for Yoriai.
//!
//! Hosts one versioned `SharedState` per room and relays accepted changes to
//! every WebSocket subscriber of that room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
