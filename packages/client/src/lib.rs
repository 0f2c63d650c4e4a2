//! Presence, live-edit and task client for Yoriai.
//!
//! [`session::TodoSession`] ties the pieces together: a [`store::DocumentStore`]
//! holding the room document, the [`identity`] of the local participant, the
//! [`presence`] manager with its heartbeat, the [`live_edit`] broadcaster and
//! the [`tasks`] mutator. The `cli` module is the terminal front end.

pub mod cli;
pub mod error;
pub mod events;
pub mod identity;
pub mod live_edit;
pub mod presence;
pub mod session;
pub mod storage;
pub mod store;
pub mod tasks;
