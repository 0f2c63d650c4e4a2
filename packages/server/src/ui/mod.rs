//! UI 層: axum のルーターとハンドラ

pub mod dto;
pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::{Server, ServerConfig};
