//! Terminal front end of the client.

mod command;
mod formatter;
mod runner;
mod ui;

pub use command::{Command, CommandError, parse_command};
pub use formatter::RoomFormatter;
pub use runner::{ClientConfig, run_client};
