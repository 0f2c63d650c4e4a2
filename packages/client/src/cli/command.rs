//! Parsing of prompt input into commands.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(String),
    Leave,
    Add(String),
    /// Toggle completion of the task at a 1-based listing position.
    Done(usize),
    Edit(usize),
    Draft(String),
    Save,
    Cancel,
    Remove(usize),
    List,
    Who,
    Link,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type /help for the list of commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    MissingArgument(&'static str),

    #[error("'{0}' is not a task number")]
    InvalidNumber(String),
}

fn text_arg(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument(usage))
    } else {
        Ok(rest.to_string())
    }
}

fn number_arg(rest: &str, usage: &'static str) -> Result<usize, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument(usage));
    }
    match rest.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidNumber(rest.to_string())),
    }
}

/// Parse one trimmed, non-empty input line. Text without a leading `/` adds a task.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let Some(body) = line.strip_prefix('/') else {
        return Ok(Command::Add(line.to_string()));
    };
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    match name {
        "join" => text_arg(rest, "/join <name>").map(Command::Join),
        "leave" => Ok(Command::Leave),
        "add" => text_arg(rest, "/add <text>").map(Command::Add),
        "done" => number_arg(rest, "/done <n>").map(Command::Done),
        "edit" => number_arg(rest, "/edit <n>").map(Command::Edit),
        // An empty draft is allowed; saving it is refused later
        "draft" => Ok(Command::Draft(rest.to_string())),
        "save" => Ok(Command::Save),
        "cancel" => Ok(Command::Cancel),
        "rm" => number_arg(rest, "/rm <n>").map(Command::Remove),
        "list" | "ls" => Ok(Command::List),
        "who" => Ok(Command::Who),
        "link" => Ok(Command::Link),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(format!("/{}", other))),
    }
}
