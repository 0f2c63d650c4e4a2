//! Interactive client loop.

use std::{path::PathBuf, sync::Arc, time::Duration};

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::{sync::mpsc, task::JoinHandle};
use yoriai_shared::{
    domain::{ParticipantId, TaskId, Timestamp},
    time::{Clock, SystemClock},
};

use crate::{
    error::{ClientError, SessionError, StoreError},
    events::diff_events,
    identity::IdentityResolver,
    session::{SessionConfig, TodoSession},
    storage::{FileStorage, KeyValueStorage},
    store::{DocumentStore, ReconnectPolicy, WebSocketDocumentStore},
};

use super::{
    command::{Command, parse_command},
    formatter::{HELP, RoomFormatter},
    ui::redisplay_prompt,
};

/// Client settings taken from the command line
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the relay, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    /// Room to enter; a new one is created when absent
    pub room: Option<String>,
    /// Join right away under this name
    pub name: Option<String>,
    /// Directory of the local key-value storage
    pub data_dir: PathBuf,
}

/// Base of the shareable room link for a relay endpoint.
fn link_base(ws_url: &str) -> String {
    let http = if let Some(rest) = ws_url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = ws_url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        ws_url.to_string()
    };
    match http.strip_suffix("/ws") {
        Some(base) => format!("{}/", base),
        None => http,
    }
}

/// Run the terminal client until `/quit`, Ctrl+C or Ctrl+D
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&config.data_dir)?);
    let identity = IdentityResolver::new(storage.clone()).resolve(config.room.as_deref())?;

    tracing::info!(
        "Connecting to {} (room '{}') as '{}'",
        config.url,
        identity.room_id,
        identity.participant_id
    );
    let store = WebSocketDocumentStore::connect(
        &config.url,
        &identity.room_id,
        &identity.participant_id,
        ReconnectPolicy::default(),
    )
    .await
    .map_err(|e| match e {
        StoreError::AlreadyConnected => {
            ClientError::DuplicateClientId(identity.participant_id.to_string())
        }
        other => ClientError::ConnectionError(other.to_string()),
    })?;
    let store = Arc::new(store);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let link_base = link_base(&config.url);
    let prompt = format!("{}> ", identity.room_id);
    let local_id = identity.participant_id.clone();
    let mut session = TodoSession::new(
        identity,
        store.clone(),
        storage,
        clock.clone(),
        SessionConfig::default(),
    );

    println!(
        "\nConnected to room '{}'. Type /help for commands, /quit to exit.",
        session.identity().room_id
    );
    let joined = match &config.name {
        Some(name) => session.join(name).await.map(Some),
        None => session.restore().await,
    };
    match joined {
        Ok(Some(me)) => println!(
            "Joined as {}. Share this room: {}",
            me.name,
            session.identity().join_link(&link_base)
        ),
        Ok(None) => println!("Type /join <name> to join the room."),
        Err(e) => println!("Could not join: {}", e),
    }
    print!(
        "{}",
        RoomFormatter::format_task_list(
            &session.snapshot().state,
            &local_id,
            Timestamp::new(clock.now_millis())
        )
    );

    let watcher = spawn_watcher(store.clone(), clock.clone(), local_id, prompt.clone());

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let prompt_for_readline = prompt.clone();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt_for_readline) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    while let Some(line) = input_rx.recv().await {
        let command = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        match execute(&mut session, command, &link_base, clock.as_ref()).await {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(e) => println!("Error: {}", e),
        }
    }

    watcher.abort();
    if session.is_joined()
        && let Err(e) = session.leave().await
    {
        tracing::warn!("Failed to leave the room: {}", e);
    }
    store.close();
    Ok(())
}

fn task_number(session: &TodoSession, number: usize) -> Result<TaskId, String> {
    session
        .task_at(number)
        .ok_or_else(|| format!("There is no task {}. Type /list to see the numbers.", number))
}

/// Run one command. Changes to the room are reported by the watcher.
async fn execute(
    session: &mut TodoSession,
    command: Command,
    link_base: &str,
    clock: &dyn Clock,
) -> Result<Option<String>, SessionError> {
    let output = match command {
        Command::Join(name) => {
            let me = session.join(&name).await?;
            Some(format!(
                "Joined as {}. Share this room: {}",
                me.name,
                session.identity().join_link(link_base)
            ))
        }
        Command::Leave => {
            session.leave().await?;
            Some("You left the room.".to_string())
        }
        Command::Add(text) => {
            session.add_task(&text).await?;
            None
        }
        Command::Done(number) => match task_number(session, number) {
            Ok(id) => {
                session.toggle_task(&id).await?;
                None
            }
            Err(message) => Some(message),
        },
        Command::Edit(number) => match task_number(session, number) {
            Ok(id) => {
                let draft = session.start_edit(&id).await?;
                Some(format!(
                    "Editing \"{}\". Use /draft <text>, then /save or /cancel.",
                    draft.text
                ))
            }
            Err(message) => Some(message),
        },
        Command::Draft(text) => {
            session.push_edit(&text)?;
            None
        }
        Command::Save => {
            session.commit_edit().await?;
            None
        }
        Command::Cancel => {
            session.cancel_edit().await?;
            Some("Edit discarded.".to_string())
        }
        Command::Remove(number) => match task_number(session, number) {
            Ok(id) => {
                session.delete_task(&id).await?;
                None
            }
            Err(message) => Some(message),
        },
        Command::List => Some(RoomFormatter::format_task_list(
            &session.snapshot().state,
            &session.identity().participant_id,
            Timestamp::new(clock.now_millis()),
        )),
        Command::Who => Some(RoomFormatter::format_roster(&session.presence_view())),
        Command::Link => Some(session.identity().join_link(link_base)),
        Command::Help => Some(HELP.to_string()),
        Command::Quit => None,
    };
    Ok(output)
}

/// Spawns a task printing room events, typing indicators and connectivity changes.
fn spawn_watcher(
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    local: ParticipantId,
    prompt: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut snapshots = store.subscribe();
        let mut connection = store.watch_connection();
        let mut last = snapshots.borrow().clone();
        let mut typing: Vec<String> = Vec::new();
        // Expires typing indicators of editors that went quiet
        let mut ticker = tokio::time::interval(Duration::from_secs(1));

        loop {
            let mut output = String::new();
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = snapshots.borrow_and_update().clone();
                    for event in diff_events(&last.state, &next.state) {
                        output.push_str(&RoomFormatter::format_event(&event));
                    }
                    last = next;
                }
                changed = connection.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *connection.borrow_and_update();
                    output.push_str(&RoomFormatter::format_connection(state));
                    output.push('\n');
                }
                _ = ticker.tick() => {}
            }

            let now = Timestamp::new(clock.now_millis());
            let current = RoomFormatter::typing_indicators(&last.state, &local, now);
            if current != typing {
                for line in &current {
                    output.push_str(&format!("~ {}\n", line));
                }
                typing = current;
            }

            if !output.is_empty() {
                print!("\n{}", output);
                redisplay_prompt(&prompt);
            }
        }
    })
}
