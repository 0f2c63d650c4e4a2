//! Two clients collaborating through an in-process relay.

use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, sync::oneshot};
use yoriai_client::{
    error::{LiveEditError, MutationError, SessionError, StoreError},
    identity::Identity,
    session::{SessionConfig, TodoSession},
    storage::MemoryStorage,
    store::{DocumentStore, ReconnectPolicy, WebSocketDocumentStore},
};
use yoriai_server::ui::{Server, ServerConfig};
use yoriai_shared::{
    domain::{ParticipantId, RoomId, SharedState, TaskError, TaskId},
    time::SystemClock,
};

/// Helper struct to manage the in-process server lifecycle
struct TestServer {
    ws_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let (tx, rx) = oneshot::channel::<()>();

        let config = ServerConfig {
            sweep_interval: Duration::from_secs(3600),
            ..ServerConfig::default()
        };
        let server = Server::in_memory(config, Arc::new(SystemClock));
        tokio::spawn(async move {
            let _ = server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            ws_url: format!("ws://{}/ws", addr),
            shutdown: Some(tx),
        }
    }

    async fn store(&self, room: &str, participant: &str) -> Result<WebSocketDocumentStore, StoreError> {
        WebSocketDocumentStore::connect(
            &self.ws_url,
            &RoomId::new(room.to_string()).unwrap(),
            &ParticipantId::new(participant.to_string()).unwrap(),
            ReconnectPolicy::default(),
        )
        .await
    }

    async fn session(&self, room: &str, participant: &str) -> TodoSession {
        let store = self.store(room, participant).await.unwrap();
        TodoSession::new(
            Identity {
                room_id: RoomId::new(room.to_string()).unwrap(),
                participant_id: ParticipantId::new(participant.to_string()).unwrap(),
            },
            Arc::new(store),
            Arc::new(MemoryStorage::new()),
            Arc::new(SystemClock),
            SessionConfig::default(),
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Poll `condition` until it holds, failing the test after 5 seconds.
async fn eventually<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

fn has_task(session: &TodoSession, id: &TaskId) -> bool {
    session.snapshot().state.task(id).is_some()
}

async fn add_many(session: &TodoSession, who: &str) {
    for i in 0..5 {
        session
            .add_task(&format!("{} task {}", who, i))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_tasks_are_shared_and_owner_only() {
    // テスト項目: タスクは両者に共有され、他人のタスクは編集も削除もできない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.session("room1", "user_a").await;
    let mut bob = server.session("room1", "user_b").await;
    alice.join("Alice").await.unwrap();
    bob.join("Bob").await.unwrap();

    // when (操作): Alice のタスクが Bob に届き、Bob は編集できない
    let milk = alice.add_task("Buy milk").await.unwrap();
    eventually("Bob to see Alice's task", || has_task(&bob, &milk)).await;
    let bob_edit = bob.start_edit(&milk).await;

    // then (期待する結果):
    assert!(matches!(
        bob_edit,
        Err(SessionError::LiveEdit(LiveEditError::Task(
            TaskError::NotAuthorized { .. }
        )))
    ));

    // when (操作): Bob のタスクが Alice に届き、Alice は自分のタスクだけ消せる
    let dog = bob.add_task("Walk dog").await.unwrap();
    eventually("Alice to see Bob's task", || has_task(&alice, &dog)).await;
    alice.delete_task(&milk).await.unwrap();
    let alice_delete = alice.delete_task(&dog).await;
    eventually("Bob to see the deletion", || !has_task(&bob, &milk)).await;

    // then (期待する結果):
    assert!(matches!(
        alice_delete,
        Err(SessionError::Mutation(MutationError::Task(
            TaskError::NotAuthorized { .. }
        )))
    ));
    assert!(has_task(&alice, &dog));
    assert!(has_task(&bob, &dog));
    eventually("both to converge", || alice.snapshot() == bob.snapshot()).await;
}

#[tokio::test]
async fn test_presence_and_ghost_text_are_visible_to_others() {
    // テスト項目: 参加者一覧と編集中の下書きが相手に見え、退室で消える
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.session("room2", "user_a").await;
    let mut bob = server.session("room2", "user_b").await;
    alice.join("Alice").await.unwrap();
    bob.join("Bob").await.unwrap();
    eventually("Alice to see Bob", || alice.roster().len() == 2).await;

    // when (操作):
    let milk = alice.add_task("Buy milk").await.unwrap();
    alice.start_edit(&milk).await.unwrap();
    alice.push_edit("Buy oat milk").unwrap();
    eventually("Bob to see the ghost text", || {
        bob.ghosts(&milk)
            .first()
            .is_some_and(|ghost| ghost.text == "Buy oat milk" && ghost.name == "Alice")
    })
    .await;
    alice.commit_edit().await.unwrap();
    alice.leave().await.unwrap();

    // then (期待する結果):
    eventually("Bob to see Alice leave", || bob.roster().len() == 1).await;
    let state = bob.snapshot().state;
    assert_eq!(state.task(&milk).unwrap().text, "Buy oat milk");
    assert!(state.live.edits.is_empty());
    assert_eq!(bob.presence_view().others.len(), 0);
}

#[tokio::test]
async fn test_server_refuses_foreign_changes_sent_directly() {
    // テスト項目: クライアント側の確認を迂回した他人のタスク削除はサーバーに拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.session("room3", "user_a").await;
    alice.join("Alice").await.unwrap();
    let milk = alice.add_task("Buy milk").await.unwrap();
    let mallory = server.store("room3", "user_m").await.unwrap();
    eventually("Mallory to see the task", || {
        mallory.read().state.task(&milk).is_some()
    })
    .await;

    // when (操作):
    let target = milk.clone();
    let result = mallory
        .submit(Box::new(move |state: &SharedState| {
            let tasks = state.tasks.iter().filter(|t| t.id != target).cloned().collect();
            state.with_tasks(tasks)
        }))
        .await;

    // then (期待する結果):
    assert!(matches!(result, Err(StoreError::Rejected(_))));
    assert!(has_task(&alice, &milk));
}

#[tokio::test]
async fn test_concurrent_additions_are_all_kept() {
    // テスト項目: 同時に追加しても競合は再試行され、どの追加も失われない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.session("room4", "user_a").await;
    let mut bob = server.session("room4", "user_b").await;
    alice.join("Alice").await.unwrap();
    bob.join("Bob").await.unwrap();

    // when (操作):
    tokio::join!(add_many(&alice, "Alice"), add_many(&bob, "Bob"));

    // then (期待する結果):
    eventually("both to converge", || {
        alice.snapshot().version == bob.snapshot().version
    })
    .await;
    let state = alice.snapshot().state;
    assert_eq!(state.tasks.len(), 2 + 10);
    assert_eq!(state, bob.snapshot().state);
}

#[tokio::test]
async fn test_second_connection_with_same_id_is_refused() {
    // テスト項目: 同じ参加者 ID での二重接続は拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let _first = server.store("room5", "user_a").await.unwrap();

    // when (操作):
    let second = server.store("room5", "user_a").await;

    // then (期待する結果):
    assert!(matches!(second, Err(StoreError::AlreadyConnected)));
}

#[tokio::test]
async fn test_closed_store_refuses_submissions() {
    // テスト項目: close 後の提出は Closed で失敗し、同じ ID で再接続できる
    // given (前提条件):
    let server = TestServer::start().await;
    let store = server.store("room6", "user_a").await.unwrap();

    // when (操作):
    store.close();
    let result = store.submit(Box::new(|state: &SharedState| state.clone())).await;

    // then (期待する結果):
    assert_eq!(result, Err(StoreError::Closed));
    assert!(!store.is_connected());
    let mut reconnected = None;
    for _ in 0..50 {
        match server.store("room6", "user_a").await {
            Ok(store) => {
                reconnected = Some(store);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    assert!(reconnected.is_some());
}
