//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use yoriai_shared::{domain::Timestamp, time::Clock};

use crate::{
    domain::{MessagePusher, RoomRepository},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    usecase::{
        ConnectSubscriberUseCase, DisconnectSubscriberUseCase, GetRoomDetailUseCase,
        GetRoomsUseCase, SubmitDocumentUseCase, SweepPresenceUseCase,
    },
};

use super::{
    handler::{debug_room_state, get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Runtime settings of the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Presence records and live edits older than this are removed by the sweeper
    pub presence_expiry: Duration,
    pub sweep_interval: Duration,
    /// Put the onboarding tasks into newly created rooms
    pub seed_new_rooms: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            presence_expiry: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
            seed_new_rooms: true,
        }
    }
}

/// Room document relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::in_memory(ServerConfig::default(), Arc::new(SystemClock));
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    sweep_presence_usecase: Arc<SweepPresenceUseCase>,
    sweep_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl Server {
    pub fn new(
        state: AppState,
        sweep_presence_usecase: Arc<SweepPresenceUseCase>,
        sweep_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Arc::new(state),
            sweep_presence_usecase,
            sweep_interval,
            clock,
        }
    }

    /// Wire the in-memory repository and the WebSocket pusher into every use case.
    pub fn in_memory(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        // 1. Repository and MessagePusher
        let repository: Arc<dyn RoomRepository> =
            Arc::new(InMemoryRoomRepository::new(config.seed_new_rooms));
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

        // 2. UseCases
        let state = AppState {
            connect_subscriber_usecase: Arc::new(ConnectSubscriberUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            disconnect_subscriber_usecase: Arc::new(DisconnectSubscriberUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            submit_document_usecase: Arc::new(SubmitDocumentUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(repository.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(repository.clone())),
        };
        let sweep_presence_usecase = Arc::new(SweepPresenceUseCase::new(
            repository,
            message_pusher,
            config.presence_expiry,
        ));

        Self::new(state, sweep_presence_usecase, config.sweep_interval, clock)
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .route("/debug/rooms/{room_id}", get(debug_room_state))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to `host:port` and serve until Ctrl+C or SIGTERM.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Yoriai relay listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?room_id=<room>&client_id=<id>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let sweeper = self.spawn_sweeper();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        tracing::info!("Server shutdown complete");

        result.map_err(Into::into)
    }

    fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let usecase = self.sweep_presence_usecase.clone();
        let clock = self.clock.clone();
        let period = self.sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let changed = usecase.execute(Timestamp::new(clock.now_millis())).await;
                if changed > 0 {
                    tracing::debug!("Sweeper updated {} room(s)", changed);
                }
            }
        })
    }
}
