use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tower_http::services::ServeDir;

use crate::controller::DataSourceController;
use crate::market::{MarketFeed, MarketSnapshot};
use crate::rpc::LedgerClient;
use crate::stats::equity_curve;
use crate::types::DashboardView;

const PUSH_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Clone, Serialize)]
pub struct DashboardUpdate {
    pub view: DashboardView,
    pub equity: Vec<(i64, f64)>,
    pub market: Option<MarketSnapshot>,
    pub uptime_secs: u64,
}

struct AppState<C> {
    controller: Arc<DataSourceController<C>>,
    market: watch::Receiver<Option<MarketSnapshot>>,
    tx: broadcast::Sender<String>,
    started: Instant,
}

impl<C: LedgerClient> AppState<C> {
    fn update(&self) -> DashboardUpdate {
        let view = self.controller.snapshot();
        DashboardUpdate {
            equity: equity_curve(&view.trades),
            view,
            market: self.market.borrow().clone(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

pub fn router<C: LedgerClient + 'static>(
    controller: Arc<DataSourceController<C>>,
    market: watch::Receiver<Option<MarketSnapshot>>,
) -> (Router, broadcast::Sender<String>) {
    let (tx, _) = broadcast::channel::<String>(256);
    let state = Arc::new(AppState {
        controller,
        market,
        tx: tx.clone(),
        started: Instant::now(),
    });

    let app = Router::new()
        .route("/ws", get(ws_handler::<C>))
        .route("/api/dashboard", get(dashboard_handler::<C>))
        .route("/api/toggle-demo", post(toggle_handler::<C>))
        .fallback_service(ServeDir::new("static"))
        .with_state(Arc::clone(&state));

    // Push loop
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PUSH_INTERVAL);
        loop {
            ticker.tick().await;
            if state.tx.receiver_count() == 0 {
                continue;
            }
            match serde_json::to_string(&state.update()) {
                Ok(json) => {
                    let _ = state.tx.send(json);
                }
                Err(e) => tracing::error!(error = %e, "failed to encode dashboard update"),
            }
        }
    });

    (app, tx)
}

pub async fn run<C: LedgerClient + 'static>(
    port: u16,
    controller: Arc<DataSourceController<C>>,
    feed: MarketFeed,
) -> Result<(), Box<dyn std::error::Error>> {
    let (app, _tx) = router(Arc::clone(&controller), feed.subscribe());

    tokio::spawn(async move { controller.mount().await });

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Dashboard at http://localhost:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    feed.stop();
    Ok(())
}

async fn dashboard_handler<C: LedgerClient + 'static>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<DashboardUpdate> {
    Json(state.update())
}

async fn toggle_handler<C: LedgerClient + 'static>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<DashboardView> {
    if state.controller.flip() {
        let controller = Arc::clone(&state.controller);
        tokio::spawn(async move { controller.refresh().await });
    }
    Json(state.controller.snapshot())
}

async fn ws_handler<C: LedgerClient + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<C>>>,
) -> impl IntoResponse {
    let rx = state.tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, state))
}

/// Pushes every update to the client; accepts `toggle` and `refresh`
/// commands back.
async fn handle_socket<C: LedgerClient + 'static>(
    socket: WebSocket,
    mut rx: broadcast::Receiver<String>,
    state: Arc<AppState<C>>,
) {
    let (mut sender, mut receiver) = socket.split();

    let mut push = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let mut commands = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let controller = Arc::clone(&state.controller);
            match text.as_str().trim() {
                "toggle" => {
                    tokio::spawn(async move { controller.toggle_demo().await });
                }
                "refresh" => {
                    tokio::spawn(async move { controller.refresh().await });
                }
                other => tracing::debug!(command = other, "ignoring unknown ws command"),
            }
        }
    });

    tokio::select! {
        _ = &mut push => commands.abort(),
        _ = &mut commands => push.abort(),
    }
}
