//! HTTP surface: the viewer WebSocket, the current-picture endpoint, and
//! static files.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::sync::broadcast::error::RecvError;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, info};

use frunch_core::defaults::IMAGE_URL_PREFIX;
use frunch_core::{DisplayPicture, PictureBus, ViewerEvent};
use frunch_jobs::PictureScheduler;

/// Interval between keep-alive pings on viewer sockets.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<PictureScheduler>,
    pub bus: PictureBus,
    ws_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(scheduler: Arc<PictureScheduler>, bus: PictureBus) -> Self {
        Self {
            scheduler,
            bus,
            ws_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of open viewer sockets.
    pub fn viewer_count(&self) -> usize {
        self.ws_connections.load(Ordering::Relaxed)
    }
}

/// Build the application router.
pub fn router(state: AppState, public_dir: &Path, image_cache_dir: &Path) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/v1/picture", get(current_picture))
        .nest_service(IMAGE_URL_PREFIX, ServeDir::new(image_cache_dir))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS]),
        )
        .with_state(state)
}

enum ApiError {
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// The picture currently on screen.
async fn current_picture(
    State(state): State<AppState>,
) -> Result<Json<DisplayPicture>, ApiError> {
    state
        .scheduler
        .current()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No picture is showing yet".to_string()))
}

/// Viewer socket.
///
/// On join the viewer receives the current picture, then every new picture
/// as it is published. Frames are JSON-encoded [`ViewerEvent`]s.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    use futures::{SinkExt, StreamExt};

    let count = state.ws_connections.fetch_add(1, Ordering::Relaxed) + 1;
    info!(active = count, "Viewer connected");

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before reading the current picture so nothing published in
    // between is missed.
    let mut event_rx = state.bus.subscribe();
    let current = state.scheduler.current().await;

    let mut joined_id = current.as_ref().map(|p| p.id.clone());

    let mut send_task = tokio::spawn(async move {
        if let Some(picture) = current {
            let event = ViewerEvent::NewPicture { picture };
            if let Ok(json) = serde_json::to_string(&event) {
                if sender.send(Message::Text(json)).await.is_err() {
                    return;
                }
            }
        }

        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        // The first tick completes immediately.
        ping_interval.tick().await;
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Ok(evt) => {
                            if is_join_echo(&mut joined_id, &evt) {
                                debug!("Skipping bus copy of the join frame");
                                continue;
                            }
                            if let Ok(json) = serde_json::to_string(&evt) {
                                if sender.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            debug!(missed = n, "Viewer lagged, skipping ahead");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Viewers only listen; drain until they hang up.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    let count = state.ws_connections.fetch_sub(1, Ordering::Relaxed) - 1;
    info!(active = count, "Viewer disconnected");
}

/// Whether `event` repeats the picture already sent on join.
///
/// Only the first bus event after joining can be such a copy: it is
/// published between subscribing and reading the current picture.
fn is_join_echo(joined_id: &mut Option<String>, event: &ViewerEvent) -> bool {
    let ViewerEvent::NewPicture { picture } = event;
    joined_id.take().is_some_and(|id| id == picture.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> ViewerEvent {
        ViewerEvent::NewPicture {
            picture: DisplayPicture {
                id: id.to_string(),
                author: None,
                location: None,
                path: format!("/images/{}.jpg", id),
                when: "a few seconds ago".to_string(),
                added_at: 0,
                taken_at: None,
            },
        }
    }

    #[test]
    fn test_bus_copy_of_join_frame_is_skipped_once() {
        let mut joined = Some("p1".to_string());
        assert!(is_join_echo(&mut joined, &event("p1")));
        // A later, genuine repeat is forwarded.
        assert!(!is_join_echo(&mut joined, &event("p1")));
    }

    #[test]
    fn test_different_first_event_is_forwarded() {
        let mut joined = Some("p1".to_string());
        assert!(!is_join_echo(&mut joined, &event("p2")));
        assert!(!is_join_echo(&mut joined, &event("p1")));
    }

    #[test]
    fn test_nothing_to_skip_without_join_frame() {
        let mut joined = None;
        assert!(!is_join_echo(&mut joined, &event("p1")));
    }
}
