//! HTTP surface: the streaming chat endpoint and static client files.

use std::{convert::Infallible, path::Path, sync::Arc};

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, COOKIE, SET_COOKIE},
    },
    response::{IntoResponse, Response, Sse},
    routing::post,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::services::ServeDir;
use vision_relay_session::SessionResolver;
use vision_relay_upstream::{ChatBackend, append_user_turn};

use crate::{ChatSubmission, RelayFrame, relay::run_chat};

/// Maximum request body size; image data URLs are large.
pub const BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Frames buffered between the relay task and the response body.
const FRAME_BUFFER: usize = 64;

/// State shared by the chat handlers.
#[derive(Clone)]
pub struct AppState {
    /// Resolves cookies onto conversation logs.
    pub resolver: SessionResolver,
    /// Model server.
    pub backend: Arc<dyn ChatBackend>,
}

impl AppState {
    #[must_use]
    pub fn new(resolver: SessionResolver, backend: Arc<dyn ChatBackend>) -> Self {
        Self { resolver, backend }
    }
}

/// Create the chat router.
///
/// Serves `POST /chat` (and `/api/chat`, used by the bundled client). When
/// `static_dir` is given, every other path falls back to files from it.
///
/// # Example
/// ```ignore
/// let app = create_chat_router(state, Some(Path::new("public")));
/// ```
#[must_use]
pub fn create_chat_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/chat", post(chat_handler))
        .route("/api/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Accept a turn and stream the model's reply back as server-sent events.
async fn chat_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let submission = match ChatSubmission::from_body(&body) {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!("Invalid chat request: {e}");
            return (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}")).into_response();
        }
    };

    let cookies = cookie_header(&headers);
    let session = match state.resolver.resolve(cookies.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to resolve session: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let store = Arc::clone(state.resolver.store());
    let user_turn = match append_user_turn(
        store.as_ref(),
        &session.id,
        submission.image_data_url.as_deref(),
    )
    .await
    {
        Ok(turn) => turn,
        Err(e) => {
            tracing::error!(session = session.id.short(), "Failed to append user turn: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let (tx, rx) = mpsc::channel::<RelayFrame>(FRAME_BUFFER);
    tokio::spawn(run_chat(
        Arc::clone(&state.backend),
        store,
        session.id.clone(),
        user_turn,
        tx,
    ));

    let events = ReceiverStream::new(rx).map(|frame| Ok::<_, Infallible>(frame.to_sse_event()));
    let mut response = Sse::new(events).into_response();

    let response_headers = response.headers_mut();
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Some(cookie) = session.set_cookie() {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response_headers.append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Invalid session cookie: {e}"),
        }
    }

    response
}

/// All `Cookie` headers of a request, joined.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    (!values.is_empty()).then(|| values.join("; "))
}
