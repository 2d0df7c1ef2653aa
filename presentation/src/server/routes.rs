//! Axum route handlers for the deliberation HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`                        : liveness and live controller count
//! - `POST /deliberation/start`            : `{session_id}` → `{total_rounds}`
//! - `POST /deliberation/note`             : `{session_id, target_id, content, idempotency_key}` → acknowledgement
//! - `POST /deliberation/skip`             : `{session_id}` → `{status: "ended"}`
//! - `POST /deliberation/advance`          : `{session_id}` → snapshot
//! - `POST /deliberation/reset`            : `{session_id}` → `{reset}`
//! - `GET  /deliberation/state?session_id=`: snapshot
//! - `GET  /deliberation/stream?session_id=`: Server-Sent Events
//!
//! Errors are `{"error": <message>, "code": <snake_case kind>}`. Retryable
//! failures also carry a `Retry-After` header.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{self, Stream};
use jury_application::{DeliberationService, EventReceiver, SessionStore, SpeechGenerator};
use jury_domain::{DeliberationError, DeliberationEvent, Note, NoteAck, SessionId, SessionSnapshot};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Shared application state for the HTTP server.
pub struct AppState<S: SessionStore + 'static, G: SpeechGenerator + 'static> {
    pub service: Arc<DeliberationService<S, G>>,
}

impl<S: SessionStore + 'static, G: SpeechGenerator + 'static> AppState<S, G> {
    pub fn new(service: Arc<DeliberationService<S, G>>) -> Self {
        Self { service }
    }
}

impl<S: SessionStore + 'static, G: SpeechGenerator + 'static> Clone for AppState<S, G> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router<S, G>(state: AppState<S, G>) -> Router
where
    S: SessionStore + 'static,
    G: SpeechGenerator + 'static,
{
    Router::new()
        .route("/health", get(health_handler::<S, G>))
        .route("/deliberation/start", post(start_handler::<S, G>))
        .route("/deliberation/note", post(note_handler::<S, G>))
        .route("/deliberation/skip", post(skip_handler::<S, G>))
        .route("/deliberation/advance", post(advance_handler::<S, G>))
        .route("/deliberation/reset", post(reset_handler::<S, G>))
        .route("/deliberation/state", get(state_handler::<S, G>))
        .route("/deliberation/stream", get(stream_handler::<S, G>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==================== Requests & Errors ====================

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub session_id: String,
    pub target_id: String,
    #[serde(default)]
    pub content: String,
    /// Missing keys are reported by the note channel, not as a parse failure
    #[serde(default)]
    pub idempotency_key: String,
}

/// A command failure rendered as an HTTP error
#[derive(Debug)]
pub struct ApiError(pub DeliberationError);

impl From<DeliberationError> for ApiError {
    fn from(err: DeliberationError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &DeliberationError) -> StatusCode {
    match err {
        DeliberationError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        DeliberationError::SessionUnavailable(_) | DeliberationError::ControllerClosed => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        DeliberationError::NoNoteBudget => StatusCode::TOO_MANY_REQUESTS,
        DeliberationError::InvalidTarget(_)
        | DeliberationError::NoteTooLong { .. }
        | DeliberationError::EmptyNote
        | DeliberationError::MissingIdempotencyKey => StatusCode::BAD_REQUEST,
        DeliberationError::NotRunning => StatusCode::CONFLICT,
        DeliberationError::EmptyRoster | DeliberationError::RosterTooSmall(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        debug!(code = self.0.code(), status = status.as_u16(), "Command rejected");
        let mut response = (
            status,
            Json(json!({
                "error": self.0.to_string(),
                "code": self.0.code(),
            })),
        )
            .into_response();
        if self.0.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

/// Seconds a client should wait before retrying a 503
const RETRY_AFTER_SECS: &str = "1";

type ApiResult<T> = Result<Json<T>, ApiError>;

// ==================== Handlers ====================

/// GET /health
async fn health_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jury-deliberation",
        "active_sessions": state.service.active_sessions(),
    }))
}

/// POST /deliberation/start
async fn start_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<SessionRequest>,
) -> ApiResult<Value> {
    let snapshot = state
        .service
        .start(&SessionId::from(request.session_id))
        .await?;
    Ok(Json(json!({ "total_rounds": snapshot.total_rounds })))
}

/// POST /deliberation/note
async fn note_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<NoteRequest>,
) -> ApiResult<NoteAck> {
    let note = Note::new(request.target_id, request.content, request.idempotency_key);
    let ack = state
        .service
        .submit_note(&SessionId::from(request.session_id), note)
        .await?;
    Ok(Json(ack))
}

/// POST /deliberation/skip
async fn skip_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<SessionRequest>,
) -> ApiResult<Value> {
    let snapshot = state
        .service
        .skip(&SessionId::from(request.session_id))
        .await?;
    Ok(Json(json!({ "status": snapshot.status })))
}

/// POST /deliberation/advance
async fn advance_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<SessionRequest>,
) -> ApiResult<SessionSnapshot> {
    let snapshot = state
        .service
        .advance(&SessionId::from(request.session_id))
        .await?;
    Ok(Json(snapshot))
}

/// POST /deliberation/reset
async fn reset_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
    Json(request): Json<SessionRequest>,
) -> Json<Value> {
    let reset = state.service.reset(&SessionId::from(request.session_id));
    Json(json!({ "reset": reset }))
}

/// GET /deliberation/state?session_id=
async fn state_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
    Query(query): Query<SessionRequest>,
) -> ApiResult<SessionSnapshot> {
    let snapshot = state
        .service
        .state(&SessionId::from(query.session_id))
        .await?;
    Ok(Json(snapshot))
}

/// GET /deliberation/stream?session_id=: one named SSE event per notification.
///
/// Attaching replaces any previous subscriber of the session.
async fn stream_handler<S: SessionStore + 'static, G: SpeechGenerator + 'static>(
    State(state): State<AppState<S, G>>,
    Query(query): Query<SessionRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = state
        .service
        .subscribe(&SessionId::from(query.session_id))
        .await?;
    Ok(Sse::new(event_stream(receiver)).keep_alive(KeepAlive::default()))
}

pub fn sse_event(event: &DeliberationEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.data().to_string())
}

fn event_stream(receiver: EventReceiver) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        receiver
            .recv()
            .await
            .map(|event| (Ok(sse_event(&event)), receiver))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use jury_application::{
        DeliberationConfig, GeneratorError, SpeechCompletion, SpeechRequest, SpeechStream,
        StoreError,
    };
    use jury_domain::{Juror, JurorId, Stance};
    use std::time::Duration;
    use tower::ServiceExt;

    struct MockStore;

    #[async_trait]
    impl SessionStore for MockStore {
        async fn roster(&self, session: &SessionId) -> Result<Vec<Juror>, StoreError> {
            match session.as_str() {
                "s1" => Ok(vec![
                    Juror::new("a", "A", Stance::new(20)),
                    Juror::new("b", "B", Stance::new(80)).with_seat(1),
                    Juror::new("c", "C", Stance::new(50)).with_seat(2),
                ]),
                "down" => Err(StoreError::Unavailable("db offline".into())),
                other => Err(StoreError::NotFound(other.to_string())),
            }
        }

        async fn stance(&self, _: &SessionId, _: &JurorId) -> Result<Stance, StoreError> {
            Ok(Stance::NEUTRAL)
        }

        async fn set_stance(&self, _: &SessionId, _: &JurorId, _: Stance) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct MockGenerator;

    #[async_trait]
    impl SpeechGenerator for MockGenerator {
        async fn generate(&self, request: SpeechRequest) -> Result<SpeechStream, GeneratorError> {
            Ok(SpeechStream::from_parts(
                vec![format!("{} ", request.juror_id), "speaks.".to_string()],
                SpeechCompletion::default(),
            ))
        }
    }

    fn app(note_window: Duration) -> Router {
        let service = DeliberationService::new(
            Arc::new(MockStore),
            Arc::new(MockGenerator),
            DeliberationConfig::default()
                .with_total_rounds(2)
                .with_note_window(note_window),
        );
        app_router(AppState::new(Arc::new(service)))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = app(Duration::from_secs(60));
        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "jury-deliberation");
        assert_eq!(json["active_sessions"], 0);

        app.clone()
            .oneshot(post_json("/deliberation/start", json!({"session_id": "s1"})))
            .await
            .unwrap();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(json_body(response).await["active_sessions"], 1);
    }

    #[tokio::test]
    async fn test_start_returns_total_rounds() {
        let app = app(Duration::from_secs(60));
        let response = app
            .clone()
            .oneshot(post_json("/deliberation/start", json!({"session_id": "s1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"total_rounds": 2}));

        let response = app
            .oneshot(post_json("/deliberation/skip", json!({"session_id": "s1"})))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({"status": "ended"}));
    }

    #[tokio::test]
    async fn test_start_error_mapping() {
        let app = app(Duration::ZERO);
        let response = app
            .clone()
            .oneshot(post_json("/deliberation/start", json!({"session_id": "nope"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        assert_eq!(json_body(response).await["code"], "session_not_found");

        let response = app
            .oneshot(post_json("/deliberation/start", json!({"session_id": "down"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[tokio::test]
    async fn test_idle_state_and_not_running() {
        let app = app(Duration::ZERO);
        let response = app
            .clone()
            .oneshot(get("/deliberation/state?session_id=s1"))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["status"], "idle");
        assert_eq!(json["notes_remaining"], 3);

        let response = app
            .oneshot(post_json("/deliberation/skip", json!({"session_id": "s1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["code"], "not_running");
    }

    #[tokio::test]
    async fn test_note_validation_and_budget() {
        let app = app(Duration::from_secs(60));
        app.clone()
            .oneshot(post_json("/deliberation/start", json!({"session_id": "s1"})))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/deliberation/note",
                json!({"session_id": "s1", "target_id": "ghost", "content": "hi", "idempotency_key": "k0"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "invalid_target");

        let response = app
            .clone()
            .oneshot(post_json(
                "/deliberation/note",
                json!({"session_id": "s1", "target_id": "a", "content": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        for i in 0..3 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/deliberation/note",
                    json!({"session_id": "s1", "target_id": "a", "content": "look", "idempotency_key": format!("note-1-{i}")}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = json_body(response).await;
            assert_eq!(json["accepted"], true);
            assert_eq!(json["target_id"], "a");
        }

        let response = app
            .clone()
            .oneshot(post_json(
                "/deliberation/note",
                json!({"session_id": "s1", "target_id": "a", "content": "more", "idempotency_key": "note-1-9"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        app.oneshot(post_json("/deliberation/skip", json!({"session_id": "s1"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stream_carries_named_events() {
        let app = app(Duration::ZERO);
        app.clone()
            .oneshot(post_json("/deliberation/start", json!({"session_id": "s1"})))
            .await
            .unwrap();

        let response = app
            .oneshot(get("/deliberation/stream?session_id=s1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.starts_with("event: debate.start\ndata: {\"total_rounds\":2}"));
        assert_eq!(text.matches("event: round.start").count(), 2);
        assert_eq!(text.matches("event: note.window").count(), 2);
        assert!(text.contains("event: speech.chunk"));
        assert!(text.trim_end().ends_with("event: debate.end\ndata: {}"));
    }

    #[tokio::test]
    async fn test_stream_before_start_is_conflict() {
        let response = app(Duration::ZERO)
            .oneshot(get("/deliberation/stream?session_id=s1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&DeliberationError::NoteTooLong { len: 300, max: 200 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DeliberationError::MissingIdempotencyKey),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&DeliberationError::EmptyNote), StatusCode::BAD_REQUEST);
    }
}
