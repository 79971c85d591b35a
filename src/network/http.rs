//! HTTP + SSE front end.
//!
//! | Method | Path | Command |
//! |--------|------|---------|
//! | GET | `/health` | liveness |
//! | POST | `/register` | `register` |
//! | POST | `/join` | `join` |
//! | POST | `/practice` | `practice` |
//! | POST | `/roll` | `roll` |
//! | POST | `/notify` | `notify` |
//! | POST | `/pass` | `pass` |
//! | POST | `/leave` | `leave` |
//! | POST | `/ranking` | `ranking` |
//! | GET | `/update?nick=&game=` | server-sent delta stream |

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use crate::network::error::CommandError;
use crate::network::protocol::{
    Command, JoinRequest, NotifyRequest, PracticeRequest, RankingRequest, RegisterRequest, Reply,
    TurnRequest,
};
use crate::network::session::SessionStore;

pub type AppState = Arc<SessionStore>;

pub fn create_router(store: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health_check))
        .route("/register", post(handle_register))
        .route("/join", post(handle_join))
        .route("/practice", post(handle_practice))
        .route("/roll", post(handle_roll))
        .route("/notify", post(handle_notify))
        .route("/pass", post(handle_pass))
        .route("/leave", post(handle_leave))
        .route("/ranking", post(handle_ranking))
        .route("/update", get(handle_update))
        .layer(cors)
        .with_state(store)
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

type Payload<T> = Result<Json<T>, JsonRejection>;
type CommandResult = Result<Json<Reply>, CommandError>;

/// Unwrap a JSON body; a missing or malformed body is a validation failure.
fn body<T>(payload: Payload<T>) -> Result<T, CommandError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| CommandError::validation(e.body_text()))
}

async fn run(store: &AppState, command: Command) -> CommandResult {
    store.execute(command).await.map(Json)
}

// ── POST handlers ───────────────────────────────────────────────────

async fn handle_health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

async fn handle_register(State(store): State<AppState>, payload: Payload<RegisterRequest>) -> CommandResult {
    run(&store, Command::Register(body(payload)?)).await
}

async fn handle_join(State(store): State<AppState>, payload: Payload<JoinRequest>) -> CommandResult {
    run(&store, Command::Join(body(payload)?)).await
}

async fn handle_practice(State(store): State<AppState>, payload: Payload<PracticeRequest>) -> CommandResult {
    run(&store, Command::Practice(body(payload)?)).await
}

async fn handle_roll(State(store): State<AppState>, payload: Payload<TurnRequest>) -> CommandResult {
    run(&store, Command::Roll(body(payload)?)).await
}

async fn handle_notify(State(store): State<AppState>, payload: Payload<NotifyRequest>) -> CommandResult {
    run(&store, Command::Notify(body(payload)?)).await
}

async fn handle_pass(State(store): State<AppState>, payload: Payload<TurnRequest>) -> CommandResult {
    run(&store, Command::Pass(body(payload)?)).await
}

async fn handle_leave(State(store): State<AppState>, payload: Payload<TurnRequest>) -> CommandResult {
    run(&store, Command::Leave(body(payload)?)).await
}

async fn handle_ranking(State(store): State<AppState>, payload: Payload<RankingRequest>) -> CommandResult {
    run(&store, Command::Ranking(body(payload)?)).await
}

// ── SSE ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct UpdateQuery {
    nick: Option<String>,
    game: Option<String>,
}

async fn handle_update(
    State(store): State<AppState>,
    Query(params): Query<UpdateQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, CommandError> {
    let nick = params.nick.unwrap_or_default();
    let game = params.game.unwrap_or_default();
    if game.is_empty() {
        return Err(CommandError::validation("game is empty"));
    }

    let rx = store.subscribe(&nick, &game).await?;
    debug!(nick = %nick, game = %game, "SSE stream opened");

    let events = stream::unfold(rx, |mut rx| async move {
        let payload = rx.recv().await?;
        Some((Ok::<_, Infallible>(Event::default().data(&*payload)), rx))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::error::ErrorKind;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (CommandError::validation("x"), StatusCode::BAD_REQUEST),
            (CommandError::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (CommandError::unknown_game("g"), StatusCode::NOT_FOUND),
            (CommandError::StateConflict("x".into()), StatusCode::CONFLICT),
            (CommandError::Transport("x".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_error_body_shape() {
        let body = CommandError::unknown_game("g1").body();
        assert_eq!(body.kind, ErrorKind::Reference);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "reference");
        assert_eq!(json["error"], "unknown game g1");
    }
}
