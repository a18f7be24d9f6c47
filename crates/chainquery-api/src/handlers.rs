use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chainquery_core::{ResolutionResult, Turn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<Turn>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_enabled: state.resolver.has_model(),
    })
}

/// Resolve one utterance against the caller's history.
///
/// History beyond `server.max_history_turns` loses its oldest turns. Those
/// can hold the first-mentioned subject, action or scope, so truncation may
/// change the synthesized query.
pub async fn resolve_query(
    State(state): State<AppState>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> ApiResult<Json<ResolutionResult>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let utterance = request.message.trim().to_string();
    if utterance.is_empty() {
        return Err(ApiError::Validation("message must not be empty".to_string()));
    }

    let mut history = request.conversation_history;
    let max_turns = state.max_history_turns();
    if history.len() > max_turns {
        let dropped = history.len() - max_turns;
        debug!(dropped, kept = max_turns, "truncating conversation history");
        history.drain(..dropped);
    }

    let request_id = Uuid::new_v4();
    let span = info_span!("resolve", %request_id, turns = history.len());

    // Dropping this handler (client went away) cancels the model call
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let resolver = state.resolver.clone();
    let task = tokio::spawn(
        async move { resolver.resolve_with_cancel(&utterance, &history, &cancel).await }
            .instrument(span),
    );

    let result = match task.await {
        Ok(resolution) => {
            debug!(
                %request_id,
                source = ?resolution.source,
                ready = resolution.result.is_query_ready,
                "resolved"
            );
            resolution.result
        }
        Err(e) => {
            error!(%request_id, "Resolver task failed: {}", e);
            ResolutionResult::trouble_understanding()
        }
    };

    guard.disarm();
    Ok(Json(result))
}
