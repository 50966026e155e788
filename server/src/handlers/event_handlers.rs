// Webhook intake for the identity-provider delivery channel.
//
// Response status drives the channel's retry behavior: 2xx acknowledges,
// 4xx discards (the payload will never become valid), 5xx redelivers.

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use taskhive_core::{
    event::EventEnvelope,
    reconcile::{Applied, ReconcileError},
};
use tracing::warn;

use crate::{error::AppError, state::AppState};

pub(crate) async fn identity_event_handler(
    State(state): State<AppState>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<impl IntoResponse, AppError> {
    match state.reconciler.apply_envelope(&envelope).await {
        Ok(Applied::Processed) => Ok(Json(json!({ "status": "processed" }))),
        Ok(Applied::Ignored) => Ok(Json(json!({ "status": "ignored" }))),
        Err(ReconcileError::Store(err)) => Err(AppError::internal(err)),
        Err(err) => {
            warn!(kind = %envelope.kind, %err, "discarding undeliverable event");
            Err(AppError::bad_request(err.to_string()))
        }
    }
}
