//! Discord interactions endpoint
//!
//! POST /api/v1/interactions — inbound webhook from Discord. Every request
//! must carry a valid Ed25519 signature over `timestamp || raw body`; Discord
//! sends deliberately bad signatures during endpoint setup, so verification
//! runs before anything else. PING (type 1) is answered with PONG, message
//! component interactions drive work-request approvals from the staff channel.

use axum::{body::Bytes, extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::middleware::{ApiError, AppState};
use crate::services::WorkRequestServiceError;

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Interaction type constants from the Discord API
const INTERACTION_PING: u64 = 1;
const INTERACTION_MESSAGE_COMPONENT: u64 = 3;

/// Response type: respond with a message
const RESPONSE_CHANNEL_MESSAGE: u64 = 4;

/// Interactions routes
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(handle_interaction))
}

#[derive(Debug, Deserialize)]
struct Interaction {
    #[serde(rename = "type")]
    kind: u64,
    data: Option<InteractionData>,
}

#[derive(Debug, Deserialize)]
struct InteractionData {
    custom_id: Option<String>,
}

/// POST /api/v1/interactions
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let verifier = state
        .interaction_verifier
        .as_ref()
        .ok_or_else(|| ApiError::new("NOT_CONFIGURED", "Discord interactions are not configured"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing interaction signature"))?;
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing interaction timestamp"))?;

    if !verifier.verify(signature, timestamp, &body) {
        return Err(ApiError::unauthorized("Invalid interaction signature"));
    }

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| ApiError::validation_error(format!("Malformed interaction: {}", e)))?;

    match interaction.kind {
        INTERACTION_PING => Ok(Json(json!({ "type": INTERACTION_PING }))),
        INTERACTION_MESSAGE_COMPONENT => {
            let custom_id = interaction
                .data
                .and_then(|d| d.custom_id)
                .ok_or_else(|| ApiError::validation_error("Component interaction without custom_id"))?;
            let content = handle_component(&state, &custom_id).await?;

            Ok(Json(json!({
                "type": RESPONSE_CHANNEL_MESSAGE,
                "data": { "content": content }
            })))
        }
        other => Err(ApiError::validation_error(format!(
            "Unsupported interaction type: {}",
            other
        ))),
    }
}

/// Dispatch a component custom_id of the form `work_request:{action}:{id}`.
async fn handle_component(state: &AppState, custom_id: &str) -> Result<String, ApiError> {
    let mut parts = custom_id.splitn(3, ':');
    let (domain, action, id) = (parts.next(), parts.next(), parts.next());

    let (Some("work_request"), Some(action), Some(id)) = (domain, action, id) else {
        return Err(ApiError::validation_error(format!(
            "Unknown component: {}",
            custom_id
        )));
    };
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::validation_error("Invalid work request id"))?;

    let result = match action {
        "approve" => state.work_request_service.approve(id, None).await,
        "decline" => state.work_request_service.decline(id, None).await,
        _ => {
            return Err(ApiError::validation_error(format!(
                "Unknown action: {}",
                action
            )))
        }
    };

    match result {
        Ok(request) => Ok(format!(
            "Work request #{} {} ({})",
            request.id, request.status, request.title
        )),
        // A second click on a settled request still gets a reply in the
        // channel instead of a failed interaction
        Err(WorkRequestServiceError::InvalidTransition { from, .. }) => {
            Ok(format!("Work request #{} is already {}", id, from))
        }
        Err(e) => Err(e.into()),
    }
}
