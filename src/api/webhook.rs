//! Webhook handler for GitLab merge request events

use axum::{
    body::Bytes,
    extract::{Query, State as AxumState},
    http::{HeaderMap, StatusCode},
};
use secrecy::SecretString;
use std::collections::HashMap;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::SharedState;
use crate::error::{BridgeError, Result};
use crate::utils::verify_gitlab_token;
use crate::webhook::MergeRequestEvent;

pub const EVENT_UUID_HEADER: &str = "X-Gitlab-Event-UUID";
pub const PRIVATE_TOKEN_PARAM: &str = "private_token";

/// Handles the GitLab merge request webhook POST request.
///
/// 200 with an empty body whether or not a pipeline was started, 400 when the
/// body is not JSON of the expected shape, 500 when a GitLab call fails.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let delivery = headers
        .get(EVENT_UUID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    process_delivery(&state, &params, &headers, &body)
        .instrument(info_span!("webhook", delivery = %delivery))
        .await
}

async fn process_delivery(
    state: &SharedState,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<StatusCode> {
    if let Err(e) = verify_gitlab_token(state.config.webhook_secret.as_ref(), headers) {
        warn!("{}", e);
        return Err(e);
    }

    let event: MergeRequestEvent = serde_json::from_slice(body).map_err(|e| {
        warn!("Failed to deserialize request body ({})", e);
        BridgeError::MalformedInput(e.to_string())
    })?;

    info!(
        "Received {} event for {}#{} (project {}, commit {})",
        event.object_kind,
        event.project_name(),
        event.source_branch(),
        event.source_project_id(),
        event.commit_sha()
    );

    // A non-empty query token overrides the configured default for this request only.
    let query_token = params
        .get(PRIVATE_TOKEN_PARAM)
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::from(t.clone()));
    let private_token = query_token
        .as_ref()
        .or(state.config.private_token.as_ref());

    match state.engine.process(&event, private_token).await {
        Ok(outcome) => {
            debug!("Outcome: {:?}", outcome);
            Ok(StatusCode::OK)
        }
        Err(e) => {
            warn!("{}", e);
            Err(e)
        }
    }
}
