//! Cron trigger endpoint — POST /cron/drip.
//!
//! Invoked by an external scheduler. The caller is authenticated according
//! to the configured trigger mode before the pipeline runs; a 401 means the
//! pipeline never started.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, warn};

use nudge_core::config::TriggerAuthMode;

use crate::app::AppState;
use crate::run;

type HmacSha256 = Hmac<Sha256>;

/// POST /cron/drip
///
/// Verifies the scheduler's credentials and executes one full drip pass.
/// Returns 200 + the run summary (partial per-candidate failures included),
/// 401 on auth failure, 500 when the run itself could not start.
pub async fn drip_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let trigger = &state.config.gateway.trigger;

    match trigger.mode {
        TriggerAuthMode::BearerToken => {
            verify_bearer_token(&headers, trigger.secret.as_deref()).map_err(|e| auth_error(&e))?;
        }
        TriggerAuthMode::HmacSha256 => {
            verify_hmac_sha256(&headers, &body, trigger.secret.as_deref())
                .map_err(|e| auth_error(&e))?;
        }
        TriggerAuthMode::None => {
            // No authentication — operator explicitly opted out.
        }
    }

    info!("drip run triggered");

    match run::run_drip(&state).await {
        Ok(summary) => {
            info!(
                sent = summary.sent,
                selected = summary.selected,
                classified = summary.classified,
                "drip run complete"
            );
            Ok(Json(serde_json::to_value(&summary).unwrap_or_else(
                |_| json!({"error": "summary serialization failed"}),
            )))
        }
        Err(e) => {
            error!(error = %e, "drip run failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            ))
        }
    }
}

// ── Auth helpers ──────────────────────────────────────────────────────────────

/// Verify a static bearer token in the `Authorization: Bearer <token>` header.
pub(crate) fn verify_bearer_token(
    headers: &HeaderMap,
    secret: Option<&str>,
) -> Result<(), String> {
    let expected = secret.ok_or_else(|| "no bearer token configured".to_string())?;

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Authorization header".to_string())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| "Authorization header must use Bearer scheme".to_string())?;

    if token == expected {
        Ok(())
    } else {
        Err("bearer token mismatch".to_string())
    }
}

/// Verify GitHub-style HMAC-SHA256: `sha256=<hex>` in X-Hub-Signature-256.
pub(crate) fn verify_hmac_sha256(
    headers: &HeaderMap,
    body: &Bytes,
    secret: Option<&str>,
) -> Result<(), String> {
    let secret = secret.ok_or_else(|| "no HMAC secret configured".to_string())?;

    let sig_header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-Hub-Signature-256 header".to_string())?;

    let sig_hex = sig_header
        .strip_prefix("sha256=")
        .ok_or_else(|| "malformed X-Hub-Signature-256 header".to_string())?;

    let expected =
        hex::decode(sig_hex).map_err(|_| "X-Hub-Signature-256 is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| "HMAC signature mismatch".to_string())
}

// ── Error helpers ─────────────────────────────────────────────────────────────

fn auth_error(reason: &str) -> (StatusCode, Json<Value>) {
    warn!(reason = %reason, "trigger authentication failed");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "authentication failed", "reason": reason})),
    )
}
