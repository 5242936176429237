//! Service status endpoint.
//!
//! Always answers 200; component health is reported in the body so a
//! dashboard can render a degraded state instead of an error page.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::api::types::ApiContext;

/// GET /api/status
pub async fn status(State(ctx): State<ApiContext>) -> Json<serde_json::Value> {
    let llm = ctx.llm.clone();
    let store = ctx.store.clone();

    // Probe both components concurrently; the DB check is a blocking
    // SQLite call so it runs off the async worker.
    let (db_ok, llm_ok) = tokio::join!(
        async move {
            tokio::task::spawn_blocking(move || store.health_check())
                .await
                .unwrap_or(false)
        },
        async move { llm.health_check().await },
    );

    let db_message = if db_ok {
        "SQLite connected"
    } else {
        "Database unavailable"
    };
    let llm_message = if llm_ok {
        "Gemini API responding"
    } else {
        "Gemini API not responding"
    };
    let overall = if db_ok && llm_ok {
        "healthy"
    } else {
        "unhealthy"
    };

    if overall != "healthy" {
        tracing::warn!(db_ok, llm_ok, "service degraded");
    }

    Json(json!({
        "status": overall,
        "database": { "connected": db_ok, "message": db_message },
        "llm": { "connected": llm_ok, "message": llm_message },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
