//! HTTP API for the catalog sync service
//!
//! Exposes the external trigger endpoint (token in the query string, for
//! cron services) and the operator endpoints (status, manual sync,
//! connection test, settings). Operator endpoints sit behind an optional
//! bearer token; without one they are open and a warning is logged at
//! startup.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Local, SecondsFormat};

use crate::catalog::store;
use crate::scheduler::SchedulerHandle;
use crate::settings::{SettingsStore, SettingsUpdate, SyncInterval};
use crate::sync::SyncEngine;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    settings: Arc<SettingsStore>,
    engine: SyncEngine,
    scheduler: SchedulerHandle,
    admin_token: Option<String>,
}

/// Minimal response body for the trigger endpoint and error paths
#[derive(Serialize)]
struct ApiMessage {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

/// Snapshot served by GET /api/status
#[derive(Serialize)]
struct SyncStatus {
    enabled: bool,
    last_sync_at: i64,
    next_sync_at: Option<String>,
    sync_interval: SyncInterval,
    product_count: i64,
    trigger_url: String,
}

/// Operator-level guard. With no admin token configured every request
/// passes; otherwise the Authorization header must carry the exact token.
fn require_admin(admin_token: Option<&str>, headers: &HeaderMap) -> Result<(), Response> {
    let expected = match admin_token {
        Some(token) => token,
        None => return Ok(()),
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("");

    if provided == expected {
        Ok(())
    } else {
        log::warn!("Rejected operator request without a valid bearer token");
        Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiMessage {
                success: false,
                message: "Unauthorized".to_string(),
                timestamp: None,
            }),
        )
            .into_response())
    }
}

/// GET|POST /trigger?token={token} - external sync trigger
///
/// Token check first (403 on mismatch, invalid tokens never run a sync),
/// then the enabled flag (200 with success=false when off). A valid,
/// enabled trigger runs the scheduled-sync path and always reports success
/// with a timestamp, mirroring how an external cron service expects it.
async fn trigger_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<ApiMessage>) {
    let settings = state.settings.current().await;
    let provided = params.get("token").map(String::as_str).unwrap_or("");

    if provided.is_empty() || settings.trigger_token.is_empty() || provided != settings.trigger_token
    {
        log::warn!("Trigger request rejected: invalid token");
        return (
            StatusCode::FORBIDDEN,
            Json(ApiMessage {
                success: false,
                message: "Invalid token".to_string(),
                timestamp: None,
            }),
        );
    }

    if !settings.sync_enabled {
        return (
            StatusCode::OK,
            Json(ApiMessage {
                success: false,
                message: "Automatic sync is disabled".to_string(),
                timestamp: None,
            }),
        );
    }

    log::info!("External trigger accepted");
    state.engine.run_scheduled_sync().await;

    (
        StatusCode::OK,
        Json(ApiMessage {
            success: true,
            message: "Sync executed successfully".to_string(),
            timestamp: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
        }),
    )
}

/// GET /api/status
async fn status_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_admin(state.admin_token.as_deref(), &headers) {
        return response;
    }

    let settings = state.settings.current().await;
    let product_count = {
        let conn = state.db.lock().unwrap();
        match store::count_published(&conn) {
            Ok(count) => count,
            Err(e) => {
                log::error!("Database error: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    };

    let status = SyncStatus {
        enabled: settings.sync_enabled,
        last_sync_at: settings.last_sync_at,
        next_sync_at: state
            .scheduler
            .next_run()
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        sync_interval: settings.sync_interval,
        product_count,
        trigger_url: format!(
            "/trigger?token={}",
            urlencoding::encode(&settings.trigger_token)
        ),
    };

    Json(status).into_response()
}

/// POST /api/sync - manual sync, runs even when automatic sync is disabled
async fn manual_sync_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_admin(state.admin_token.as_deref(), &headers) {
        return response;
    }

    let result = state.engine.run_manual_sync().await;
    Json(result).into_response()
}

/// POST /api/test-connection - lightweight probe of the destination
async fn test_connection_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_admin(state.admin_token.as_deref(), &headers) {
        return response;
    }

    let result = state.engine.test_connection().await;
    Json(result).into_response()
}

/// GET /api/settings
async fn get_settings_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_admin(state.admin_token.as_deref(), &headers) {
        return response;
    }

    Json(state.settings.current().await).into_response()
}

/// PUT /api/settings - sanitize, persist and re-arm the timer if needed
async fn update_settings_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<SettingsUpdate>,
) -> Response {
    if let Err(response) = require_admin(state.admin_token.as_deref(), &headers) {
        return response;
    }

    match state.settings.apply_update(update).await {
        Ok((settings, interval_changed)) => {
            if interval_changed {
                state.scheduler.rearm(settings.sync_interval);
                log::info!("Sync interval changed, timer re-armed");
            }
            Json(settings).into_response()
        }
        Err(e) => {
            log::error!("Failed to update settings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage {
                    success: false,
                    message: "Failed to persist settings".to_string(),
                    timestamp: None,
                }),
            )
                .into_response()
        }
    }
}

/// POST /api/settings/regenerate-token
async fn regenerate_token_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_admin(state.admin_token.as_deref(), &headers) {
        return response;
    }

    match state.settings.regenerate_token().await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => {
            log::error!("Failed to regenerate trigger token: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage {
                    success: false,
                    message: "Failed to persist settings".to_string(),
                    timestamp: None,
                }),
            )
                .into_response()
        }
    }
}

/// Build the HTTP router
pub fn create_router(
    db: Arc<Mutex<Connection>>,
    settings: Arc<SettingsStore>,
    engine: SyncEngine,
    scheduler: SchedulerHandle,
    admin_token: Option<String>,
) -> Router {
    let state = AppState {
        db,
        settings,
        engine,
        scheduler,
        admin_token,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/trigger", get(trigger_handler).post(trigger_handler))
        .route("/api/status", get(status_handler))
        .route("/api/sync", post(manual_sync_handler))
        .route("/api/test-connection", post(test_connection_handler))
        .route(
            "/api/settings",
            get(get_settings_handler).put(update_settings_handler),
        )
        .route(
            "/api/settings/regenerate-token",
            post(regenerate_token_handler),
        )
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
/// Use firewall rules or port mapping to control external exposure.
pub async fn serve(
    db: Arc<Mutex<Connection>>,
    settings: Arc<SettingsStore>,
    engine: SyncEngine,
    scheduler: SchedulerHandle,
    admin_token: Option<String>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(db, settings, engine, scheduler, admin_token);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
