//! Sync engine: format, deliver, record.
//!
//! Every sync path funnels through [`SyncEngine::execute`]. The engine
//! stamps `last_sync_at` after each delivery attempt whether it succeeded or
//! not; the field records the latest attempt, not the latest success.

use rusqlite::Connection;
use serde::Serialize;

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::delivery::DeliveryClient;
use crate::error::SyncError;
use crate::formatter;
use crate::settings::{Settings, SettingsStore};

/// Outcome summary returned to manual triggers and logged for scheduled runs.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl SyncResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            products_count: None,
            status_code: None,
            response: None,
        }
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    db: Arc<Mutex<Connection>>,
    settings: Arc<SettingsStore>,
    delivery: DeliveryClient,
}

impl SyncEngine {
    pub fn new(db: Arc<Mutex<Connection>>, settings: Arc<SettingsStore>) -> Self {
        Self {
            db,
            settings,
            delivery: DeliveryClient::new(),
        }
    }

    /// Operator-initiated sync. Runs whenever a destination URL is set,
    /// whether or not automatic sync is enabled.
    pub async fn run_manual_sync(&self) -> SyncResult {
        let settings = self.settings.current().await;
        if settings.destination_url.is_empty() {
            return SyncResult::failure(SyncError::NotConfigured.to_string());
        }
        log::info!("Manual sync requested");
        self.execute(&settings).await
    }

    /// Timer- or trigger-initiated sync. Quietly skips when automatic sync
    /// is disabled or no destination is configured.
    pub async fn run_scheduled_sync(&self) {
        let settings = self.settings.current().await;
        if !settings.sync_enabled {
            log::info!("Automatic sync is disabled, skipping scheduled run");
            return;
        }
        if settings.destination_url.is_empty() {
            log::warn!("No destination URL configured, skipping scheduled run");
            return;
        }

        let result = self.execute(&settings).await;
        if result.success {
            log::info!("Scheduled sync finished: {}", result.message);
        } else {
            log::error!("Scheduled sync failed: {}", result.message);
        }
    }

    /// Connectivity probe: small payload, shorter timeout, no catalog read.
    /// Does not touch `last_sync_at`.
    pub async fn test_connection(&self) -> SyncResult {
        let settings = self.settings.current().await;
        if settings.destination_url.is_empty() {
            return SyncResult::failure(SyncError::NotConfigured.to_string());
        }

        let outcome = self.delivery.send_test(&settings.destination_url).await;
        let message = if outcome.success {
            "Connection successful".to_string()
        } else {
            outcome.message
        };
        SyncResult {
            success: outcome.success,
            message,
            products_count: None,
            status_code: outcome.status_code,
            response: outcome.body,
        }
    }

    /// Shared sync path. A formatter failure short-circuits before any
    /// network traffic and leaves `last_sync_at` alone.
    async fn execute(&self, settings: &Settings) -> SyncResult {
        let document = {
            let conn = self.db.lock().unwrap();
            match formatter::format_all_products(&conn, settings) {
                Ok(document) => document,
                Err(e) => {
                    log::error!("Failed to format catalog: {}", e);
                    return SyncResult::failure(format!("Failed to format catalog: {}", e));
                }
            }
        };

        log::info!(
            "Delivering {} products to {}",
            document.total_count,
            settings.destination_url
        );

        let outcome = match self
            .delivery
            .deliver(&settings.destination_url, &document)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Failed to serialize export document: {}", e);
                return SyncResult::failure(format!("Failed to serialize export document: {}", e));
            }
        };

        if let Err(e) = self.settings.record_sync_time(Utc::now().timestamp()).await {
            log::error!("Failed to record sync time: {}", e);
        }

        if outcome.success {
            SyncResult {
                success: true,
                message: format!("Synced {} products successfully", document.total_count),
                products_count: Some(document.total_count),
                status_code: outcome.status_code,
                response: outcome.body,
            }
        } else {
            SyncResult {
                success: false,
                message: outcome.message,
                products_count: None,
                status_code: outcome.status_code,
                response: outcome.body,
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
