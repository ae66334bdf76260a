//! Persisted sync settings and the sanitize-on-write update path.
//!
//! Settings live in a single JSON file. The store hands out immutable
//! snapshots; every mutation goes through the store, which sanitizes the
//! incoming values, persists the new record and only then swaps the
//! in-memory snapshot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

/// Length of generated trigger tokens.
const TOKEN_LEN: usize = 32;

/// How often the scheduled sync fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncInterval {
    #[serde(rename = "every_15_minutes")]
    EveryFifteenMinutes,
    #[serde(rename = "every_30_minutes")]
    EveryThirtyMinutes,
    #[default]
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "twicedaily")]
    TwiceDaily,
    #[serde(rename = "daily")]
    Daily,
}

impl SyncInterval {
    /// Tick period used by the scheduler.
    pub fn period(&self) -> Duration {
        match self {
            SyncInterval::EveryFifteenMinutes => Duration::from_secs(15 * 60),
            SyncInterval::EveryThirtyMinutes => Duration::from_secs(30 * 60),
            SyncInterval::Hourly => Duration::from_secs(60 * 60),
            SyncInterval::TwiceDaily => Duration::from_secs(12 * 60 * 60),
            SyncInterval::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Full settings record as persisted on disk and served to the operator API.
///
/// `last_sync_at` holds the Unix timestamp of the latest delivery attempt
/// (0 = never); it is written by the sync engine, not by operator updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub destination_url: String,
    #[serde(default)]
    pub sync_interval: SyncInterval,
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default)]
    pub include_variations: bool,
    #[serde(default)]
    pub include_categories: bool,
    #[serde(default)]
    pub last_sync_at: i64,
    #[serde(default)]
    pub trigger_token: String,
}

impl Settings {
    /// First-run defaults: sync off until configured, everything included.
    fn defaults() -> Self {
        Self {
            destination_url: String::new(),
            sync_interval: SyncInterval::Hourly,
            sync_enabled: false,
            include_images: true,
            include_variations: true,
            include_categories: true,
            last_sync_at: 0,
            trigger_token: generate_token(),
        }
    }
}

/// Incoming settings mutation as submitted by the operator API.
///
/// Absent booleans deserialize to `false` (checkbox semantics) and unknown
/// fields are dropped. An absent or blank `trigger_token` keeps the current
/// token; `last_sync_at` cannot be set through an update at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub destination_url: String,
    #[serde(default)]
    pub sync_interval: SyncInterval,
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default)]
    pub include_variations: bool,
    #[serde(default)]
    pub include_categories: bool,
    #[serde(default)]
    pub trigger_token: Option<String>,
}

/// Owns the settings file and serializes all mutations.
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Load settings from `path`, creating the file with first-run defaults
    /// (fresh trigger token included) when it does not exist. A loaded record
    /// with an empty token gets one generated and written back, so the token
    /// is never empty once the store is up.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let mut settings: Settings = serde_json::from_str(&raw)?;
            if settings.trigger_token.is_empty() {
                settings.trigger_token = generate_token();
                write_file(path, &settings)?;
                log::info!("Generated missing trigger token");
            }
            settings
        } else {
            let settings = Settings::defaults();
            write_file(path, &settings)?;
            log::info!("Created default settings at {}", path.display());
            settings
        };

        Ok(Self {
            path: path.to_path_buf(),
            current: RwLock::new(settings),
        })
    }

    /// Current immutable snapshot.
    pub async fn current(&self) -> Settings {
        self.current.read().await.clone()
    }

    /// Sanitize and persist an operator update. Returns the new snapshot and
    /// whether the sync interval changed, so the caller can re-arm the timer.
    pub async fn apply_update(&self, update: SettingsUpdate) -> Result<(Settings, bool)> {
        let mut guard = self.current.write().await;
        let next = sanitize(&guard, update);
        let interval_changed = next.sync_interval != guard.sync_interval;
        write_file(&self.path, &next)?;
        *guard = next.clone();
        Ok((next, interval_changed))
    }

    /// Record the time of the latest delivery attempt, success or failure.
    pub async fn record_sync_time(&self, timestamp: i64) -> Result<Settings> {
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        next.last_sync_at = timestamp;
        write_file(&self.path, &next)?;
        *guard = next.clone();
        Ok(next)
    }

    /// Replace the trigger token with a freshly generated one.
    pub async fn regenerate_token(&self) -> Result<Settings> {
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        next.trigger_token = generate_token();
        write_file(&self.path, &next)?;
        *guard = next.clone();
        log::info!("Trigger token regenerated");
        Ok(next)
    }
}

/// Merge an update into the current record, normalizing every field.
fn sanitize(current: &Settings, update: SettingsUpdate) -> Settings {
    let trigger_token = match update.trigger_token {
        Some(token) if !token.trim().is_empty() => token.trim().to_string(),
        _ if current.trigger_token.is_empty() => generate_token(),
        _ => current.trigger_token.clone(),
    };

    Settings {
        destination_url: sanitize_url(&update.destination_url),
        sync_interval: update.sync_interval,
        sync_enabled: update.sync_enabled,
        include_images: update.include_images,
        include_variations: update.include_variations,
        include_categories: update.include_categories,
        last_sync_at: current.last_sync_at,
        trigger_token,
    }
}

/// Keep only well-formed http(s) URLs; anything else becomes the empty
/// string, which the sync paths treat as "not configured".
fn sanitize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match reqwest::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => trimmed.to_string(),
        _ => {
            log::warn!("Discarding invalid destination URL: {}", trimmed);
            String::new()
        }
    }
}

/// 32 random alphanumeric characters.
fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn write_file(path: &Path, settings: &Settings) -> Result<()> {
    let raw = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
