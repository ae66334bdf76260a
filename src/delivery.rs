//! Webhook delivery client.
//!
//! Posts export documents (and small connectivity probes) to the configured
//! destination and classifies what came back. The caller decides what a
//! failed delivery means; this layer never retries.

use serde_json::json;

use std::time::Duration;

use crate::error::Result;
use crate::formatter::ExportDocument;

/// Identifies this exporter to the receiving endpoint.
const USER_AGENT: &str = concat!("Catalog-Sync/", env!("CARGO_PKG_VERSION"));

/// Full catalog deliveries get a generous timeout.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connectivity probes carry a tiny payload and give up sooner.
const TEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Classified result of a single POST to the destination.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub message: String,
    pub status_code: Option<u16>,
    pub body: Option<String>,
}

#[derive(Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
}

impl DeliveryClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// POST the full export document to `url` as pretty-printed JSON.
    /// Non-ASCII text goes over the wire unescaped.
    pub async fn deliver(&self, url: &str, document: &ExportDocument) -> Result<DeliveryOutcome> {
        let body = serde_json::to_string_pretty(document)?;
        Ok(self.post(url, body, DELIVERY_TIMEOUT).await)
    }

    /// POST the minimal connectivity-test payload to `url`.
    pub async fn send_test(&self, url: &str) -> DeliveryOutcome {
        let body = json!({
            "test": true,
            "message": "Connection test from Catalog Sync",
        })
        .to_string();
        self.post(url, body, TEST_TIMEOUT).await
    }

    async fn post(&self, url: &str, body: String, timeout: Duration) -> DeliveryOutcome {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .timeout(timeout)
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::error!("Delivery to {} failed: {}", url, e);
                return DeliveryOutcome {
                    success: false,
                    message: e.to_string(),
                    status_code: None,
                    body: None,
                };
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            DeliveryOutcome {
                success: true,
                message: format!("Delivered with HTTP {}", status),
                status_code: Some(status),
                body: Some(body),
            }
        } else {
            log::error!("Destination answered HTTP {}: {}", status, body);
            DeliveryOutcome {
                success: false,
                message: format!("HTTP error {}", status),
                status_code: Some(status),
                body: Some(body),
            }
        }
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
