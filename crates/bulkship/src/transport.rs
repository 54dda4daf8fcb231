// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP transport sink.
//!
//! Ships a serialized batch as a single `POST {server}/_bulk` request with
//! a fixed timeout. No internal retry; a failed batch is lost for the
//! network sink.

use crate::config::ConfigError;
use crate::error::ShipperError;
use std::future::Future;
use std::time::Duration;

/// Fixed timeout for one bulk request.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(5);

/// Seam between the flush cycle and the network. Implementations report
/// the backend's status text on success.
pub trait BulkTransport: Send + Sync + 'static {
    /// Ship one serialized batch.
    fn send(&self, body: String) -> impl Future<Output = Result<String, ShipperError>> + Send;
}

/// Bulk transport over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    bulk_url: reqwest::Url,
}

impl HttpTransport {
    /// Build a transport for the given server base URL.
    pub fn new(server: &str) -> Result<Self, ConfigError> {
        let base = server.trim_end_matches('/');
        let bulk_url = reqwest::Url::parse(&format!("{}/_bulk", base))
            .map_err(|e| ConfigError::Invalid(format!("bad server URL {:?}: {}", base, e)))?;
        if bulk_url.scheme() != "http" && bulk_url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "server URL must be http or https, got {:?}",
                bulk_url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(BULK_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self { client, bulk_url })
    }

    /// The resolved bulk endpoint URL.
    pub fn bulk_url(&self) -> &str {
        self.bulk_url.as_str()
    }
}

impl BulkTransport for HttpTransport {
    async fn send(&self, body: String) -> Result<String, ShipperError> {
        let response = self
            .client
            .post(self.bulk_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ShipperError::Timeout(BULK_TIMEOUT)
                } else {
                    ShipperError::Transport {
                        message: e.to_string(),
                        status: None,
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()))
        } else {
            Err(ShipperError::Transport {
                message: format!("server returned {}", status),
                status: Some(status.as_u16()),
            })
        }
    }
}
