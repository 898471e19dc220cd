//! HTTP control transport: `POST <api-root>/control?msg=<envelope>`.

use crate::domain::errors::ControlError;
use crate::ports::outbound::ControlTransport;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Control endpoint client.
pub struct HttpControlTransport {
    client: Client,
    endpoint: String,
}

impl HttpControlTransport {
    /// Client with the default timeouts (5s request, 2s connect).
    pub fn new(api_root: &str) -> Result<Self, ControlError> {
        Self::with_timeouts(api_root, Duration::from_secs(5), Duration::from_secs(2))
    }

    pub fn with_timeouts(
        api_root: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ControlError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ControlError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: Self::endpoint_for(api_root),
        })
    }

    fn endpoint_for(api_root: &str) -> String {
        format!("{}/control", api_root.trim_end_matches('/'))
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ControlTransport for HttpControlTransport {
    async fn post(&self, envelope: &str) -> Result<String, ControlError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("msg", envelope)])
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ControlError::Transport(format!("Cannot connect to {}", self.endpoint))
                } else {
                    ControlError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ControlError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Control response");

        if !status.is_success() {
            return Err(ControlError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
