//! Remote operations against the image-to-3D API server

use crate::config::ClientConfig;
use crate::types::{
    GenerateError, JobHandle, JobStatus, Result, StatusResponse, SubmitPayload, SubmitResponse,
};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The three backend calls a generation session needs
///
/// Implementations hold no per-session state; every call is independent.
pub trait Transport: Send + Sync {
    /// Endpoint root, used in error messages
    fn base_url(&self) -> &str;

    /// Check that the backend answers; never fails
    fn probe(&self) -> impl Future<Output = bool> + Send;

    /// Start a job. Not idempotent: every call creates a new job.
    fn submit(&self, payload: &SubmitPayload) -> impl Future<Output = Result<JobHandle>> + Send;

    /// Fetch the current status of a job
    fn poll_status(&self, handle: &JobHandle) -> impl Future<Output = Result<JobStatus>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn base_url(&self) -> &str {
        (**self).base_url()
    }

    fn probe(&self) -> impl Future<Output = bool> + Send {
        (**self).probe()
    }

    fn submit(&self, payload: &SubmitPayload) -> impl Future<Output = Result<JobHandle>> + Send {
        (**self).submit(payload)
    }

    fn poll_status(&self, handle: &JobHandle) -> impl Future<Output = Result<JobStatus>> + Send {
        (**self).poll_status(handle)
    }
}

/// HTTP transport for the image-to-3D API server
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    health_timeout: Duration,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            health_timeout: config.health_timeout,
            request_timeout: config.request_timeout,
        }
    }

    fn health_url(&self) -> String {
        format!("{}/api/health", self.base_url)
    }

    fn send_url(&self) -> String {
        format!("{}/api/send", self.base_url)
    }

    fn status_url(&self, handle: &JobHandle) -> String {
        format!("{}/api/status/{}", self.base_url, handle)
    }
}

impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn probe(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health probe to {} failed: {}", self.base_url, e);
                false
            }
        }
    }

    async fn submit(&self, payload: &SubmitPayload) -> Result<JobHandle> {
        let response = self
            .client
            .post(self.send_url())
            .json(payload)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Submission to {} failed: {}", self.base_url, e);
                GenerateError::BackendUnreachable(self.base_url.clone())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|_| GenerateError::BackendUnreachable(self.base_url.clone()))?;

        if !status.is_success() {
            return Err(GenerateError::BackendRejected {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(parsed) if !parsed.uid.is_empty() => Ok(JobHandle::new(parsed.uid)),
            _ => Err(GenerateError::BackendRejected {
                status: status.as_u16(),
                body,
            }),
        }
    }

    async fn poll_status(&self, handle: &JobHandle) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.status_url(handle))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::PollingError(format!(
                        "status request timed out after {}s",
                        self.request_timeout.as_secs()
                    ))
                } else {
                    GenerateError::PollingError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerateError::PollingError(format!(
                "status request failed ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<StatusResponse>()
            .await
            .map(JobStatus::from)
            .map_err(|e| {
                GenerateError::PollingError(format!("Failed to parse status response: {}", e))
            })
    }
}
