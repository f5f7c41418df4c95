//! Raw HTTP assertions against the ERP API
//!
//! The API scenarios bypass the browser entirely: they issue requests and
//! assert on status codes and bodies. A 2xx response yields the parsed
//! body; anything else is surfaced as an error carrying the status and
//! the raw body so the scenario can assert on either.

use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Thin client over `reqwest` with the harness's response policy
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> HarnessResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Same client with a bearer token attached to every request.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Same client with no credentials, for negative auth checks.
    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Poll the health endpoint until the API answers 2xx. Connection
    /// errors are expected while the system is still starting.
    pub async fn wait_ready(&self, timeout: Duration) -> HarnessResult<()> {
        let url = format!("{}/health", self.base_url);
        let start = Instant::now();
        let mut attempts = 0usize;

        while start.elapsed() < timeout {
            attempts += 1;
            match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(attempts, "API is ready at {}", self.base_url);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!(status = %resp.status(), "health check not ready");
                }
                Err(e) => {
                    if attempts == 1 {
                        debug!("waiting for API to come up...");
                    }
                    if !e.is_connect() {
                        warn!("health check error: {e}");
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(HarnessError::WaitTimeout {
            what: format!("API readiness at {url}"),
            waited_ms: start.elapsed().as_millis() as u64,
        })
    }

    pub async fn get(&self, path: &str) -> HarnessResult<Value> {
        let req = self.client.get(self.url(path));
        self.send(req).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> HarnessResult<Value> {
        let req = self.client.post(self.url(path)).json(body);
        self.send(req).await
    }

    pub async fn delete(&self, path: &str) -> HarnessResult<Value> {
        let req = self.client.delete(self.url(path));
        self.send(req).await
    }

    /// Issue `n` requests concurrently and collect every result. The
    /// backend's tolerance of concurrent writes is the property under
    /// test here, not the harness's own concurrency control.
    pub async fn fan_out<F>(&self, n: usize, make_body: F) -> Vec<HarnessResult<Value>>
    where
        F: Fn(usize) -> (String, Value),
    {
        let requests = (0..n).map(|i| {
            let (path, body) = make_body(i);
            let client = self.clone();
            async move { client.post_json(&path, &body).await }
        });
        join_all(requests).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> HarnessResult<Value> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status.is_success() {
            if body.is_empty() {
                return Ok(Value::Null);
            }
            // Some endpoints answer 2xx with a non-JSON body; surface it
            // as a string rather than failing the scenario on parse.
            Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
        } else {
            Err(HarnessError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}
