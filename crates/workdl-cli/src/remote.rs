//! HTTP client for a running `workdl serve`.
//!
//! The queue lives in the server process, so queue commands talk to its API
//! instead of building a local engine.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use workdl_core::DownloadSessionView;

use crate::error::CliError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct QueueView {
    pub items: Vec<String>,
    pub processing: Option<String>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueView {
    pub added: Vec<String>,
    pub duplicates: Vec<String>,
    pub queue: QueueView,
}

#[derive(Debug, Deserialize)]
pub struct RemoveView {
    pub removed: bool,
    pub queue: QueueView,
}

#[derive(Debug, Deserialize)]
pub struct ClearView {
    pub cleared: usize,
}

#[derive(Debug, Deserialize)]
pub struct ProcessView {
    pub pending: usize,
    pub continuous: bool,
}

#[derive(Debug, Deserialize)]
struct StopView {
    stopped: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorView {
    error: String,
}

/// Thin typed wrapper over the `/api` routes.
pub struct ApiClient {
    base: String,
    http: Client,
}

impl ApiClient {
    pub fn new(server: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base: server.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn queue(&self) -> Result<QueueView> {
        self.send(self.request(Method::GET, "/queue")).await
    }

    pub async fn enqueue(&self, items: &[String]) -> Result<EnqueueView> {
        let req = self
            .request(Method::POST, "/queue")
            .json(&json!({ "items": items }));
        self.send(req).await
    }

    pub async fn clear_queue(&self) -> Result<ClearView> {
        self.send(self.request(Method::DELETE, "/queue")).await
    }

    pub async fn remove(&self, item: &str) -> Result<RemoveView> {
        let path = format!("/queue/{}", encode_segment(item));
        self.send(self.request(Method::DELETE, &path)).await
    }

    pub async fn process(&self) -> Result<ProcessView> {
        self.send(self.request(Method::POST, "/queue/process")).await
    }

    pub async fn status(&self) -> Result<DownloadSessionView> {
        self.send(self.request(Method::GET, "/download/status")).await
    }

    pub async fn stop(&self) -> Result<bool> {
        let view: StopView = self
            .send(self.request(Method::POST, "/download/stop"))
            .await?;
        Ok(view.stopped)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api{}", self.base, path);
        debug!(target: "workdl.cli", %method, %url, "API request");
        self.http.request(method, url)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = req
            .send()
            .await
            .with_context(|| format!("could not reach workdl server at {}", self.base))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .context("unexpected response from workdl server");
        }

        let body = response.text().await.unwrap_or_default();
        Err(CliError::from_status(status.as_u16(), error_message(&body, status.as_u16())).into())
    }
}

/// Pull `error` out of an API error body, falling back to the raw text.
fn error_message(body: &str, status: u16) -> String {
    if let Ok(view) = serde_json::from_str::<ErrorView>(body) {
        return view.error;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        _ if body.trim().is_empty() => format!("server returned HTTP {status}"),
        _ => body.trim().to_string(),
    }
}

/// Percent-encode a path segment; links pasted as ids contain `/` and `?`.
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
