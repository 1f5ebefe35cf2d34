//! HTTP transport abstraction.
//!
//! [`HttpTransport`] performs exactly one HTTP exchange. The production
//! implementation wraps `reqwest`; tests and embedders can substitute their
//! own.

use crate::client::http_middleware::{HttpRequest, HttpResponse};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Performs a single HTTP request. Implementations never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the raw response. Fails with
    /// [`Error::Network`] when no status could be obtained.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport. `timeout` of `None` keeps the reqwest default (no
    /// overall timeout).
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("taskflow/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, &url).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::network(format!("{}: {}", url, e)))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
