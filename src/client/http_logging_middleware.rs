//! HTTP logging middleware with sensitive header redaction.
//!
//! Redaction is on by default:
//! - `authorization`: logged as "Bearer [REDACTED]" (scheme visible by default)
//! - `cookie` / `set-cookie`: "[REDACTED]"
//! - `x-api-key`, `proxy-authorization`, `x-auth-token`: "[REDACTED]"
//!
//! # Examples
//!
//! ```rust
//! use taskflow::client::http_logging_middleware::HttpLoggingMiddleware;
//! use taskflow::client::http_middleware::HttpMiddlewareChain;
//! use std::sync::Arc;
//!
//! let mut chain = HttpMiddlewareChain::new();
//! chain.add(Arc::new(
//!     HttpLoggingMiddleware::new()
//!         .with_level(tracing::Level::DEBUG)
//!         .with_max_body_bytes(512),
//! ));
//! ```

use crate::client::http_middleware::{
    HttpMiddleware, HttpMiddlewareContext, HttpRequest, HttpResponse,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use http::header::HeaderName;
use http::HeaderMap;
use std::collections::HashSet;

/// HTTP logging middleware with sensitive header redaction.
#[derive(Debug, Clone)]
pub struct HttpLoggingMiddleware {
    level: tracing::Level,
    redact_headers: HashSet<HeaderName>,
    show_auth_scheme: bool,
    max_header_value_len: Option<usize>,
    max_body_bytes: Option<usize>,
}

impl Default for HttpLoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpLoggingMiddleware {
    /// Create a logging middleware with the default redaction list, DEBUG
    /// level and no body logging.
    pub fn new() -> Self {
        let redact_headers = [
            "authorization",
            "cookie",
            "set-cookie",
            "x-api-key",
            "proxy-authorization",
            "x-auth-token",
        ]
        .into_iter()
        .map(HeaderName::from_static)
        .collect();

        Self {
            level: tracing::Level::DEBUG,
            redact_headers,
            show_auth_scheme: true,
            max_header_value_len: None,
            max_body_bytes: None,
        }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Add a header to the redaction list.
    pub fn redact_header(mut self, name: HeaderName) -> Self {
        self.redact_headers.insert(name);
        self
    }

    /// Remove a header from the redaction list.
    pub fn allow_header(mut self, name: &HeaderName) -> Self {
        self.redact_headers.remove(name);
        self
    }

    /// Show the scheme ("Bearer") of redacted Authorization headers.
    pub fn with_show_auth_scheme(mut self, show: bool) -> Self {
        self.show_auth_scheme = show;
        self
    }

    /// Truncate header values longer than `max_len`.
    pub fn with_max_header_value_len(mut self, max_len: usize) -> Self {
        self.max_header_value_len = Some(max_len);
        self
    }

    /// Log up to `max_bytes` of each body.
    pub fn with_max_body_bytes(mut self, max_bytes: usize) -> Self {
        self.max_body_bytes = Some(max_bytes);
        self
    }

    /// Redact a header value according to its name.
    pub fn redact_header_value(&self, name: &HeaderName, value: &str) -> String {
        if !self.redact_headers.contains(name) {
            return self.truncate_value(value);
        }

        if *name == http::header::AUTHORIZATION && self.show_auth_scheme {
            match value.split_once(' ') {
                Some((scheme, _)) => format!("{} [REDACTED]", scheme),
                None => "[REDACTED]".to_string(),
            }
        } else {
            "[REDACTED]".to_string()
        }
    }

    fn truncate_value(&self, value: &str) -> String {
        match self.max_header_value_len {
            Some(max_len) if value.len() > max_len => {
                let mut cut = max_len;
                while !value.is_char_boundary(cut) {
                    cut -= 1;
                }
                format!("{}...", &value[..cut])
            },
            _ => value.to_string(),
        }
    }

    /// Format headers for logging with redaction applied.
    pub fn format_headers(&self, headers: &HeaderMap) -> String {
        let mut parts = Vec::new();
        for name in headers.keys() {
            let values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|v| self.redact_header_value(name, v.to_str().unwrap_or("<invalid-utf8>")))
                .collect();

            if values.len() == 1 {
                parts.push(format!("{}: {}", name.as_str(), values[0]));
            } else {
                for (idx, value) in values.iter().enumerate() {
                    parts.push(format!("{}[{}]: {}", name.as_str(), idx, value));
                }
            }
        }

        if parts.is_empty() {
            "(no headers)".to_string()
        } else {
            parts.join(", ")
        }
    }

    fn body_info(&self, body: &[u8]) -> String {
        match self.max_body_bytes {
            Some(max_bytes) if !body.is_empty() => {
                let preview_len = max_bytes.min(body.len());
                let preview = String::from_utf8_lossy(&body[..preview_len]);
                if body.len() > max_bytes {
                    format!(" body={}B (showing {}B): {}...", body.len(), preview_len, preview)
                } else {
                    format!(" body={}B: {}", body.len(), preview)
                }
            },
            _ => format!(" body={}B", body.len()),
        }
    }

    fn emit(&self, request_id: Option<&str>, line: &str) {
        match self.level {
            tracing::Level::TRACE => tracing::trace!(request_id, "{}", line),
            tracing::Level::DEBUG => tracing::debug!(request_id, "{}", line),
            tracing::Level::INFO => tracing::info!(request_id, "{}", line),
            tracing::Level::WARN => tracing::warn!(request_id, "{}", line),
            _ => tracing::error!(request_id, "{}", line),
        }
    }

    fn log_request(&self, request: &HttpRequest, context: &HttpMiddlewareContext) {
        let line = format!(
            "HTTP {} {} | headers: [{}]{}",
            request.method,
            request.url,
            self.format_headers(&request.headers),
            self.body_info(&request.body)
        );
        self.emit(context.request_id.as_deref(), &line);
    }

    fn log_response(&self, response: &HttpResponse, context: &HttpMiddlewareContext) {
        let marker = if response.is_success() {
            "✓"
        } else if response.is_client_error() {
            "⚠"
        } else if response.is_server_error() {
            "✗"
        } else {
            "→"
        };
        let line = format!(
            "{} HTTP {} {} {} | headers: [{}]{}",
            marker,
            response.status,
            context.method,
            context.url,
            self.format_headers(&response.headers),
            self.body_info(&response.body)
        );
        self.emit(context.request_id.as_deref(), &line);
    }
}

#[async_trait]
impl HttpMiddleware for HttpLoggingMiddleware {
    async fn on_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        self.log_request(request, context);
        Ok(())
    }

    async fn on_response(
        &self,
        response: &mut HttpResponse,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        self.log_response(response, context);
        Ok(())
    }

    async fn on_error(&self, error: &Error, context: &HttpMiddlewareContext) -> Result<()> {
        tracing::warn!(
            request_id = context.request_id.as_deref(),
            "HTTP {} {} failed: {}",
            context.method,
            context.url,
            error
        );
        Ok(())
    }

    fn priority(&self) -> i32 {
        // Runs after token injection so the logged headers are the ones sent.
        100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_keeps_scheme() {
        let middleware = HttpLoggingMiddleware::new();
        let name = HeaderName::from_static("authorization");
        assert_eq!(
            middleware.redact_header_value(&name, "Bearer my-secret-token"),
            "Bearer [REDACTED]"
        );
        assert_eq!(middleware.redact_header_value(&name, "opaque"), "[REDACTED]");
    }

    #[test]
    fn authorization_without_scheme() {
        let middleware = HttpLoggingMiddleware::new().with_show_auth_scheme(false);
        let name = HeaderName::from_static("authorization");
        assert_eq!(
            middleware.redact_header_value(&name, "Bearer my-secret-token"),
            "[REDACTED]"
        );
    }

    #[test]
    fn non_sensitive_header_passes_through() {
        let middleware = HttpLoggingMiddleware::new().with_max_header_value_len(10);
        let name = HeaderName::from_static("content-type");
        assert_eq!(
            middleware.redact_header_value(&name, "application/json; charset=utf-8"),
            "applicatio..."
        );
    }

    #[test]
    fn allow_header_disables_redaction() {
        let name = HeaderName::from_static("x-api-key");
        let middleware = HttpLoggingMiddleware::new().allow_header(&name);
        assert_eq!(middleware.redact_header_value(&name, "k-123"), "k-123");
    }

    #[test]
    fn format_headers_never_leaks_tokens() {
        let middleware = HttpLoggingMiddleware::new();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc.def".parse().unwrap());
        headers.append("set-cookie", "a=1".parse().unwrap());
        headers.append("set-cookie", "b=2".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());

        let formatted = middleware.format_headers(&headers);
        assert!(!formatted.contains("abc.def"));
        assert!(!formatted.contains("a=1"));
        assert!(formatted.contains("set-cookie[1]: [REDACTED]"));
        assert!(formatted.contains("content-type: application/json"));
        assert_eq!(middleware.format_headers(&HeaderMap::new()), "(no headers)");
    }

    #[test]
    fn body_preview_is_bounded() {
        let middleware = HttpLoggingMiddleware::new().with_max_body_bytes(4);
        assert_eq!(
            middleware.body_info(b"abcdefgh"),
            " body=8B (showing 4B): abcd..."
        );
        assert_eq!(HttpLoggingMiddleware::new().body_info(b"abc"), " body=3B");
    }
}
