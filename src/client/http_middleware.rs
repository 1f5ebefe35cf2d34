//! HTTP middleware for request/response transformation.
//!
//! Middleware runs at the HTTP layer, between the typed API operations and
//! the transport. The client uses it for bearer-token injection and
//! redacted request logging; callers can add their own (correlation ids,
//! extra headers).

use crate::error::{Error, Result};
use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata key set on requests that must not carry the session token.
pub const SKIP_AUTH: &str = "skip_auth";

/// Context shared by every middleware for one request.
#[derive(Debug, Clone)]
pub struct HttpMiddlewareContext {
    /// Request ID for log correlation
    pub request_id: Option<String>,
    /// URL being requested
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// Custom metadata
    pub metadata: Arc<parking_lot::RwLock<HashMap<String, String>>>,
}

impl HttpMiddlewareContext {
    /// Create a new HTTP middleware context
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            request_id: None,
            url: url.into(),
            method,
            metadata: Arc::new(parking_lot::RwLock::new(HashMap::new())),
        }
    }

    /// Attach a request id
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set metadata value
    pub fn set_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.write().insert(key.into(), value.into());
    }

    /// Get metadata value
    pub fn get_metadata(&self, key: &str) -> Option<String> {
        self.metadata.read().get(key).cloned()
    }
}

/// Outgoing HTTP request as seen by middleware and transports.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a new HTTP request
    pub fn new(method: Method, url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Add or replace a header. Invalid names or values are rejected.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::config(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::config(format!("invalid value for header {}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Check if a header is present (case-insensitive)
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Get a header value as text
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// HTTP response as seen by middleware and the response decoder.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Get a header value as text
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// HTTP-level middleware trait.
///
/// # Examples
///
/// ```rust
/// use taskflow::client::http_middleware::{HttpMiddleware, HttpRequest, HttpMiddlewareContext};
/// use async_trait::async_trait;
///
/// struct ClientVersionMiddleware;
///
/// #[async_trait]
/// impl HttpMiddleware for ClientVersionMiddleware {
///     async fn on_request(
///         &self,
///         request: &mut HttpRequest,
///         _context: &HttpMiddlewareContext,
///     ) -> taskflow::Result<()> {
///         request.add_header("X-Client-Version", env!("CARGO_PKG_VERSION"))
///     }
/// }
/// ```
#[async_trait]
pub trait HttpMiddleware: Send + Sync {
    /// Called before the request is sent
    async fn on_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        let _ = (request, context);
        Ok(())
    }

    /// Called after a response is received, before it is decoded
    async fn on_response(
        &self,
        response: &mut HttpResponse,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        let _ = (response, context);
        Ok(())
    }

    /// Called when the transport fails before producing a response
    async fn on_error(&self, error: &Error, context: &HttpMiddlewareContext) -> Result<()> {
        let _ = (error, context);
        Ok(())
    }

    /// Priority for ordering (lower runs first on requests)
    fn priority(&self) -> i32 {
        50
    }

    /// Should this middleware execute for this context?
    async fn should_execute(&self, _context: &HttpMiddlewareContext) -> bool {
        true
    }
}

/// Ordered chain of HTTP middleware.
#[derive(Clone, Default)]
pub struct HttpMiddlewareChain {
    middlewares: Vec<Arc<dyn HttpMiddleware>>,
}

impl HttpMiddlewareChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware to the chain, keeping it sorted by priority
    pub fn add(&mut self, middleware: Arc<dyn HttpMiddleware>) {
        self.middlewares.push(middleware);
        self.middlewares.sort_by_key(|m| m.priority());
    }

    /// Number of middleware in the chain
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run every middleware's request hook in priority order
    pub async fn process_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        for middleware in &self.middlewares {
            if middleware.should_execute(context).await {
                middleware.on_request(request, context).await?;
            }
        }
        Ok(())
    }

    /// Run every middleware's response hook in reverse priority order
    pub async fn process_response(
        &self,
        response: &mut HttpResponse,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        for middleware in self.middlewares.iter().rev() {
            if middleware.should_execute(context).await {
                middleware.on_response(response, context).await?;
            }
        }
        Ok(())
    }

    /// Notify middleware of a transport failure. Hook errors are logged and
    /// otherwise ignored so the original error reaches the caller.
    pub async fn process_error(&self, error: &Error, context: &HttpMiddlewareContext) {
        for middleware in self.middlewares.iter().rev() {
            if middleware.should_execute(context).await {
                if let Err(e) = middleware.on_error(error, context).await {
                    tracing::warn!(request_id = ?context.request_id, "error hook failed: {}", e);
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpMiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMiddlewareChain")
            .field("count", &self.middlewares.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl HttpMiddleware for Recorder {
        async fn on_request(
            &self,
            _request: &mut HttpRequest,
            _context: &HttpMiddlewareContext,
        ) -> Result<()> {
            self.log.lock().push(format!("req:{}", self.name));
            Ok(())
        }

        async fn on_response(
            &self,
            _response: &mut HttpResponse,
            _context: &HttpMiddlewareContext,
        ) -> Result<()> {
            self.log.lock().push(format!("resp:{}", self.name));
            Ok(())
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[tokio::test]
    async fn chain_orders_by_priority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = HttpMiddlewareChain::new();
        for (name, priority) in [("late", 90), ("early", 10), ("mid", 50)] {
            chain.add(Arc::new(Recorder {
                name,
                priority,
                log: log.clone(),
            }));
        }

        let context = HttpMiddlewareContext::new("http://test", Method::GET);
        let mut request = HttpRequest::new(Method::GET, "http://test", vec![]);
        chain.process_request(&mut request, &context).await.unwrap();
        let mut response = HttpResponse::new(200, Vec::new());
        chain.process_response(&mut response, &context).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "req:early",
                "req:mid",
                "req:late",
                "resp:late",
                "resp:mid",
                "resp:early"
            ]
        );
    }

    #[test]
    fn request_headers_are_case_insensitive() {
        let mut request = HttpRequest::new(Method::POST, "http://test", vec![]);
        request.add_header("Content-Type", "application/json").unwrap();
        assert!(request.has_header("content-type"));
        assert_eq!(request.get_header("CONTENT-TYPE"), Some("application/json"));
        assert!(request.add_header("bad header", "x").is_err());
    }

    #[test]
    fn response_classes() {
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(HttpResponse::new(404, Vec::new()).is_client_error());
        assert!(HttpResponse::new(503, Vec::new()).is_server_error());
    }

    #[test]
    fn context_metadata() {
        let context = HttpMiddlewareContext::new("http://test", Method::GET);
        assert_eq!(context.get_metadata(SKIP_AUTH), None);
        context.set_metadata(SKIP_AUTH, "true");
        assert_eq!(context.get_metadata(SKIP_AUTH).as_deref(), Some("true"));
    }
}
