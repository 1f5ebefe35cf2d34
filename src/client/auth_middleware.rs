//! Bearer-token middleware fed by the current session.
//!
//! The middleware reads the `Authorization` value from a [`TokenSource`] on
//! every request, so a login or logout is picked up by the very next call
//! without rebuilding the client. A missing token is not an error here; the
//! backend decides what an anonymous request may do.

use crate::client::http_middleware::{
    HttpMiddleware, HttpMiddlewareContext, HttpRequest, SKIP_AUTH,
};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of the `Authorization` header value.
pub trait TokenSource: Send + Sync {
    /// Full header value (`Bearer <token>`), or `None` when signed out.
    fn authorization(&self) -> Option<String>;
}

/// Fixed token, useful for scripts and tests.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a raw bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

impl TokenSource for StaticToken {
    fn authorization(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.0))
        }
    }
}

/// Injects `Authorization` from a [`TokenSource`].
///
/// # Examples
///
/// ```rust
/// use taskflow::client::auth_middleware::{BearerAuthMiddleware, StaticToken};
/// use taskflow::client::http_middleware::HttpMiddlewareChain;
/// use std::sync::Arc;
///
/// let mut chain = HttpMiddlewareChain::new();
/// chain.add(Arc::new(BearerAuthMiddleware::new(Arc::new(StaticToken::bearer("t0k3n")))));
/// assert_eq!(chain.len(), 1);
/// ```
pub struct BearerAuthMiddleware {
    source: Arc<dyn TokenSource>,
}

impl BearerAuthMiddleware {
    /// Create the middleware around a token source.
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self { source }
    }
}

impl std::fmt::Debug for BearerAuthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthMiddleware")
            .field("signed_in", &self.source.authorization().is_some())
            .finish()
    }
}

#[async_trait]
impl HttpMiddleware for BearerAuthMiddleware {
    async fn on_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        if context.get_metadata(SKIP_AUTH).is_some() {
            return Ok(());
        }

        if request.has_header("authorization") {
            tracing::warn!(
                "Authorization header already present - skipping session token injection"
            );
            return Ok(());
        }

        match self.source.authorization() {
            Some(value) => {
                request.add_header("authorization", &value)?;
                tracing::trace!("session token injected into Authorization header");
            },
            None => tracing::trace!("no session token; sending request anonymously"),
        }
        Ok(())
    }

    fn priority(&self) -> i32 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::http_middleware::HttpResponse;
    use http::Method;

    struct SignedOut;

    impl TokenSource for SignedOut {
        fn authorization(&self) -> Option<String> {
            None
        }
    }

    fn context() -> HttpMiddlewareContext {
        HttpMiddlewareContext::new("http://example.com/tasks", Method::GET)
    }

    #[tokio::test]
    async fn injects_bearer_header() {
        let middleware = BearerAuthMiddleware::new(Arc::new(StaticToken::bearer("secret")));
        let mut request = HttpRequest::new(Method::GET, "http://example.com/tasks", vec![]);
        middleware.on_request(&mut request, &context()).await.unwrap();
        assert_eq!(request.get_header("Authorization"), Some("Bearer secret"));
    }

    #[tokio::test]
    async fn signed_out_sends_no_header() {
        let middleware = BearerAuthMiddleware::new(Arc::new(SignedOut));
        let mut request = HttpRequest::new(Method::GET, "http://example.com/tasks", vec![]);
        middleware.on_request(&mut request, &context()).await.unwrap();
        assert!(!request.has_header("authorization"));
    }

    #[tokio::test]
    async fn skip_auth_requests_stay_anonymous() {
        let middleware = BearerAuthMiddleware::new(Arc::new(StaticToken::bearer("secret")));
        let ctx = context();
        ctx.set_metadata(SKIP_AUTH, "true");
        let mut request = HttpRequest::new(Method::POST, "http://example.com/auth/login", vec![]);
        middleware.on_request(&mut request, &ctx).await.unwrap();
        assert!(!request.has_header("authorization"));
    }

    #[tokio::test]
    async fn existing_header_is_kept() {
        let middleware = BearerAuthMiddleware::new(Arc::new(StaticToken::bearer("secret")));
        let mut request = HttpRequest::new(Method::GET, "http://example.com/tasks", vec![]);
        request.add_header("Authorization", "Basic abc").unwrap();
        middleware.on_request(&mut request, &context()).await.unwrap();
        assert_eq!(request.get_header("authorization"), Some("Basic abc"));
    }

    #[tokio::test]
    async fn rejected_responses_pass_through_unchanged() {
        let middleware = BearerAuthMiddleware::new(Arc::new(StaticToken::bearer("secret")));
        let ctx = context();
        let mut response = HttpResponse::new(401, br#"{"message":"expired"}"#.to_vec());
        middleware.on_response(&mut response, &ctx).await.unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.body, br#"{"message":"expired"}"#.to_vec());
        assert!(ctx.metadata.read().is_empty());
    }
}
