//! API gateway client for the task REST service.
//!
//! [`ApiClient`] exposes one async operation per backend capability and
//! translates between typed values and HTTP exchanges:
//!
//! | Operation        | Request                | Success        |
//! |------------------|------------------------|----------------|
//! | `auth_login`     | `POST /auth/login`     | `AuthResponse` |
//! | `auth_register`  | `POST /auth/register`  | `AuthResponse` |
//! | `tasks_list`     | `GET /tasks`           | `Vec<Task>`    |
//! | `task_get`       | `GET /tasks/:id`       | `Task`         |
//! | `task_create`    | `POST /tasks`          | `Task`         |
//! | `task_update`    | `PUT /tasks/:id`       | `Task`         |
//! | `task_delete`    | `DELETE /tasks/:id`    | `Option<DeleteResponse>` |
//!
//! Every request passes through an [`HttpMiddlewareChain`]; the default
//! chain injects the session's bearer token and logs each exchange with
//! sensitive headers redacted. The client makes exactly one attempt per
//! call and never recovers errors: retry and caching belong to the
//! [`cache`](crate::cache) layer.
//!
//! # Response handling
//!
//! - non-2xx: [`Error::Api`] (or [`Error::Auth`] for login/register) whose
//!   message is the `message` or `error` field of a JSON error body, or
//!   `HTTP <status>` otherwise
//! - 204, or any 2xx with an empty body: no value
//! - other 2xx: JSON decoded into the target type; failures are
//!   [`Error::Parse`]

pub mod auth_middleware;
pub mod http_logging_middleware;
pub mod http_middleware;
pub mod transport;

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{
    AuthResponse, DeleteResponse, LoginRequest, RegisterRequest, Task, TaskRequest,
};
use auth_middleware::{BearerAuthMiddleware, TokenSource};
use http_logging_middleware::HttpLoggingMiddleware;
use http_middleware::{
    HttpMiddleware, HttpMiddlewareChain, HttpMiddlewareContext, HttpRequest, HttpResponse,
    SKIP_AUTH,
};
use transport::{HttpTransport, ReqwestTransport};

/// Authentication capabilities of the backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`.
    async fn auth_login(&self, request: &LoginRequest) -> Result<AuthResponse>;

    /// `POST /auth/register`.
    async fn auth_register(&self, request: &RegisterRequest) -> Result<AuthResponse>;
}

/// Task capabilities of the backend.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `GET /tasks`.
    async fn tasks_list(&self) -> Result<Vec<Task>>;

    /// `GET /tasks/:id`.
    async fn task_get(&self, id: i64) -> Result<Task>;

    /// `POST /tasks`.
    async fn task_create(&self, request: &TaskRequest) -> Result<Task>;

    /// `PUT /tasks/:id`.
    async fn task_update(&self, id: i64, request: &TaskRequest) -> Result<Task>;

    /// `DELETE /tasks/:id`. `None` for a `204 No Content` reply.
    async fn task_delete(&self, id: i64) -> Result<Option<DeleteResponse>>;
}

/// How non-2xx responses of an endpoint are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    /// Login/register: anonymous, failures are [`Error::Auth`].
    Auth,
    /// Everything else: bearer token attached, failures are [`Error::Api`].
    Resource,
}

/// HTTP client for the task service.
///
/// Cheap to clone; clones share the transport and middleware chain.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use taskflow::client::{ApiClient, TaskApi};
/// use taskflow::client::auth_middleware::StaticToken;
///
/// # async fn run() -> taskflow::Result<()> {
/// let client = ApiClient::builder("http://localhost:8080/api")
///     .token_source(Arc::new(StaticToken::bearer("t0k3n")))
///     .build()?;
/// let tasks = client.tasks_list().await?;
/// println!("{} tasks", tasks.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    base_url: Arc<str>,
    transport: Arc<dyn HttpTransport>,
    middleware: Arc<HttpMiddlewareChain>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl ApiClient {
    /// Build a client from configuration with the default middleware
    /// (bearer token from `tokens`, redacted logging).
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        config.validate()?;
        let mut logging = HttpLoggingMiddleware::new();
        if config.log_bodies {
            logging = logging.with_max_body_bytes(1024);
        }
        Self::builder(&config.base_url)
            .timeout(config.timeout())
            .token_source(tokens)
            .middleware(Arc::new(logging))
            .build()
    }

    /// Start building a client for `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Perform one exchange and decode the body.
    async fn execute<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        endpoint: Endpoint,
    ) -> Result<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        let url = self.url(path);
        let payload = match body {
            Some(body) => serde_json::to_vec(body)
                .map_err(|e| Error::parse(format!("failed to encode request body: {}", e)))?,
            None => Vec::new(),
        };

        let mut request = HttpRequest::new(method.clone(), url.clone(), payload);
        request.add_header("content-type", "application/json")?;
        request.add_header("accept", "application/json")?;

        let context = HttpMiddlewareContext::new(url, method)
            .with_request_id(uuid::Uuid::new_v4().to_string());
        if endpoint == Endpoint::Auth {
            context.set_metadata(SKIP_AUTH, "true");
        }

        self.middleware.process_request(&mut request, &context).await?;

        let mut response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                self.middleware.process_error(&e, &context).await;
                return Err(e);
            },
        };

        self.middleware
            .process_response(&mut response, &context)
            .await?;

        decode_response(&response, endpoint)
    }
}

/// Decode a response according to the gateway contract.
pub(crate) fn decode_response<T: DeserializeOwned>(
    response: &HttpResponse,
    endpoint: Endpoint,
) -> Result<Option<T>> {
    if !response.is_success() {
        let message = error_message(response.status, &response.body);
        return Err(match endpoint {
            Endpoint::Auth => Error::auth(response.status, message),
            Endpoint::Resource => Error::api(response.status, message),
        });
    }

    if response.status == 204 || response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&response.body)
        .map(Some)
        .map_err(|e| Error::parse(e.to_string()))
}

/// Message for a failed response: `message`, then `error`, then `HTTP <status>`.
pub(crate) fn error_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"].iter().find_map(|field| {
                value
                    .get(field)
                    .and_then(Value::as_str)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| format!("HTTP {}", status))
}

fn require<T>(value: Option<T>, operation: &str) -> Result<T> {
    value.ok_or_else(|| Error::parse(format!("empty response body for {}", operation)))
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn auth_login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let response = self
            .execute(Method::POST, "/auth/login", Some(request), Endpoint::Auth)
            .await?;
        require(response, "login")
    }

    async fn auth_register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let response = self
            .execute(Method::POST, "/auth/register", Some(request), Endpoint::Auth)
            .await?;
        require(response, "register")
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn tasks_list(&self) -> Result<Vec<Task>> {
        let tasks = self
            .execute::<(), _>(Method::GET, "/tasks", None, Endpoint::Resource)
            .await?;
        require(tasks, "task list")
    }

    async fn task_get(&self, id: i64) -> Result<Task> {
        let task = self
            .execute::<(), _>(Method::GET, &format!("/tasks/{}", id), None, Endpoint::Resource)
            .await?;
        require(task, "task")
    }

    async fn task_create(&self, request: &TaskRequest) -> Result<Task> {
        let task = self
            .execute(Method::POST, "/tasks", Some(request), Endpoint::Resource)
            .await?;
        require(task, "created task")
    }

    async fn task_update(&self, id: i64, request: &TaskRequest) -> Result<Task> {
        let task = self
            .execute(
                Method::PUT,
                &format!("/tasks/{}", id),
                Some(request),
                Endpoint::Resource,
            )
            .await?;
        require(task, "updated task")
    }

    async fn task_delete(&self, id: i64) -> Result<Option<DeleteResponse>> {
        self.execute::<(), _>(
            Method::DELETE,
            &format!("/tasks/{}", id),
            None,
            Endpoint::Resource,
        )
        .await
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Option<std::time::Duration>,
    transport: Option<Arc<dyn HttpTransport>>,
    middleware: HttpMiddlewareChain,
}

impl ApiClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            transport: None,
            middleware: HttpMiddlewareChain::new(),
        }
    }

    /// Request timeout for the default transport.
    pub fn timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom transport instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach bearer tokens from `source` to every non-auth request.
    pub fn token_source(self, source: Arc<dyn TokenSource>) -> Self {
        self.middleware(Arc::new(BearerAuthMiddleware::new(source)))
    }

    /// Add a middleware to the chain.
    pub fn middleware(mut self, middleware: Arc<dyn HttpMiddleware>) -> Self {
        self.middleware.add(middleware);
        self
    }

    /// Build the client. Fails on an invalid base URL.
    pub fn build(self) -> Result<ApiClient> {
        let parsed = url::Url::parse(&self.base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base URL cannot carry paths: {}",
                self.base_url
            )));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };

        Ok(ApiClient {
            base_url: Arc::from(self.base_url.trim_end_matches('/')),
            transport,
            middleware: Arc::new(self.middleware),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ok(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body.as_bytes().to_vec())
    }

    #[test]
    fn error_message_prefers_message_then_error() {
        assert_eq!(
            error_message(400, br#"{"message":"Title is required","error":"Bad Request"}"#),
            "Title is required"
        );
        assert_eq!(error_message(403, br#"{"error":"Forbidden"}"#), "Forbidden");
        assert_eq!(error_message(500, br#"{"message":""}"#), "HTTP 500");
        assert_eq!(error_message(502, b"<html>bad gateway</html>"), "HTTP 502");
        assert_eq!(error_message(404, b""), "HTTP 404");
    }

    #[test]
    fn non_success_maps_to_api_or_auth_error() {
        let err = decode_response::<Value>(&ok(404, ""), Endpoint::Resource).unwrap_err();
        assert_eq!(err, Error::api(404, "HTTP 404"));

        let err = decode_response::<Value>(
            &ok(401, r#"{"message":"Bad credentials"}"#),
            Endpoint::Auth,
        )
        .unwrap_err();
        assert_eq!(err, Error::auth(401, "Bad credentials"));
    }

    #[test]
    fn no_content_and_empty_bodies_are_null() {
        assert_eq!(
            decode_response::<Value>(&ok(204, ""), Endpoint::Resource).unwrap(),
            None
        );
        assert_eq!(
            decode_response::<Value>(&ok(200, "  \n"), Endpoint::Resource).unwrap(),
            None
        );
    }

    #[test]
    fn malformed_success_body_is_parse_error() {
        let err = decode_response::<Vec<Task>>(&ok(200, "{not json"), Endpoint::Resource)
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn success_body_is_decoded() {
        let body = r#"{"message":"Task deleted successfully"}"#;
        let decoded = decode_response::<DeleteResponse>(&ok(200, body), Endpoint::Resource)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.message, "Task deleted successfully");
    }

    /// Transport returning canned responses and recording requests.
    struct CannedTransport {
        responses: Mutex<Vec<HttpResponse>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().push(request);
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Err(Error::network("connection refused"));
            }
            Ok(responses.remove(0))
        }
    }

    fn canned(responses: Vec<HttpResponse>) -> Arc<CannedTransport> {
        Arc::new(CannedTransport {
            responses: Mutex::new(responses),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn task_json(id: i64) -> Value {
        json!({
            "id": id,
            "title": format!("Task {}", id),
            "description": "",
            "status": "NEW",
            "priority": "LOW",
            "assignedToId": null,
            "assignedToName": null,
            "createdById": 1,
            "createdByName": "Alice",
            "createdDate": "2024-01-01T00:00:00",
            "updatedDate": "2024-01-01T00:00:00",
            "dueDate": null
        })
    }

    #[tokio::test]
    async fn builds_urls_and_attaches_token() {
        let transport = canned(vec![ok(200, &json!([task_json(1)]).to_string())]);
        let client = ApiClient::builder("http://api.test/api/")
            .transport(transport.clone())
            .token_source(Arc::new(auth_middleware::StaticToken::bearer("tok")))
            .build()
            .unwrap();

        let tasks = client.tasks_list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::New);

        let seen = transport.seen.lock();
        assert_eq!(seen[0].url, "http://api.test/api/tasks");
        assert_eq!(seen[0].method, Method::GET);
        assert_eq!(seen[0].get_header("authorization"), Some("Bearer tok"));
        assert_eq!(seen[0].get_header("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn login_is_anonymous() {
        let body = json!({
            "token": "new", "type": "Bearer", "id": 1,
            "username": "alice", "email": "a@x", "fullName": "Alice"
        });
        let transport = canned(vec![ok(200, &body.to_string())]);
        let client = ApiClient::builder("http://api.test")
            .transport(transport.clone())
            .token_source(Arc::new(auth_middleware::StaticToken::bearer("old")))
            .build()
            .unwrap();

        let response = client
            .auth_login(&LoginRequest::new("alice", "secret"))
            .await
            .unwrap();
        assert_eq!(response.token, "new");

        let seen = transport.seen.lock();
        assert!(!seen[0].has_header("authorization"));
        let sent: Value = serde_json::from_slice(&seen[0].body).unwrap();
        assert_eq!(sent, json!({"username": "alice", "password": "secret"}));
    }

    #[tokio::test]
    async fn delete_no_content_is_none() {
        let transport = canned(vec![ok(204, "")]);
        let client = ApiClient::builder("http://api.test")
            .transport(transport.clone())
            .build()
            .unwrap();
        assert_eq!(client.task_delete(2).await.unwrap(), None);
        assert_eq!(transport.seen.lock()[0].method, Method::DELETE);
    }

    #[tokio::test]
    async fn empty_body_where_value_required_is_parse_error() {
        let transport = canned(vec![ok(200, "")]);
        let client = ApiClient::builder("http://api.test")
            .transport(transport)
            .build()
            .unwrap();
        assert!(matches!(client.task_get(1).await, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let client = ApiClient::builder("http://api.test")
            .transport(canned(vec![]))
            .build()
            .unwrap();
        assert!(matches!(client.tasks_list().await, Err(Error::Network(_))));
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = ApiClient::builder("not a url").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
