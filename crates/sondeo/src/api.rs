//! HTTP test client for REST APIs.
//!
//! Every call logs the request and the response (status and duration).
//! Transport failures and non-2xx statuses are normalized into [`ApiError`],
//! whose `url` is the path the caller asked for.

use crate::config::{join_url, Config};
use crate::logging::Logger;
use crate::result::SondeoResult;
use crate::retry::{retry_if, RetryPolicy};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

/// Default request timeout (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Health endpoint polled by [`ApiClient::health_check`]
pub const HEALTH_PATH: &str = "/health";

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Normalized API failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{method} {url} failed: {message}")]
pub struct ApiError {
    /// HTTP status, absent for transport failures
    pub status: Option<u16>,
    /// Response body (JSON when parseable)
    pub data: Value,
    /// Requested path
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Human-readable reason
    pub message: String,
}

impl ApiError {
    fn transport(method: &Method, path: &str, error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            "timed out"
        } else if error.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        Self {
            status: None,
            data: Value::Null,
            url: path.to_string(),
            method: method.to_string(),
            message: format!("{kind}: {error}"),
        }
    }

    fn local(method: &Method, path: &str, message: impl Into<String>) -> Self {
        Self {
            status: None,
            data: Value::Null,
            url: path.to_string(),
            method: method.to_string(),
            message: message.into(),
        }
    }

    /// Whether the server answered with this status
    #[must_use]
    pub fn is_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }
}

/// Successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status
    pub status: u16,
    /// Response headers (lowercase names)
    pub headers: BTreeMap<String, String>,
    /// Response body (JSON when parseable, else a string, `null` when empty)
    pub data: Value,
    /// Time from send to full body
    pub duration: Duration,
}

impl ApiResponse {
    /// Deserialize the body into a typed record
    pub fn parse<T: DeserializeOwned>(&self) -> SondeoResult<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Look up a header
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

fn body_value(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn header_map(response: &Response) -> BTreeMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// REST client with logging and normalized errors
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    headers: BTreeMap<String, String>,
    token: Option<String>,
    timeout: Duration,
    transport_retry: RetryPolicy,
    logger: Logger,
}

impl ApiClient {
    /// Create a new client for a base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>, logger: Logger) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            headers,
            token: None,
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            transport_retry: RetryPolicy::once(),
            logger,
        }
    }

    /// Client for the configured API URL
    #[must_use]
    pub fn from_config(config: &Config, logger: Logger) -> Self {
        Self::new(config.api_url.clone(), logger)
    }

    /// Add a default header sent with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Send `Authorization: Bearer <token>`
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set or clear the bearer token in place
    pub fn set_bearer_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry policy for connect and timeout failures; statuses never retry
    #[must_use]
    pub const fn with_transport_retry(mut self, policy: RetryPolicy) -> Self {
        self.transport_retry = policy;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn prepare(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self.client.request(method, url).timeout(self.timeout);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send with transport retries; non-2xx responses become errors
    async fn send<F>(&self, method: &Method, path: &str, build: F) -> ApiResult<(Response, Instant)>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = join_url(&self.base_url, path);
        self.logger.api_request(method.as_str(), path);
        let start = Instant::now();

        let response = retry_if(
            &self.transport_retry,
            |_| {
                let request = build(self.prepare(method.clone(), &url));
                async move { request.send().await }
            },
            |e: &reqwest::Error| e.is_connect() || e.is_timeout(),
        )
        .await
        .map_err(|e| {
            let error = ApiError::transport(method, path, &e.last_error);
            self.logger.error(&format!("{error} after {} attempt(s)", e.attempts));
            error
        })?;

        let status = response.status();
        if !status.is_success() {
            let data = match response.bytes().await {
                Ok(bytes) => body_value(&bytes),
                Err(_) => Value::Null,
            };
            self.logger
                .api_response(method.as_str(), path, status.as_u16(), start.elapsed());
            return Err(ApiError {
                status: Some(status.as_u16()),
                data,
                url: path.to_string(),
                method: method.to_string(),
                message: format!("request failed with status {status}"),
            });
        }
        Ok((response, start))
    }

    async fn request<F>(&self, method: Method, path: &str, build: F) -> ApiResult<ApiResponse>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let (response, start) = self.send(&method, path, build).await?;
        let status = response.status().as_u16();
        let headers = header_map(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(&method, path, &e))?;
        let duration = start.elapsed();
        self.logger
            .api_response(method.as_str(), path, status, duration);
        Ok(ApiResponse {
            status,
            headers,
            data: body_value(&bytes),
            duration,
        })
    }

    /// GET a path
    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(Method::GET, path, |r| r).await
    }

    /// POST a JSON body
    pub async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> ApiResult<ApiResponse> {
        self.request(Method::POST, path, |r| r.json(body)).await
    }

    /// PUT a JSON body
    pub async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> ApiResult<ApiResponse> {
        self.request(Method::PUT, path, |r| r.json(body)).await
    }

    /// PATCH a JSON body
    pub async fn patch<B: Serialize + Sync>(&self, path: &str, body: &B) -> ApiResult<ApiResponse> {
        self.request(Method::PATCH, path, |r| r.json(body)).await
    }

    /// DELETE a path
    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(Method::DELETE, path, |r| r).await
    }

    /// Upload a file as a multipart form field
    pub async fn upload_file(
        &self,
        path: &str,
        file_path: &Path,
        field: &str,
    ) -> ApiResult<ApiResponse> {
        let bytes = tokio::fs::read(file_path).await.map_err(|e| {
            ApiError::local(
                &Method::POST,
                path,
                format!("cannot read {}: {e}", file_path.display()),
            )
        })?;
        let file_name = file_path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        self.request(Method::POST, path, |r| {
            let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
            r.multipart(Form::new().part(field.to_string(), part))
        })
        .await
    }

    /// Download a response body to a file, returning the bytes written
    pub async fn download_file(&self, path: &str, dest: &Path) -> ApiResult<u64> {
        let method = Method::GET;
        let (response, start) = self.send(&method, path, |r| r).await?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(&method, path, &e))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::local(&method, path, format!("cannot create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| ApiError::local(&method, path, format!("cannot write {}: {e}", dest.display())))?;
        self.logger
            .api_response(method.as_str(), path, status, start.elapsed());
        Ok(bytes.len() as u64)
    }

    /// GET the health endpoint
    pub async fn health_check(&self) -> ApiResult<ApiResponse> {
        self.get(HEALTH_PATH).await
    }

    /// Run requests concurrently; responses come back in input order and
    /// the first failure fails the whole batch.
    pub async fn batch_requests<I, F>(&self, requests: I) -> ApiResult<Vec<ApiResponse>>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = ApiResult<ApiResponse>>,
    {
        let start = Instant::now();
        let responses = futures::future::try_join_all(requests).await?;
        self.logger
            .performance(&format!("batch of {} requests", responses.len()), start.elapsed());
        Ok(responses)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::logging::LogCategory;
    use axum::body::Bytes;
    use axum::extract::Path as UrlPath;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;

    async fn get_user(UrlPath(id): UrlPath<u32>) -> (StatusCode, Json<Value>) {
        if id <= 3 {
            (StatusCode::OK, Json(json!({ "id": id, "name": format!("user{id}") })))
        } else {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" })))
        }
    }

    async fn get_item(UrlPath(id): UrlPath<u32>) -> (StatusCode, Json<Value>) {
        if id == 3 {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })))
        } else {
            (StatusCode::OK, Json(json!({ "id": id })))
        }
    }

    async fn secure(headers: HeaderMap) -> StatusCode {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer t0ken") => StatusCode::NO_CONTENT,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    async fn upload(headers: HeaderMap, body: Bytes) -> Json<Value> {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = String::from_utf8_lossy(&body).into_owned();
        Json(json!({
            "multipart": content_type.starts_with("multipart/form-data"),
            "has_field": text.contains("name=\"avatar\""),
            "has_file": text.contains("filename=\"avatar.txt\""),
            "has_content": text.contains("pixels"),
        }))
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
            .route(
                "/users",
                axum::routing::post(|Json(body): Json<Value>| async move {
                    (StatusCode::CREATED, Json(body))
                }),
            )
            .route(
                "/users/{id}",
                get(get_user)
                    .put(|Json(body): Json<Value>| async move { Json(body) })
                    .patch(|Json(body): Json<Value>| async move { Json(body) })
                    .delete(|| async { StatusCode::NO_CONTENT }),
            )
            .route("/items/{id}", get(get_item))
            .route("/secure", get(secure))
            .route("/upload", axum::routing::post(upload))
            .route("/files/report.csv", get(|| async { "id,total\n1,9.99\n" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    mod verb_tests {
        use super::*;

        #[tokio::test]
        async fn test_get_logs_request_and_response() {
            let logger = Logger::capturing();
            let client = ApiClient::new(serve().await, logger.clone());

            let response = client.get("/users/1").await.unwrap();

            assert_eq!(response.status, 200);
            assert_eq!(response.data["name"], "user1");
            assert!(response.header("Content-Type").unwrap().contains("json"));
            let requests = logger.events_in(LogCategory::ApiRequest);
            let responses = logger.events_in(LogCategory::ApiResponse);
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].field("path"), Some("/users/1"));
            assert_eq!(responses[0].field("status"), Some("200"));
            assert!(responses[0].field("duration_ms").is_some());
        }

        #[tokio::test]
        async fn test_not_found_is_normalized() {
            let client = ApiClient::new(serve().await, Logger::new());
            let err = client.get("/users/404").await.unwrap_err();
            assert_eq!(err.status, Some(404));
            assert!(err.is_status(404));
            assert_eq!(err.url, "/users/404");
            assert_eq!(err.method, "GET");
            assert_eq!(err.data["error"], "User not found");
        }

        #[tokio::test]
        async fn test_write_verbs() {
            let client = ApiClient::new(serve().await, Logger::new());
            let body = json!({ "name": "Alice" });

            let created = client.post("/users", &body).await.unwrap();
            assert_eq!(created.status, 201);
            assert_eq!(created.data, body);

            assert_eq!(client.put("/users/1", &body).await.unwrap().data, body);
            assert_eq!(client.patch("/users/1", &body).await.unwrap().data, body);

            let deleted = client.delete("/users/1").await.unwrap();
            assert_eq!(deleted.status, 204);
            assert_eq!(deleted.data, Value::Null);
        }

        #[tokio::test]
        async fn test_bearer_token() {
            let base = serve().await;
            let anonymous = ApiClient::new(base.clone(), Logger::new());
            assert!(anonymous.get("/secure").await.unwrap_err().is_status(401));

            let mut client = ApiClient::new(base, Logger::new()).with_bearer_token("t0ken");
            assert_eq!(client.get("/secure").await.unwrap().status, 204);
            client.set_bearer_token(None);
            assert!(client.get("/secure").await.is_err());
        }

        #[tokio::test]
        async fn test_parse_typed_body() {
            #[derive(Deserialize)]
            struct User {
                id: u32,
                name: String,
            }
            let client = ApiClient::new(serve().await, Logger::new());
            let user: User = client.get("/users/2").await.unwrap().parse().unwrap();
            assert_eq!(user.id, 2);
            assert_eq!(user.name, "user2");
        }

        #[tokio::test]
        async fn test_health_check() {
            let client = ApiClient::new(serve().await, Logger::new());
            assert_eq!(client.health_check().await.unwrap().data["status"], "ok");
        }
    }

    mod file_tests {
        use super::*;

        #[tokio::test]
        async fn test_upload_file() {
            let dir = tempfile::tempdir().unwrap();
            let file = dir.path().join("avatar.txt");
            std::fs::write(&file, "pixels").unwrap();
            let client = ApiClient::new(serve().await, Logger::new());

            let response = client.upload_file("/upload", &file, "avatar").await.unwrap();

            assert_eq!(response.data["multipart"], true);
            assert_eq!(response.data["has_field"], true);
            assert_eq!(response.data["has_file"], true);
            assert_eq!(response.data["has_content"], true);
        }

        #[tokio::test]
        async fn test_upload_missing_file() {
            let client = ApiClient::new("http://127.0.0.1:9", Logger::new());
            let err = client
                .upload_file("/upload", Path::new("/nonexistent/file.bin"), "file")
                .await
                .unwrap_err();
            assert_eq!(err.status, None);
            assert!(err.message.contains("cannot read"));
        }

        #[tokio::test]
        async fn test_download_file() {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("nested").join("report.csv");
            let client = ApiClient::new(serve().await, Logger::new());

            let written = client.download_file("/files/report.csv", &dest).await.unwrap();

            let content = std::fs::read_to_string(&dest).unwrap();
            assert_eq!(written, content.len() as u64);
            assert!(content.starts_with("id,total"));
        }
    }

    mod failure_tests {
        use super::*;

        #[tokio::test]
        async fn test_batch_fails_as_a_whole() {
            let client = ApiClient::new(serve().await, Logger::new());
            let paths: Vec<String> = (1..=5).map(|i| format!("/items/{i}")).collect();

            let err = client
                .batch_requests(paths.iter().map(|p| client.get(p)))
                .await
                .unwrap_err();

            assert_eq!(err.status, Some(500));
            assert_eq!(err.url, "/items/3");
        }

        #[tokio::test]
        async fn test_batch_preserves_order() {
            let client = ApiClient::new(serve().await, Logger::new());
            let paths = ["/items/5", "/items/1", "/items/4"];

            let responses = client
                .batch_requests(paths.iter().map(|p| client.get(p)))
                .await
                .unwrap();

            let ids: Vec<u64> = responses
                .iter()
                .map(|r| r.data["id"].as_u64().unwrap())
                .collect();
            assert_eq!(ids, vec![5, 1, 4]);
        }

        #[tokio::test]
        async fn test_connection_refused_retries_transport_errors() {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let logger = Logger::capturing();
            let client = ApiClient::new(format!("http://{addr}"), logger.clone())
                .with_transport_retry(RetryPolicy::new(2, Duration::from_millis(10)));

            let err = client.get("/health").await.unwrap_err();

            assert_eq!(err.status, None);
            assert_eq!(err.url, "/health");
            assert!(logger
                .events()
                .iter()
                .any(|e| e.message.contains("after 2 attempt(s)")));
        }

        #[tokio::test]
        async fn test_server_errors_are_not_retried() {
            let logger = Logger::capturing();
            let client = ApiClient::new(serve().await, logger.clone())
                .with_transport_retry(RetryPolicy::new(3, Duration::from_millis(10)));
            assert!(client.get("/items/3").await.unwrap_err().is_status(500));
            assert_eq!(logger.events_in(LogCategory::ApiResponse).len(), 1);
        }

        #[test]
        fn test_error_display() {
            let err = ApiError {
                status: Some(404),
                data: Value::Null,
                url: "/users/9".to_string(),
                method: "GET".to_string(),
                message: "request failed with status 404 Not Found".to_string(),
            };
            assert_eq!(
                err.to_string(),
                "GET /users/9 failed: request failed with status 404 Not Found"
            );
        }
    }
}
