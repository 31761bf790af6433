use crate::config::GateConfig;
use crate::create_app;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// Token sent by the fixture's default requests
pub const TEST_TOKEN: &str = "abc";

/// Test fixture for setting up the whole gateway with mocked services.
///
/// Mock servers stand in for the introspection endpoint, the permission
/// directory and the upstream backend. Expectations set with `expect(..)`
/// are verified when the fixture is dropped.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///     fixture.mock_active_token("alice", 1).await;
///     fixture.mock_permissions("alice", &["organization"], 1).await;
///     fixture.mock_upstream(Method::GET, "/organization", 1).await;
///
///     let response = fixture.get("/organization").await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration the application was built with
    pub config: GateConfig,
    /// Mock of the authorization server
    pub introspection_mock: MockServer,
    /// Mock of the permission directory
    pub directory_mock: MockServer,
    /// Mock of the backend receiving forwarded requests
    pub upstream_mock: MockServer,
}

impl TestFixture {
    /// Creates a new fixture with fresh mock servers.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Creates a new fixture, letting the caller adjust the configuration
    /// before the application is built.
    pub async fn with_config(customize: impl FnOnce(&mut GateConfig)) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let introspection_mock = MockServer::start().await;
        let directory_mock = MockServer::start().await;
        let upstream_mock = MockServer::start().await;

        let mut config =
            GateConfig::for_test_with_mocks(&introspection_mock, &directory_mock, &upstream_mock);
        customize(&mut config);

        let app = Self::build_app(&config);

        Self {
            app,
            config,
            introspection_mock,
            directory_mock,
            upstream_mock,
        }
    }

    fn build_app(config: &GateConfig) -> Router {
        let state = AppState::new(config).expect("Failed to create test state");
        create_app(state)
    }

    /// Initializes the test logger with the given level.
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Rebuilds the application with another upstream timeout in seconds.
    pub fn set_upstream_timeout(&mut self, timeout: u64) {
        self.config.upstream.timeout = timeout;
        self.app = Self::build_app(&self.config);
    }

    /// Creates a request builder, with `Authorization: Bearer <token>` when a
    /// token is given.
    pub fn request_builder(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        token: Option<&str>,
    ) -> http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri.as_ref());

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder = builder.header("Content-Type", "application/json");

        builder
    }

    /// Sends a GET request authenticated with `TEST_TOKEN`.
    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        self.get_with_auth(uri, Some(TEST_TOKEN)).await
    }

    /// Sends a GET request with the given token, or without credentials.
    pub async fn get_with_auth(&self, uri: impl AsRef<str>, token: Option<&str>) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri, token)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a POST request with a JSON body, authenticated with `TEST_TOKEN`.
    pub async fn post<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(Method::POST, uri, Some(TEST_TOKEN))
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and returns a TestResponse.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Try to parse as JSON, defaulting to empty object if parsing fails or empty body
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| json!({}))
        } else {
            json!({})
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }

    /// Makes the authorization server report `TEST_TOKEN` as active for `subject`.
    pub async fn mock_active_token(&self, subject: &str, expected_calls: u64) {
        self.mock_introspection(json!({ "active": true, "sub": subject }), expected_calls)
            .await;
    }

    /// Answers introspection of `TEST_TOKEN` with the given body.
    pub async fn mock_introspection(&self, response_body: Value, expected_calls: u64) {
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/admin/oauth2/introspect"))
            .and(matchers::body_string(format!("token={}", TEST_TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .expect(expected_calls)
            .mount(&self.introspection_mock)
            .await;
    }

    /// Makes the directory grant `scopes` to `username`.
    pub async fn mock_permissions(&self, username: &str, scopes: &[&str], expected_calls: u64) {
        Mock::given(matchers::method("GET"))
            .and(matchers::path(format!("/api/user/permission/{}", username)))
            .and(matchers::header(
                "authorization",
                format!("Bearer {}", TEST_TOKEN).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "user_id": format!("id-{}", username),
                    "organization_id": "org-1",
                    "username": username,
                    "role": "admin",
                    "permissions": scopes,
                }
            })))
            .expect(expected_calls)
            .mount(&self.directory_mock)
            .await;
    }

    /// Answers `method path` on the upstream with an empty 200.
    pub async fn mock_upstream(
        &self,
        method: Method,
        path: impl Into<String>,
        expected_calls: u64,
    ) {
        Mock::given(matchers::method(method.as_str()))
            .and(matchers::path(path.into()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(expected_calls)
            .mount(&self.upstream_mock)
            .await;
    }
}

/// Response from a test request that provides convenient access to status and JSON body.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as JSON (if present and valid JSON)
    pub json: Value,
}

impl TestResponse {
    /// Asserts that the response has the expected status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match the expected value.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    /// Asserts that the response status is OK (200).
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Asserts that the response carries `name: value`.
    pub fn assert_header(&self, name: &str, value: &str) -> &Self {
        let actual = self.headers.get(name).and_then(|v| v.to_str().ok());
        assert_eq!(actual, Some(value), "Unexpected value for header {}", name);
        self
    }
}
