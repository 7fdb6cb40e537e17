//! Common test utilities for E2E tests

#![allow(dead_code)]

use kindred::data::UserProfile;
use kindred::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub ws_addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        kindred::metrics::init_metrics();

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                allowed_origin: None,
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-that-is-32-bytes-long".to_string(),
                session_max_age: 604800,
            },
            feed: config::FeedConfig {
                default_page_size: 10,
                max_page_size: 50,
            },
            chat: config::ChatConfig::default(),
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = kindred::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: format!("http://{}", addr),
            ws_addr: format!("ws://{}", addr),
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Websocket URL authenticated through the query string
    pub fn ws_url(&self, token: &str) -> String {
        format!("{}/ws?token={}", self.ws_addr, token)
    }

    /// Create a test user the way the profile subsystem would
    pub async fn create_test_user(&self, id: &str, first_name: &str) -> UserProfile {
        let user = UserProfile {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: Some("Tester".to_string()),
            photo_url: Some(format!("https://example.com/{id}.png")),
            age: Some(30),
            gender: None,
            about: None,
            skills: Some("rust,sql".to_string()),
        };
        self.state.db.upsert_user(&user).await.unwrap();
        user
    }

    /// Create a session token for a user
    pub fn create_test_token(&self, user_id: &str) -> String {
        use kindred::auth::session::{Session, create_session_token};

        let session = Session::new(user_id, None, self.state.config.auth.session_max_age);

        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }

    /// Send an authenticated request, returning status and JSON body
    pub async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
    ) -> (reqwest::StatusCode, serde_json::Value) {
        let response = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = response.status();
        let body = response.json().await.unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Make `from` and `to` connected through the HTTP API
    pub async fn connect_users(&self, from: &str, to: &str) {
        let (status, body) = self
            .call(
                reqwest::Method::POST,
                &format!("/request/send/interested/{to}"),
                &self.create_test_token(from),
            )
            .await;
        assert_eq!(status, 200, "send failed: {body}");

        let request_id = body["data"]["id"].as_str().unwrap().to_string();
        let (status, body) = self
            .call(
                reqwest::Method::POST,
                &format!("/request/review/accepted/{request_id}"),
                &self.create_test_token(to),
            )
            .await;
        assert_eq!(status, 200, "review failed: {body}");
    }
}
