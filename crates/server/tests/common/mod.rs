//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock messenger and a temporary store, so the relay surface can be
//! exercised end to end without a chat platform.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use curator_core::{
    create_access_policy, create_relay_authenticator, load_config_from_str,
    testing::MockMessenger, CardAuthor, CatalogingContext, Cataloger, JsonStore, ReplyHub,
    Store, Wizard,
};

/// Re-export fixtures for test convenience
pub use curator_core::testing::fixtures;

pub const LISTED: u64 = 100;
pub const UNDETERMINED: u64 = 200;
pub const COMMANDS: u64 = 5;
pub const STAFF_ROLE: u64 = 77;
pub const SECRET: &str = "relay-secret";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.command(2, "search", json!({"token": "bq"})).await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock messenger - inspect posted cards and replies
    pub messenger: Arc<MockMessenger>,
    /// The store behind the cataloger
    pub store: Arc<dyn Store>,
    /// Temporary directory for the store file
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new fixture with relay auth disabled.
    pub fn new() -> Self {
        Self::with_relay(r#"method = "none""#)
    }

    /// Create a fixture requiring the shared relay secret.
    pub fn with_secret() -> Self {
        Self::with_relay(&format!(
            "method = \"shared_secret\"\nsecret = \"{}\"",
            SECRET
        ))
    }

    fn with_relay(relay: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = load_config_from_str(&format!(
            r#"
[relay]
{relay}

[channels]
listed = {LISTED}
undetermined = {UNDETERMINED}

[discord]
token = "test-token"
guild_id = 1
bot_user_id = 1

[access]
staff_role_id = {STAFF_ROLE}

[wizard]
reply_timeout_secs = 5
"#
        ))
        .expect("Failed to parse test config");

        let store: Arc<dyn Store> = Arc::new(
            JsonStore::new(&temp_dir.path().join("curator.json"))
                .expect("Failed to create store"),
        );
        let messenger = Arc::new(MockMessenger::new());
        let wizard = Wizard::new(
            ReplyHub::new(),
            messenger.clone(),
            Duration::from_secs(config.wizard.reply_timeout_secs),
        );
        let cataloger = Cataloger::new(
            store.clone(),
            messenger.clone(),
            wizard,
            create_access_policy(&config.access),
            CatalogingContext::from(&config),
            CardAuthor::from(&config.mirror),
        );
        let relay = create_relay_authenticator(&config.relay).expect("Failed to create relay auth");

        let state = Arc::new(curator_server::state::AppState::new(
            config,
            relay,
            Arc::new(cataloger),
        ));
        let router = curator_server::api::create_router(state);

        Self {
            router,
            messenger,
            store,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, None, headers).await
    }

    /// Post a command as a staff member of the commands channel.
    pub async fn command(&self, user: u64, name: &str, args: Value) -> TestResponse {
        let mut command = args;
        command["name"] = json!(name);
        self.post(
            "/api/v1/commands",
            json!({
                "context": {
                    "channel_id": COMMANDS.to_string(),
                    "invoker": { "user_id": user.to_string(), "role_ids": [STAFF_ROLE.to_string()] }
                },
                "command": command
            }),
        )
        .await
    }

    /// Post a chat message, retrying until a wizard session consumes it.
    pub async fn reply(&self, user: u64, message: Value) {
        let mut body = message;
        body["channel_id"] = json!(COMMANDS);
        body["author_id"] = json!(user);
        for _ in 0..200 {
            let response = self.post("/api/v1/events/message", body.clone()).await;
            assert_eq!(response.status, StatusCode::OK);
            if response.body["consumed"] == true {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no wizard session consumed {}", body);
    }

    /// Wait until the given text shows up in the commands channel.
    pub async fn wait_for_reply(&self, text: &str) {
        for _ in 0..200 {
            let sent = self
                .messenger
                .texts_sent_to(curator_core::ChannelId(COMMANDS))
                .await;
            if sent.iter().any(|t| t == text) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reply {:?} never sent", text);
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
