/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - In-memory store
/// - Identity provider that verifies locally minted session tokens
/// - Request helpers that drive the router directly

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use folio_api::app::{build_router, AppState};
use folio_api::config::{ApiConfig, AuthConfig, Config, DatabaseConfig};
use folio_shared::auth::jwt::{create_session_token, SessionClaims};
use folio_shared::auth::session::DEFAULT_SESSION_COOKIE;
use folio_shared::auth::supabase::{SupabaseConfig, SupabaseProvider};
use folio_shared::db::memory::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Nothing listens here; provider calls fail fast
const UNREACHABLE_PROVIDER: &str = "http://127.0.0.1:9";

/// A decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: Vec::new(),
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://unused".to_string(),
                max_connections: 1,
            },
            auth: AuthConfig {
                supabase_url: UNREACHABLE_PROVIDER.to_string(),
                anon_key: "anon".to_string(),
                jwt_secret: JWT_SECRET.to_string(),
                cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            },
        };

        let provider = SupabaseProvider::new(SupabaseConfig {
            url: UNREACHABLE_PROVIDER.to_string(),
            anon_key: "anon".to_string(),
            jwt_secret: JWT_SECRET.to_string(),
            request_timeout_seconds: 2,
        })
        .expect("Failed to build provider");

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), Arc::new(provider), config);

        Self {
            store,
            app: build_router(state),
        }
    }

    /// Mints a session token for a fresh identity
    pub fn new_identity(&self) -> (String, String) {
        let subject = Uuid::new_v4().to_string();
        let email = format!("{}@example.com", &subject[..8]);
        let token = token_for(&subject, &email);
        (subject, token)
    }

    /// Sends a request with an optional bearer token and JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.call(request).await
    }

    /// Sends a prepared request
    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Signs a session token the way the identity provider would
pub fn token_for(subject: &str, email: &str) -> String {
    let claims = SessionClaims::new(subject, Some(email.to_string()), format!("sess-{}", subject));
    create_session_token(&claims, JWT_SECRET).unwrap()
}
