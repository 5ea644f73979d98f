/// Supabase (GoTrue) identity provider
///
/// Session tokens are verified locally against the project's JWT secret.
/// Sign-in, sign-up and sign-out are forwarded to the GoTrue REST endpoints
/// under `{SUPABASE_URL}/auth/v1/`, authenticated with the project's anon key.
///
/// # Example
///
/// ```no_run
/// use folio_shared::auth::provider::IdentityProvider;
/// use folio_shared::auth::supabase::{SupabaseConfig, SupabaseProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = SupabaseProvider::new(SupabaseConfig {
///     url: "https://project.supabase.co".to_string(),
///     anon_key: "anon-key".to_string(),
///     jwt_secret: "project-jwt-secret".to_string(),
///     request_timeout_seconds: 10,
/// })?;
///
/// let tokens = provider.sign_in("editor@example.com", "hunter22").await?;
/// let session = provider.get_session(&tokens.access_token).await?;
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::jwt::validate_session_token;
use super::provider::{
    ExternalSession, IdentityProvider, ProviderError, ProviderTokens, SignUpOutcome,
};

const UNCONFIRMED_EMAIL_MESSAGE: &str =
    "Please confirm your email address before signing in. Check your inbox for the confirmation link.";

/// Connection settings for a Supabase project
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: String,

    /// Public anon key sent as `apikey`
    pub anon_key: String,

    /// Secret used to verify access tokens
    pub jwt_secret: String,

    /// Timeout for calls to the auth server (seconds)
    pub request_timeout_seconds: u64,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// GoTrue-backed [`IdentityProvider`]
#[derive(Clone)]
pub struct SupabaseProvider {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseProvider {
    /// Builds the provider and its HTTP client
    pub fn new(config: SupabaseConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = self
            .http
            .post(self.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .json(body);

        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        request.send().await.map_err(|e| {
            warn!(error = %e, path, "Identity provider request failed");
            ProviderError::Unavailable(e.to_string())
        })
    }
}

/// Pulls a human-readable message out of a GoTrue error body
fn rejection_message(body: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(|message| {
            if message.to_lowercase().contains("email not confirmed") {
                UNCONFIRMED_EMAIL_MESSAGE.to_string()
            } else {
                message.to_string()
            }
        })
}

/// Converts a non-success response into a provider error
async fn rejection(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_server_error() {
        return ProviderError::Unavailable(format!("auth server returned {}", status));
    }

    ProviderError::Rejected(
        rejection_message(&body).unwrap_or_else(|| format!("Request rejected ({})", status)),
    )
}

fn parse_tokens(body: Value) -> Result<ProviderTokens, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Protocol(e.to_string()))
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn get_session(&self, access_token: &str) -> Result<Option<ExternalSession>, ProviderError> {
        match validate_session_token(access_token, &self.config.jwt_secret) {
            Ok(claims) => Ok(Some(ExternalSession {
                session_id: claims.effective_session_id(),
                subject: claims.sub,
                email: claims.email,
            })),
            Err(e) => {
                debug!(error = %e, "Session token rejected");
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderTokens, ProviderError> {
        let response = self
            .post_json(
                "token?grant_type=password",
                &PasswordCredentials { email, password },
                None,
            )
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(e.to_string()))?;
        parse_tokens(body)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ProviderError> {
        let response = self
            .post_json("signup", &PasswordCredentials { email, password }, None)
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(e.to_string()))?;

        // Auto-confirmed projects return a session; others return the bare user.
        if body.get("access_token").is_some() {
            Ok(SignUpOutcome::SignedIn(parse_tokens(body)?))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let response = self
            .post_json("logout", &serde_json::json!({}), Some(access_token))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Already revoked or expired; nothing left to sign out.
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(rejection(response).await),
        }
    }
}
