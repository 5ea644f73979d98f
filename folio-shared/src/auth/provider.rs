/// Identity provider interface
///
/// Folio does not store credentials. Accounts, passwords and sessions belong
/// to an external provider; Folio only asks it to validate a session token
/// and forwards sign-in, sign-up and sign-out requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A session the provider vouches for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSession {
    /// Provider-side session id
    pub session_id: String,

    /// Provider user id
    pub subject: String,

    /// Email claimed by the session, if the provider supplied one
    pub email: Option<String>,
}

/// Tokens returned by a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTokens {
    /// Session access token; this is what the session cookie carries
    pub access_token: String,

    /// Refresh token, if the provider issued one
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Result of a sign-up request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created and signed in immediately
    SignedIn(ProviderTokens),

    /// Account created; the user must confirm their email first
    ConfirmationRequired,
}

/// Error type for provider calls
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider refused the request (bad credentials, unconfirmed email, ...)
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something unexpected
    #[error("Unexpected identity provider response: {0}")]
    Protocol(String),
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validates a session token
    ///
    /// Returns `Ok(None)` for missing, expired or forged tokens; errors are
    /// reserved for the provider itself failing.
    async fn get_session(&self, access_token: &str) -> Result<Option<ExternalSession>, ProviderError>;

    /// Exchanges email and password for session tokens
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderTokens, ProviderError>;

    /// Registers a new account
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ProviderError>;

    /// Revokes the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;
}
