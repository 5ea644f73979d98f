/// Session token validation
///
/// The identity provider issues access tokens as HS256-signed JWTs carrying
/// the subject id, the account email and the provider-side session id. Folio
/// verifies them locally with the project's JWT secret instead of calling the
/// provider on every request.
///
/// # Validation
///
/// - **Algorithm**: HS256
/// - **Audience**: must be `"authenticated"`
/// - **Expiration**: `exp` is required and enforced
///
/// # Example
///
/// ```
/// use folio_shared::auth::jwt::{create_session_token, validate_session_token, SessionClaims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = SessionClaims::new(
///     "8f2c0d9e-5a1b-4c3d-9e8f-7a6b5c4d3e2f",
///     Some("editor@example.com".to_string()),
///     "session-1",
/// );
/// let token = create_session_token(&claims, "project-jwt-secret")?;
///
/// let validated = validate_session_token(&token, "project-jwt-secret")?;
/// assert_eq!(validated.email.as_deref(), Some("editor@example.com"));
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Audience stamped on tokens of signed-in users
pub const SESSION_AUDIENCE: &str = "authenticated";

/// Lifetime of freshly minted tokens
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claim validation failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued for a different audience
    #[error("Invalid audience: expected \"authenticated\"")]
    InvalidAudience,
}

/// Claims carried by a session access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the provider's user id
    pub sub: String,

    /// Account email; absent for some provider account types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Provider-side session id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Audience, `"authenticated"` for signed-in users
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Builds claims that expire after [`DEFAULT_TOKEN_LIFETIME_SECS`]
    pub fn new(subject: impl Into<String>, email: Option<String>, session_id: impl Into<String>) -> Self {
        Self::with_expiration(
            subject,
            email,
            session_id,
            Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        )
    }

    /// Builds claims with a custom lifetime (negative for already-expired)
    pub fn with_expiration(
        subject: impl Into<String>,
        email: Option<String>,
        session_id: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: subject.into(),
            email,
            session_id: Some(session_id.into()),
            aud: SESSION_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    /// Session id to report, falling back to subject and issue time
    pub fn effective_session_id(&self) -> String {
        match self.session_id {
            Some(ref id) if !id.is_empty() => id.clone(),
            _ => format!("{}:{}", self.sub, self.iat),
        }
    }
}

/// Signs claims into a token
///
/// Used by tests and local tooling; production tokens are minted by the
/// identity provider.
pub fn create_session_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a session token and extracts its claims
///
/// # Errors
///
/// - [`JwtError::Expired`] if `exp` has passed
/// - [`JwtError::InvalidAudience`] if `aud` is not `"authenticated"`
/// - [`JwtError::ValidationError`] for bad signatures or malformed tokens
pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SESSION_AUDIENCE]);
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience,
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}
