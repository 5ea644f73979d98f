/// Authentication endpoints
///
/// Credentials are handled by the identity provider; these endpoints forward
/// them and manage the session cookie.
///
/// # Endpoints
///
/// - `POST /v1/auth/signup` - Create an account
/// - `POST /v1/auth/login` - Sign in and receive the session cookie
/// - `POST /v1/auth/logout` - Revoke the session and clear the cookie
/// - `GET /v1/auth/me` - Current session

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use folio_shared::auth::{
    provider::{ProviderError, ProviderTokens, SignUpOutcome},
    session::Session,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Must repeat `password`
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Signup response
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    /// `signed_in` or `confirmation_required`
    pub status: String,

    /// Human-readable next step
    pub message: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The signed-in session
    pub session: Session,

    /// Access token, for clients that send it as a bearer token
    pub access_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Builds a `Set-Cookie` value for the session cookie
///
/// An empty `value` with `max_age` 0 clears the cookie.
pub fn session_cookie(
    name: &str,
    value: &str,
    max_age: i64,
    secure: bool,
) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        value,
        max_age.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Invalid session cookie: {}", e)))
}

fn cookie_for(state: &AppState, tokens: &ProviderTokens) -> Result<HeaderValue, ApiError> {
    session_cookie(
        state.identity.cookie_name(),
        &tokens.access_token,
        tokens.expires_in,
        state.config.api.production,
    )
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/signup
/// Content-Type: application/json
///
/// {
///   "email": "editor@example.com",
///   "password": "hunter22",
///   "confirm_password": "hunter22"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `400 Bad Request`: The provider refused the account
/// - `503 Service Unavailable`: The provider is unreachable
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let outcome = state
        .provider
        .sign_up(&req.email, &req.password)
        .await
        .map_err(|e| match e {
            ProviderError::Rejected(msg) => ApiError::BadRequest(msg),
            other => other.into(),
        })?;

    tracing::info!(email = %req.email, "Account created");

    match outcome {
        SignUpOutcome::SignedIn(tokens) => {
            let cookie = cookie_for(&state, &tokens)?;
            let body = Json(SignupResponse {
                status: "signed_in".to_string(),
                message: "Account created".to_string(),
            });
            Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], body).into_response())
        }
        SignUpOutcome::ConfirmationRequired => {
            let body = Json(SignupResponse {
                status: "confirmation_required".to_string(),
                message: "Account created! Please check your email to confirm your account before signing in."
                    .to_string(),
            });
            Ok((StatusCode::ACCEPTED, body).into_response())
        }
    }
}

/// Sign in with email and password
///
/// On success the session cookie is set and the local user record is
/// provisioned if this is the account's first sign-in.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials or unconfirmed email
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let tokens = state.provider.sign_in(&req.email, &req.password).await?;

    let session = state
        .identity
        .resolve_token(&tokens.access_token)
        .await?
        .ok_or_else(|| {
            ApiError::InternalError("Provider issued a token it does not accept".to_string())
        })?;

    tracing::info!(user_id = %session.user.id, "User signed in");

    let cookie = cookie_for(&state, &tokens)?;
    let body = Json(LoginResponse {
        session,
        access_token: tokens.access_token,
        expires_in: tokens.expires_in,
    });

    Ok(([(header::SET_COOKIE, cookie)], body).into_response())
}

/// Sign out the current session
///
/// The cookie is cleared even if the provider cannot be reached.
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if let Some(token) = state.identity.extract_token(&headers) {
        if let Err(e) = state.provider.sign_out(&token).await {
            tracing::warn!(user_id = %session.user.id, error = %e, "Provider sign-out failed");
        }
    }

    tracing::info!(user_id = %session.user.id, "User signed out");

    let cookie = session_cookie(
        state.identity.cookie_name(),
        "",
        0,
        state.config.api.production,
    )?;

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

/// Current session
pub async fn me(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}
