/// Identity resolution
///
/// Turns an incoming request's session token into a [`Session`]: the external
/// provider vouches for the token, and the local `users` table is lazily
/// provisioned on the first authenticated request of each identity.
///
/// The token is read from the session cookie first, then from an
/// `Authorization: Bearer <token>` header.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::http::HeaderMap;
/// use folio_shared::auth::session::IdentityResolver;
/// use folio_shared::auth::provider::IdentityProvider;
/// use folio_shared::db::store::Store;
///
/// # async fn example(
/// #     provider: Arc<dyn IdentityProvider>,
/// #     store: Arc<dyn Store>,
/// #     headers: HeaderMap,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = IdentityResolver::new(provider, store, "sb-access-token");
///
/// let session = resolver.require_session(&headers).await?;
/// println!("Signed in as {}", session.user.email);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use serde::Serialize;
use tracing::{debug, info};

use super::provider::{IdentityProvider, ProviderError};
use crate::db::store::{Store, StoreError};
use crate::models::user::{NewUser, User};

/// Default name of the cookie carrying the access token
pub const DEFAULT_SESSION_COOKIE: &str = "sb-access-token";

/// An authenticated caller
///
/// Only [`IdentityResolver`] produces sessions; mutating service operations
/// take one by reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Local user record
    pub user: User,

    /// Provider-side session id
    pub external_session_id: String,
}

/// Error type for identity resolution
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No valid session accompanies the request
    #[error("Authentication required")]
    Unauthenticated,

    /// The provider vouched for a session that cannot be mapped to a user
    #[error("Identity error: {0}")]
    IdentityError(String),

    /// The identity provider failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Provisioning the local user failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolves request credentials into sessions
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn Store>,
    cookie_name: String,
}

impl IdentityResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn Store>,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            cookie_name: cookie_name.into(),
        }
    }

    /// Name of the session cookie
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Reads the raw session token from the request headers
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        cookie_value(headers, &self.cookie_name).or_else(|| bearer_token(headers))
    }

    /// Resolves the caller's session, if any
    ///
    /// Returns `Ok(None)` when no token is present or the provider rejects it.
    /// The store is not touched in either case.
    pub async fn resolve_session(&self, headers: &HeaderMap) -> Result<Option<Session>, AuthError> {
        match self.extract_token(headers) {
            Some(token) => self.resolve_token(&token).await,
            None => Ok(None),
        }
    }

    /// Resolves a raw access token, e.g. one just issued by a sign-in
    pub async fn resolve_token(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let external = match self.provider.get_session(token).await? {
            Some(external) => external,
            None => {
                debug!("Provider reported no valid session");
                return Ok(None);
            }
        };

        let email = external
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| {
                AuthError::IdentityError("Session carries no email address".to_string())
            })?;

        let user = self.get_or_create_user(&external.subject, &email).await?;

        Ok(Some(Session {
            user,
            external_session_id: external.session_id,
        }))
    }

    /// Resolves the caller's session or fails with [`AuthError::Unauthenticated`]
    pub async fn require_session(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        self.resolve_session(headers)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    async fn get_or_create_user(&self, subject: &str, email: &str) -> Result<User, AuthError> {
        if let Some(user) = self.store.find_user_by_email(email).await? {
            return Ok(user);
        }

        let created = self
            .store
            .create_user(NewUser {
                id: subject.to_string(),
                email: email.to_string(),
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = %user.id, "Provisioned user on first sign-in");
                Ok(user)
            }
            // Lost a race with a concurrent first request for the same identity.
            Err(StoreError::DuplicateUser(_)) => {
                if let Some(user) = self.store.find_user_by_email(email).await? {
                    return Ok(user);
                }
                self.store.find_user_by_id(subject).await?.ok_or_else(|| {
                    AuthError::IdentityError(format!(
                        "User id {} is already bound to another email",
                        subject
                    ))
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
