/// Domain errors raised by the article service

use serde::Serialize;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::auth::session::AuthError;
use crate::db::store::StoreError;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error type for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The caller is not signed in
    #[error("Authentication required")]
    Unauthenticated,

    /// The caller's session could not be mapped to a user
    #[error("Identity error: {0}")]
    IdentityError(String),

    /// One or more input fields were rejected
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Another article already uses the slug derived from the title
    #[error("An article with slug '{slug}' already exists")]
    DuplicateSlug { slug: String },

    /// The addressed article does not exist
    #[error("Article not found: {0}")]
    NotFound(Uuid),

    /// Persistence failed unexpectedly
    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    /// Validation failure on a single field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        ServiceError::Validation(fields)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::SlugConflict(slug) => ServiceError::DuplicateSlug { slug },
            StoreError::InvalidParent(_) => {
                ServiceError::field("parent_id", "Parent article does not exist")
            }
            other => ServiceError::Store(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => ServiceError::Unauthenticated,
            AuthError::IdentityError(msg) => ServiceError::IdentityError(msg),
            AuthError::Provider(e) => ServiceError::IdentityError(e.to_string()),
            AuthError::Store(e) => ServiceError::Store(e),
        }
    }
}
