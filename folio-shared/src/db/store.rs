/// Persistence interface consumed by the identity resolver and the article
/// service
///
/// Every operation is a single atomic call against the backing store. The
/// store, not its callers, is the final arbiter of slug and email uniqueness
/// and of parent/author referential integrity.
///
/// Two implementations ship with the crate:
/// - [`crate::db::postgres::PgStore`] over a `PgPool`
/// - [`crate::db::memory::MemoryStore`] held in process memory

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::article::{Article, ArticleFields, ArticleFilter};
use crate::models::user::{NewUser, User};

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a [`Store`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed article does not exist
    #[error("Article not found: {0}")]
    NotFound(Uuid),

    /// Another article already owns this slug
    #[error("Slug already in use: {0}")]
    SlugConflict(String),

    /// A user with this email or id already exists
    #[error("User already exists: {0}")]
    DuplicateUser(String),

    /// `parent_id` references a missing article
    #[error("Parent article does not exist: {0}")]
    InvalidParent(Uuid),

    /// `author_id` references a missing user
    #[error("Author does not exist: {0}")]
    UnknownAuthor(String),

    /// Unexpected persistence failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// User record persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up a user by exact email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Looks up a user by id
    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Provisions a user
    ///
    /// Fails with [`StoreError::DuplicateUser`] if the email or id is taken.
    async fn create_user(&self, data: NewUser) -> StoreResult<User>;
}

/// Article record persistence
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Exact, case-sensitive slug lookup; `exclude_id` is never returned
    async fn find_by_slug(&self, slug: &str, exclude_id: Option<Uuid>)
        -> StoreResult<Option<Article>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Article>>;

    /// Articles matching `filter`, most recently updated first
    async fn list(&self, filter: &ArticleFilter) -> StoreResult<Vec<Article>>;

    async fn list_distinct_categories(&self) -> StoreResult<BTreeSet<String>>;

    /// Inserts an article, assigning its id and timestamps
    async fn create(&self, data: ArticleFields) -> StoreResult<Article>;

    /// Replaces an article's fields and re-stamps `updated_at`
    async fn update(&self, id: Uuid, data: ArticleFields) -> StoreResult<Article>;

    /// Deletes an article, orphaning its children to root
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Direct children of `id`, ordered by title
    async fn list_children_of(&self, id: Uuid) -> StoreResult<Vec<Article>>;

    /// Number of direct children per parent; parents without children are absent
    async fn count_children(&self, parent_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, usize>>;
}

/// Complete persistence backend
#[async_trait]
pub trait Store: UserStore + ArticleStore {
    /// Short name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Round-trips a trivial query to prove the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}
