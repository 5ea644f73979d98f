/// PostgreSQL-backed [`Store`]
///
/// Wraps a `PgPool` owned by the caller and delegates to the query functions
/// on the models, translating constraint violations into [`StoreError`]
/// variants. The schema's unique and foreign-key constraints are what make
/// this store authoritative under concurrent writes.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_shared::db::pool::{create_pool, DatabaseConfig};
/// use folio_shared::db::postgres::PgStore;
/// use folio_shared::db::store::Store;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::pool::health_check;
use super::store::{ArticleStore, Store, StoreError, StoreResult, UserStore};
use crate::models::article::{
    Article, ArticleFields, ArticleFilter, AUTHOR_CONSTRAINT, PARENT_CONSTRAINT, SLUG_CONSTRAINT,
};
use crate::models::user::{NewUser, User, EMAIL_CONSTRAINT, PRIMARY_KEY_CONSTRAINT};

/// Store over a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a failed article write onto the constraint it violated
fn article_write_error(err: sqlx::Error, slug: &str, parent_id: Option<Uuid>, author_id: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.constraint() {
            Some(SLUG_CONSTRAINT) => return StoreError::SlugConflict(slug.to_string()),
            Some(PARENT_CONSTRAINT) => {
                if let Some(parent_id) = parent_id {
                    return StoreError::InvalidParent(parent_id);
                }
            }
            Some(AUTHOR_CONSTRAINT) => return StoreError::UnknownAuthor(author_id.to_string()),
            _ => {}
        }
    }

    warn!(error = %err, "Article write failed");
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn create_user(&self, data: NewUser) -> StoreResult<User> {
        let email = data.email.clone();

        User::create(&self.pool, data).await.map_err(|err| {
            if let sqlx::Error::Database(ref db_err) = err {
                if matches!(db_err.constraint(), Some(EMAIL_CONSTRAINT | PRIMARY_KEY_CONSTRAINT)) {
                    debug!(email = %email, "User already provisioned");
                    return StoreError::DuplicateUser(email);
                }
            }
            StoreError::Database(err)
        })
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn find_by_slug(
        &self,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<Option<Article>> {
        Ok(Article::find_by_slug(&self.pool, slug, exclude_id).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Article>> {
        Ok(Article::find_by_id(&self.pool, id).await?)
    }

    async fn list(&self, filter: &ArticleFilter) -> StoreResult<Vec<Article>> {
        Ok(Article::list(&self.pool, filter).await?)
    }

    async fn list_distinct_categories(&self) -> StoreResult<BTreeSet<String>> {
        let categories = Article::distinct_categories(&self.pool).await?;
        Ok(categories.into_iter().collect())
    }

    async fn create(&self, data: ArticleFields) -> StoreResult<Article> {
        let slug = data.slug.clone();
        let parent_id = data.parent_id;
        let author_id = data.author_id.clone();

        Article::create(&self.pool, data)
            .await
            .map_err(|err| article_write_error(err, &slug, parent_id, &author_id))
    }

    async fn update(&self, id: Uuid, data: ArticleFields) -> StoreResult<Article> {
        let slug = data.slug.clone();
        let parent_id = data.parent_id;
        let author_id = data.author_id.clone();

        Article::update(&self.pool, id, data)
            .await
            .map_err(|err| article_write_error(err, &slug, parent_id, &author_id))?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        if Article::delete(&self.pool, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    async fn list_children_of(&self, id: Uuid) -> StoreResult<Vec<Article>> {
        Ok(Article::list_children(&self.pool, id).await?)
    }

    async fn count_children(&self, parent_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, usize>> {
        let rows = Article::count_children(&self.pool, parent_ids).await?;
        Ok(rows
            .into_iter()
            .map(|(parent_id, count)| (parent_id, count.max(0) as usize))
            .collect())
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
