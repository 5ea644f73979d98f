/// Article model and database operations
///
/// Articles are grouped by a free-text category and may point at one parent
/// article, forming at most one level of nesting. The slug is derived from the
/// title by the article service and is unique across all articles.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE articles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title TEXT NOT NULL,
///     slug TEXT NOT NULL,
///     category TEXT NOT NULL,
///     content TEXT NOT NULL,
///     parent_id UUID,
///     author_id TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT articles_slug_key UNIQUE (slug),
///     CONSTRAINT articles_parent_id_fkey FOREIGN KEY (parent_id)
///         REFERENCES articles (id) ON DELETE SET NULL,
///     CONSTRAINT articles_author_id_fkey FOREIGN KEY (author_id)
///         REFERENCES users (id)
/// );
/// ```
///
/// The query functions here are thin and return raw `sqlx::Error`s. Callers
/// that need domain errors go through [`crate::db::postgres::PgStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Unique constraint backing slug uniqueness
pub const SLUG_CONSTRAINT: &str = "articles_slug_key";

/// Foreign key from `parent_id` to `articles.id`
pub const PARENT_CONSTRAINT: &str = "articles_parent_id_fkey";

/// Foreign key from `author_id` to `users.id`
pub const AUTHOR_CONSTRAINT: &str = "articles_author_id_fkey";

const ARTICLE_COLUMNS: &str =
    "id, title, slug, category, content, parent_id, author_id, created_at, updated_at";

/// An article record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    /// Opaque, stable identifier
    pub id: Uuid,

    /// Display title (never blank)
    pub title: String,

    /// URL-safe identifier derived from the title
    pub slug: String,

    /// Category label used for grouping
    pub category: String,

    /// Body text
    pub content: String,

    /// Parent article, if this is a child
    pub parent_id: Option<Uuid>,

    /// User who last wrote the article
    pub author_id: String,

    /// When the article was created
    pub created_at: DateTime<Utc>,

    /// When the article was last written
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Whether the article sits at the top of its category
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Full set of writable fields for a create or update
///
/// Every write replaces all of these. Timestamps and the id are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFields {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub author_id: String,
}

/// Filter for article listings
///
/// Empty values and the `"all"` category sentinel mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFilter {
    /// Case-insensitive substring matched against title or category
    pub search: Option<String>,

    /// Exact category match
    pub category: Option<String>,
}

impl ArticleFilter {
    /// Category value that disables category filtering
    pub const ALL_CATEGORIES: &'static str = "all";

    /// Builds a filter from raw query parameters
    pub fn new(search: Option<String>, category: Option<String>) -> Self {
        let search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let category = category
            .filter(|c| !c.is_empty() && c != Self::ALL_CATEGORIES);

        Self { search, category }
    }

    /// Evaluates the filter against an in-memory article
    pub fn matches(&self, article: &Article) -> bool {
        if let Some(ref category) = self.category {
            if &article.category != category {
                return false;
            }
        }

        match self.search {
            Some(ref search) => {
                let needle = search.to_lowercase();
                article.title.to_lowercase().contains(&needle)
                    || article.category.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }

    /// ILIKE pattern for the search term, with wildcards escaped
    fn like_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|search| {
            let mut escaped = String::with_capacity(search.len() + 2);
            escaped.push('%');
            for ch in search.chars() {
                if matches!(ch, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(ch);
            }
            escaped.push('%');
            escaped
        })
    }
}

impl Article {
    /// Inserts a new article
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The slug already exists (`articles_slug_key`)
    /// - `parent_id` or `author_id` reference missing rows
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: ArticleFields) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO articles (title, slug, category, content, parent_id, author_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ARTICLE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(data.title)
            .bind(data.slug)
            .bind(data.category)
            .bind(data.content)
            .bind(data.parent_id)
            .bind(data.author_id)
            .fetch_one(pool)
            .await
    }

    /// Replaces all writable fields and re-stamps `updated_at`
    ///
    /// Returns `None` if the article does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: ArticleFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE articles
            SET title = $2, slug = $3, category = $4, content = $5,
                parent_id = $6, author_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {ARTICLE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .bind(data.title)
            .bind(data.slug)
            .bind(data.category)
            .bind(data.content)
            .bind(data.parent_id)
            .bind(data.author_id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes an article
    ///
    /// Children are orphaned to root by the `ON DELETE SET NULL` foreign key.
    /// Returns false if the article didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds an article by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");

        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an article by exact slug, optionally ignoring one id
    pub async fn find_by_slug(
        pool: &PgPool,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {ARTICLE_COLUMNS}
            FROM articles
            WHERE slug = $1 AND ($2::UUID IS NULL OR id <> $2)
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(slug)
            .bind(exclude_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists articles matching `filter`, most recently updated first
    pub async fn list(pool: &PgPool, filter: &ArticleFilter) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {ARTICLE_COLUMNS}
            FROM articles
            WHERE ($1::TEXT IS NULL
                   OR title ILIKE $1 ESCAPE '\'
                   OR category ILIKE $1 ESCAPE '\')
              AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY updated_at DESC, id
            "#
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(filter.like_pattern())
            .bind(filter.category.clone())
            .fetch_all(pool)
            .await
    }

    /// Lists the direct children of an article, ordered by title
    pub async fn list_children(pool: &PgPool, parent_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE parent_id = $1 ORDER BY title ASC"
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    /// Counts direct children of each listed parent
    ///
    /// Parents without children produce no row.
    pub async fn count_children(
        pool: &PgPool,
        parent_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT parent_id, COUNT(*)
            FROM articles
            WHERE parent_id = ANY($1)
            GROUP BY parent_id
            "#,
        )
        .bind(parent_ids)
        .fetch_all(pool)
        .await
    }

    /// Lists every category in use, alphabetically
    pub async fn distinct_categories(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM articles ORDER BY category",
        )
        .fetch_all(pool)
        .await
    }
}
