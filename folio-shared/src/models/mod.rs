/// Database models for Folio
///
/// This module contains the persisted records and their PostgreSQL queries.
///
/// # Models
///
/// - `user`: Local user records provisioned from the identity provider
/// - `article`: Categorized articles with an optional parent
///
/// # Example
///
/// ```no_run
/// use folio_shared::models::article::{Article, ArticleFilter};
/// use folio_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let filter = ArticleFilter::new(Some("rust".to_string()), None);
/// let articles = Article::list(&pool, &filter).await?;
/// # Ok(())
/// # }
/// ```

pub mod article;
pub mod user;
