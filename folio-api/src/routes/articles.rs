/// Article endpoints
///
/// # Endpoints
///
/// - `GET /v1/articles?search=&filter=` - List articles and categories
/// - `GET /v1/articles/:id` - Article with parent and children
/// - `POST /v1/articles` - Create (session required)
/// - `PUT /v1/articles/:id` - Update (session required)
/// - `DELETE /v1/articles/:id` - Delete (session required)
///
/// # Request body (create and update)
///
/// ```json
/// {
///   "title": "Getting Started",
///   "category": "Guides",
///   "content": "...",
///   "parent_id": null
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use folio_shared::{
    auth::session::Session,
    models::article::{Article, ArticleFilter},
    services::article::{ArticleDetail, ArticleInput, ArticleListing},
};
use serde::Deserialize;
use uuid::Uuid;

/// Listing query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive match on title or category
    pub search: Option<String>,

    /// Exact category; `all` disables the filter
    pub filter: Option<String>,
}

/// List articles, most recently updated first
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ArticleListing>> {
    let filter = ArticleFilter::new(query.search, query.filter);
    let listing = state.articles.list_articles(&filter).await?;

    Ok(Json(listing))
}

/// Get one article with its parent and children
///
/// # Errors
///
/// - `404 Not Found`: No article with this id
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ArticleDetail>> {
    Ok(Json(state.articles.get_article(id).await?))
}

/// Create an article
///
/// # Errors
///
/// - `401 Unauthorized`: No valid session
/// - `409 Conflict`: The title's slug is taken
/// - `422 Unprocessable Entity`: Blank fields or invalid parent
pub async fn create_article(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<ArticleInput>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let article = state.articles.create_article(&session, input).await?;

    Ok((StatusCode::CREATED, Json(article)))
}

/// Update an article
///
/// # Errors
///
/// - `401 Unauthorized`: No valid session
/// - `404 Not Found`: No article with this id
/// - `409 Conflict`: The title's slug belongs to another article
/// - `422 Unprocessable Entity`: Blank fields or invalid parent
pub async fn update_article(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(input): Json<ArticleInput>,
) -> ApiResult<Json<Article>> {
    Ok(Json(state.articles.update_article(&session, id, input).await?))
}

/// Delete an article; its children become top-level articles
pub async fn delete_article(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.articles.delete_article(&session, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
