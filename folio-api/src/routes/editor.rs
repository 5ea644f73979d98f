/// Editor endpoints
///
/// - `GET /v1/editor/tree` - Every article grouped by category, roots with
///   their children (session required)

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use folio_shared::services::tree::CategoryTree;

/// Category tree for the editor sidebar
pub async fn tree(State(state): State<AppState>) -> ApiResult<Json<Vec<CategoryTree>>> {
    Ok(Json(state.articles.editor_tree().await?))
}
