/// Article domain logic
///
/// # Modules
///
/// - `slug`: Title to URL slug conversion
/// - `tree`: Category tree for the editor sidebar
/// - `article`: `ArticleService`, the validated write path and read queries
/// - `error`: `ServiceError`, the domain error taxonomy

pub mod article;
pub mod error;
pub mod slug;
pub mod tree;
