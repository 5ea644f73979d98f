/// Article service
///
/// Owns the write protocol for articles: input validation, parent rules, slug
/// derivation and uniqueness, and author attribution. Writes require a
/// [`Session`], which only the identity resolver can produce.
///
/// # Write protocol
///
/// 1. `title`, `category` and `content` must be non-blank.
/// 2. A `parent_id` must name an existing root article other than the article
///    itself, and an article with children cannot be given a parent.
/// 3. The slug is derived from the title and must be non-empty.
/// 4. The slug must not belong to another article.
/// 5. The article is persisted with `author_id` set to the session's user.
///
/// The store's unique index has the final word on slugs; a conflict it reports
/// is surfaced as [`ServiceError::DuplicateSlug`] like the pre-check.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_shared::auth::session::Session;
/// use folio_shared::db::memory::MemoryStore;
/// use folio_shared::services::article::{ArticleInput, ArticleService};
///
/// # async fn example(session: Session) -> Result<(), Box<dyn std::error::Error>> {
/// let service = ArticleService::new(Arc::new(MemoryStore::new()));
///
/// let article = service
///     .create_article(
///         &session,
///         ArticleInput {
///             title: "Hello World!".to_string(),
///             category: "Guides".to_string(),
///             content: "First post".to_string(),
///             parent_id: None,
///         },
///     )
///     .await?;
/// assert_eq!(article.slug, "hello-world");
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::error::ServiceError;
use super::slug::slugify;
use super::tree::{build_tree, CategoryTree};
use crate::auth::session::Session;
use crate::db::store::Store;
use crate::models::article::{Article, ArticleFields, ArticleFilter};

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Editable article fields as submitted by an editor
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ArticleInput {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,

    #[validate(custom(function = "not_blank", message = "Category is required"))]
    pub category: String,

    #[validate(custom(function = "not_blank", message = "Content is required"))]
    pub content: String,

    /// Parent article id; an empty string means none
    #[serde(deserialize_with = "empty_string_as_none")]
    pub parent_id: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty()))
}

/// An article with its neighbours in the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDetail {
    pub article: Article,
    pub parent: Option<Article>,
    /// Ordered by title
    pub children: Vec<Article>,
}

/// A listed article with the size of its subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSummary {
    #[serde(flatten)]
    pub article: Article,

    /// Number of direct children
    pub child_count: usize,
}

/// Filtered article list plus every known category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleListing {
    /// Most recently updated first
    pub articles: Vec<ArticleSummary>,

    /// All categories in the store, sorted, independent of the filter
    pub categories: Vec<String>,
}

/// Article operations over a [`Store`]
#[derive(Clone)]
pub struct ArticleService {
    store: Arc<dyn Store>,
}

impl ArticleService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an article authored by the session's user
    pub async fn create_article(
        &self,
        session: &Session,
        input: ArticleInput,
    ) -> ServiceResult<Article> {
        let fields = self.prepare_fields(session, None, input).await?;
        let slug = fields.slug.clone();

        let article = self.store.create(fields).await.map_err(|e| {
            warn!(slug = %slug, error = %e, "Article create rejected by store");
            ServiceError::from(e)
        })?;

        info!(
            article_id = %article.id,
            slug = %article.slug,
            author_id = %article.author_id,
            "Article created"
        );

        Ok(article)
    }

    /// Replaces an article's editable fields
    ///
    /// The session's user becomes the article's author.
    pub async fn update_article(
        &self,
        session: &Session,
        id: Uuid,
        input: ArticleInput,
    ) -> ServiceResult<Article> {
        let fields = self.prepare_fields(session, Some(id), input).await?;
        let slug = fields.slug.clone();

        let article = self.store.update(id, fields).await.map_err(|e| {
            warn!(article_id = %id, slug = %slug, error = %e, "Article update rejected by store");
            ServiceError::from(e)
        })?;

        info!(
            article_id = %article.id,
            slug = %article.slug,
            author_id = %article.author_id,
            "Article updated"
        );

        Ok(article)
    }

    /// Deletes an article; its children become roots
    ///
    /// Any signed-in user may delete any article.
    pub async fn delete_article(&self, session: &Session, id: Uuid) -> ServiceResult<()> {
        self.store.delete(id).await?;

        info!(article_id = %id, user_id = %session.user.id, "Article deleted");
        Ok(())
    }

    /// Loads an article with its parent and children
    pub async fn get_article(&self, id: Uuid) -> ServiceResult<ArticleDetail> {
        let article = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;

        let parent = match article.parent_id {
            Some(parent_id) => self.store.find_by_id(parent_id).await?,
            None => None,
        };
        let children = self.store.list_children_of(id).await?;

        Ok(ArticleDetail {
            article,
            parent,
            children,
        })
    }

    /// Lists articles matching `filter` together with all categories
    pub async fn list_articles(&self, filter: &ArticleFilter) -> ServiceResult<ArticleListing> {
        let articles = self.store.list(filter).await?;
        let categories = self.store.list_distinct_categories().await?;

        let ids: Vec<Uuid> = articles.iter().map(|a| a.id).collect();
        let child_counts = self.store.count_children(&ids).await?;
        let articles: Vec<ArticleSummary> = articles
            .into_iter()
            .map(|article| ArticleSummary {
                child_count: child_counts.get(&article.id).copied().unwrap_or(0),
                article,
            })
            .collect();

        debug!(
            matched = articles.len(),
            categories = categories.len(),
            "Listed articles"
        );

        Ok(ArticleListing {
            articles,
            categories: categories.into_iter().collect(),
        })
    }

    /// Category tree of every article, for the editor sidebar
    pub async fn editor_tree(&self) -> ServiceResult<Vec<CategoryTree>> {
        let mut articles = self.store.list(&ArticleFilter::default()).await?;
        articles.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.title.cmp(&b.title)));

        Ok(build_tree(&articles))
    }

    /// Runs the write protocol up to, but not including, persistence
    async fn prepare_fields(
        &self,
        session: &Session,
        id: Option<Uuid>,
        input: ArticleInput,
    ) -> ServiceResult<ArticleFields> {
        input.validate()?;

        if let Some(id) = id {
            if self.store.find_by_id(id).await?.is_none() {
                return Err(ServiceError::NotFound(id));
            }
        }

        let parent_id = match input.parent_id.as_deref() {
            Some(raw) => Some(self.check_parent(id, raw).await?),
            None => None,
        };

        let title = input.title.trim().to_string();
        let slug = slugify(&title);
        if slug.is_empty() {
            return Err(ServiceError::field(
                "title",
                "Title must contain at least one letter or digit",
            ));
        }

        if let Some(existing) = self.store.find_by_slug(&slug, id).await? {
            debug!(slug = %slug, existing_id = %existing.id, "Slug already taken");
            return Err(ServiceError::DuplicateSlug { slug });
        }

        Ok(ArticleFields {
            title,
            slug,
            category: input.category.trim().to_string(),
            content: input.content,
            parent_id,
            author_id: session.user.id.clone(),
        })
    }

    /// Parses `raw` and enforces the one-level hierarchy for `id` (None when creating)
    async fn check_parent(&self, id: Option<Uuid>, raw: &str) -> ServiceResult<Uuid> {
        let parent_id = Uuid::parse_str(raw)
            .map_err(|_| ServiceError::field("parent_id", "Parent id is not a valid article id"))?;

        if id == Some(parent_id) {
            return Err(ServiceError::field(
                "parent_id",
                "An article cannot be its own parent",
            ));
        }

        let parent = self
            .store
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| ServiceError::field("parent_id", "Parent article does not exist"))?;

        if !parent.is_root() {
            return Err(ServiceError::field(
                "parent_id",
                "Parent article must be a top-level article",
            ));
        }

        if let Some(id) = id {
            if !self.store.list_children_of(id).await?.is_empty() {
                return Err(ServiceError::field(
                    "parent_id",
                    "An article with children cannot be nested under another article",
                ));
            }
        }

        Ok(parent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::store::{ArticleStore, StoreResult, UserStore};
    use crate::models::user::{NewUser, User};
    use async_trait::async_trait;
    use std::collections::{BTreeSet, HashMap};

    async fn setup() -> (ArticleService, Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                id: "user-1".to_string(),
                email: "editor@example.com".to_string(),
            })
            .await
            .unwrap();
        let session = Session {
            user,
            external_session_id: "sess-1".to_string(),
        };
        (ArticleService::new(store.clone()), store, session)
    }

    fn input(title: &str, category: &str) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            category: category.to_string(),
            content: "Body".to_string(),
            parent_id: None,
        }
    }

    fn child_input(title: &str, parent_id: Uuid) -> ArticleInput {
        ArticleInput {
            parent_id: Some(parent_id.to_string()),
            ..input(title, "Guides")
        }
    }

    fn validation_fields(err: ServiceError) -> Vec<String> {
        match err {
            ServiceError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_author() {
        let (service, _, session) = setup().await;

        let article = service
            .create_article(&session, input("  Hello World!  ", " Guides "))
            .await
            .unwrap();

        assert_eq!(article.slug, "hello-world");
        assert_eq!(article.title, "Hello World!");
        assert_eq!(article.category, "Guides");
        assert_eq!(article.author_id, session.user.id);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slug() {
        let (service, _, session) = setup().await;
        service.create_article(&session, input("Hello World", "A")).await.unwrap();

        let err = service
            .create_article(&session, input("hello   world!!", "B"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateSlug { slug } if slug == "hello-world"));
    }

    #[tokio::test]
    async fn test_update_to_own_title_succeeds() {
        let (service, _, session) = setup().await;
        let article = service.create_article(&session, input("Same", "A")).await.unwrap();

        let mut changed = input("Same", "A");
        changed.content = "Edited".to_string();
        let updated = service.update_article(&session, article.id, changed).await.unwrap();

        assert_eq!(updated.id, article.id);
        assert_eq!(updated.slug, "same");
        assert_eq!(updated.content, "Edited");
    }

    #[tokio::test]
    async fn test_update_to_taken_slug_fails() {
        let (service, _, session) = setup().await;
        service.create_article(&session, input("First", "A")).await.unwrap();
        let second = service.create_article(&session, input("Second", "A")).await.unwrap();

        let err = service
            .update_article(&session, second.id, input("First", "A"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateSlug { .. }));
    }

    #[tokio::test]
    async fn test_update_missing_article() {
        let (service, _, session) = setup().await;
        let id = Uuid::new_v4();

        let err = service
            .update_article(&session, id, input("Anything", "A"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_delete_missing_article() {
        let (service, _, session) = setup().await;
        let id = Uuid::new_v4();

        let err = service.delete_article(&session, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_blank_fields_are_reported_together() {
        let (service, store, session) = setup().await;

        let err = service
            .create_article(
                &session,
                ArticleInput {
                    title: "  ".to_string(),
                    category: String::new(),
                    content: "\n".to_string(),
                    parent_id: None,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(validation_fields(err), vec!["category", "content", "title"]);
        assert!(store.list(&ArticleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_symbol_only_title_is_rejected() {
        let (service, _, session) = setup().await;

        let err = service
            .create_article(&session, input("!!!", "A"))
            .await
            .unwrap_err();
        assert_eq!(validation_fields(err), vec!["title"]);
    }

    #[tokio::test]
    async fn test_parent_rules() {
        let (service, _, session) = setup().await;
        let root = service.create_article(&session, input("Root", "Guides")).await.unwrap();
        let child = service
            .create_article(&session, child_input("Child", root.id))
            .await
            .unwrap();
        assert_eq!(child.parent_id, Some(root.id));

        // grandchild
        let err = service
            .create_article(&session, child_input("Grandchild", child.id))
            .await
            .unwrap_err();
        assert_eq!(validation_fields(err), vec!["parent_id"]);

        // missing parent
        let err = service
            .create_article(&session, child_input("Lost", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(validation_fields(err), vec!["parent_id"]);

        // self parent
        let err = service
            .update_article(&session, root.id, child_input("Root", root.id))
            .await
            .unwrap_err();
        assert_eq!(validation_fields(err), vec!["parent_id"]);

        // a parent cannot itself be nested
        let other = service.create_article(&session, input("Other", "Guides")).await.unwrap();
        let err = service
            .update_article(&session, root.id, child_input("Root", other.id))
            .await
            .unwrap_err();
        assert_eq!(validation_fields(err), vec!["parent_id"]);
    }

    #[tokio::test]
    async fn test_get_article_with_neighbours() {
        let (service, store, session) = setup().await;
        let root = service.create_article(&session, input("Root", "Guides")).await.unwrap();
        let b = service.create_article(&session, child_input("B", root.id)).await.unwrap();
        service.create_article(&session, child_input("A", root.id)).await.unwrap();

        let detail = service.get_article(root.id).await.unwrap();
        assert!(detail.parent.is_none());
        let children: Vec<&str> = detail.children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(children, vec!["A", "B"]);

        let detail = service.get_article(b.id).await.unwrap();
        assert_eq!(detail.parent.map(|p| p.id), Some(root.id));

        store.delete(root.id).await.unwrap();
        assert!(matches!(
            service.get_article(root.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(service.get_article(b.id).await.unwrap().parent.is_none());
    }

    #[tokio::test]
    async fn test_list_articles_returns_all_categories() {
        let (service, _, session) = setup().await;
        service.create_article(&session, input("Rust intro", "Guides")).await.unwrap();
        service.create_article(&session, input("HTTP", "Reference")).await.unwrap();

        let listing = service
            .list_articles(&ArticleFilter::new(None, Some("Reference".to_string())))
            .await
            .unwrap();

        assert_eq!(listing.articles.len(), 1);
        assert_eq!(listing.articles[0].article.title, "HTTP");
        assert_eq!(listing.categories, vec!["Guides", "Reference"]);
    }

    #[tokio::test]
    async fn test_list_articles_counts_children() {
        let (service, _, session) = setup().await;
        let root = service.create_article(&session, input("Root", "Guides")).await.unwrap();
        service.create_article(&session, child_input("A", root.id)).await.unwrap();
        service.create_article(&session, child_input("B", root.id)).await.unwrap();

        let listing = service.list_articles(&ArticleFilter::default()).await.unwrap();

        let counts: Vec<(&str, usize)> = listing
            .articles
            .iter()
            .map(|s| (s.article.title.as_str(), s.child_count))
            .collect();
        assert_eq!(counts.len(), 3);
        assert!(counts.contains(&("Root", 2)));
        assert!(counts.contains(&("A", 0)));
        assert!(counts.contains(&("B", 0)));
    }

    #[tokio::test]
    async fn test_malformed_parent_id_is_field_error() {
        let (service, store, session) = setup().await;

        let err = service
            .create_article(
                &session,
                ArticleInput {
                    parent_id: Some("not-a-uuid".to_string()),
                    ..input("Child", "Guides")
                },
            )
            .await
            .unwrap_err();

        assert_eq!(validation_fields(err), vec!["parent_id"]);
        assert!(store.list(&ArticleFilter::default()).await.unwrap().is_empty());
    }

    #[test]
    fn test_blank_parent_id_deserializes_to_none() {
        let input: ArticleInput =
            serde_json::from_str(r#"{"title":"T","category":"C","content":"x","parent_id":"  "}"#)
                .unwrap();
        assert_eq!(input.parent_id, None);

        let input: ArticleInput =
            serde_json::from_str(r#"{"title":"T","category":"C","content":"x","parent_id":null}"#)
                .unwrap();
        assert_eq!(input.parent_id, None);
    }

    #[tokio::test]
    async fn test_editor_tree() {
        let (service, _, session) = setup().await;
        service.create_article(&session, input("C", "X")).await.unwrap();
        let b = service.create_article(&session, input("B", "X")).await.unwrap();
        let mut a = child_input("A", b.id);
        a.category = "X".to_string();
        service.create_article(&session, a).await.unwrap();
        // categories come out sorted
        service.create_article(&session, input("Z", "W")).await.unwrap();

        let tree = service.editor_tree().await.unwrap();
        let categories: Vec<&str> = tree.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(categories, vec!["W", "X"]);

        let roots: Vec<&str> = tree[1].articles.iter().map(|n| n.article.title.as_str()).collect();
        assert_eq!(roots, vec!["B", "C"]);
        assert_eq!(tree[1].articles[0].children[0].title, "A");
    }

    /// Hides existing slugs from the pre-check to simulate a concurrent writer
    struct BlindSlugStore(MemoryStore);

    #[async_trait]
    impl UserStore for BlindSlugStore {
        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.0.find_user_by_email(email).await
        }

        async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
            self.0.find_user_by_id(id).await
        }

        async fn create_user(&self, data: NewUser) -> StoreResult<User> {
            self.0.create_user(data).await
        }
    }

    #[async_trait]
    impl ArticleStore for BlindSlugStore {
        async fn find_by_slug(&self, _: &str, _: Option<Uuid>) -> StoreResult<Option<Article>> {
            Ok(None)
        }

        async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Article>> {
            self.0.find_by_id(id).await
        }

        async fn list(&self, filter: &ArticleFilter) -> StoreResult<Vec<Article>> {
            self.0.list(filter).await
        }

        async fn list_distinct_categories(&self) -> StoreResult<BTreeSet<String>> {
            self.0.list_distinct_categories().await
        }

        async fn create(&self, data: ArticleFields) -> StoreResult<Article> {
            self.0.create(data).await
        }

        async fn update(&self, id: Uuid, data: ArticleFields) -> StoreResult<Article> {
            self.0.update(id, data).await
        }

        async fn delete(&self, id: Uuid) -> StoreResult<()> {
            self.0.delete(id).await
        }

        async fn list_children_of(&self, id: Uuid) -> StoreResult<Vec<Article>> {
            self.0.list_children_of(id).await
        }

        async fn count_children(&self, parent_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, usize>> {
            self.0.count_children(parent_ids).await
        }
    }

    #[async_trait]
    impl Store for BlindSlugStore {
        fn backend_name(&self) -> &'static str {
            "blind-slug"
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_late_slug_conflict_is_duplicate_slug() {
        let store = Arc::new(BlindSlugStore(MemoryStore::new()));
        let user = store
            .create_user(NewUser {
                id: "user-1".to_string(),
                email: "editor@example.com".to_string(),
            })
            .await
            .unwrap();
        let session = Session {
            user,
            external_session_id: "sess-1".to_string(),
        };
        let service = ArticleService::new(store);

        service.create_article(&session, input("Race", "A")).await.unwrap();
        let err = service
            .create_article(&session, input("Race", "B"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::DuplicateSlug { slug } if slug == "race"));
    }
}
