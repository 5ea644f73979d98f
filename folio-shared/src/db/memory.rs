/// In-process [`Store`]
///
/// Holds users and articles behind a single `RwLock`, so each operation
/// observes and commits a consistent state. It enforces the same constraints
/// as the PostgreSQL schema: unique slugs, unique emails, parent and author
/// referential integrity, and orphan-to-root on delete.
///
/// Used by the test suites and for running the API without a database.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{ArticleStore, Store, StoreError, StoreResult, UserStore};
use crate::models::article::{Article, ArticleFields, ArticleFilter};
use crate::models::user::{NewUser, User};

#[derive(Debug)]
struct StoredArticle {
    article: Article,
    /// Write sequence, breaks `updated_at` ties when ordering
    seq: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, User>,
    articles: HashMap<Uuid, StoredArticle>,
    next_seq: u64,
}

impl MemoryState {
    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn slug_taken(&self, slug: &str, exclude_id: Option<Uuid>) -> bool {
        self.articles
            .values()
            .any(|s| s.article.slug == slug && Some(s.article.id) != exclude_id)
    }

    fn check_references(&self, data: &ArticleFields) -> StoreResult<()> {
        if let Some(parent_id) = data.parent_id {
            if !self.articles.contains_key(&parent_id) {
                return Err(StoreError::InvalidParent(parent_id));
            }
        }
        if !self.users.contains_key(&data.author_id) {
            return Err(StoreError::UnknownAuthor(data.author_id.clone()));
        }
        Ok(())
    }
}

/// Store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    operations: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations served so far
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Number of provisioned users
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.record_operation();
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.record_operation();
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn create_user(&self, data: NewUser) -> StoreResult<User> {
        self.record_operation();
        let mut state = self.state.write().await;

        if state.users.contains_key(&data.id) || state.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::DuplicateUser(data.email));
        }

        let user = User {
            id: data.id,
            email: data.email,
            created_at: Utc::now(),
        };
        state.users.insert(user.id.clone(), user.clone());

        Ok(user)
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn find_by_slug(
        &self,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<Option<Article>> {
        self.record_operation();
        let state = self.state.read().await;
        Ok(state
            .articles
            .values()
            .map(|s| &s.article)
            .find(|a| a.slug == slug && Some(a.id) != exclude_id)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Article>> {
        self.record_operation();
        let state = self.state.read().await;
        Ok(state.articles.get(&id).map(|s| s.article.clone()))
    }

    async fn list(&self, filter: &ArticleFilter) -> StoreResult<Vec<Article>> {
        self.record_operation();
        let state = self.state.read().await;

        let mut matched: Vec<&StoredArticle> = state
            .articles
            .values()
            .filter(|s| filter.matches(&s.article))
            .collect();
        matched.sort_by(|a, b| {
            b.article
                .updated_at
                .cmp(&a.article.updated_at)
                .then(b.seq.cmp(&a.seq))
        });

        Ok(matched.into_iter().map(|s| s.article.clone()).collect())
    }

    async fn list_distinct_categories(&self) -> StoreResult<BTreeSet<String>> {
        self.record_operation();
        let state = self.state.read().await;
        Ok(state
            .articles
            .values()
            .map(|s| s.article.category.clone())
            .collect())
    }

    async fn create(&self, data: ArticleFields) -> StoreResult<Article> {
        self.record_operation();
        let mut state = self.state.write().await;

        if state.slug_taken(&data.slug, None) {
            return Err(StoreError::SlugConflict(data.slug));
        }
        state.check_references(&data)?;

        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            title: data.title,
            slug: data.slug,
            category: data.category,
            content: data.content,
            parent_id: data.parent_id,
            author_id: data.author_id,
            created_at: now,
            updated_at: now,
        };
        let seq = state.bump_seq();
        state.articles.insert(
            article.id,
            StoredArticle {
                article: article.clone(),
                seq,
            },
        );

        Ok(article)
    }

    async fn update(&self, id: Uuid, data: ArticleFields) -> StoreResult<Article> {
        self.record_operation();
        let mut state = self.state.write().await;

        if !state.articles.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if state.slug_taken(&data.slug, Some(id)) {
            return Err(StoreError::SlugConflict(data.slug));
        }
        state.check_references(&data)?;

        let seq = state.bump_seq();
        let stored = state
            .articles
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        let article = &mut stored.article;
        article.title = data.title;
        article.slug = data.slug;
        article.category = data.category;
        article.content = data.content;
        article.parent_id = data.parent_id;
        article.author_id = data.author_id;
        article.updated_at = Utc::now().max(article.created_at);
        stored.seq = seq;

        Ok(stored.article.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.record_operation();
        let mut state = self.state.write().await;

        if state.articles.remove(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }

        for stored in state.articles.values_mut() {
            if stored.article.parent_id == Some(id) {
                stored.article.parent_id = None;
            }
        }

        Ok(())
    }

    async fn list_children_of(&self, id: Uuid) -> StoreResult<Vec<Article>> {
        self.record_operation();
        let state = self.state.read().await;

        let mut children: Vec<Article> = state
            .articles
            .values()
            .filter(|s| s.article.parent_id == Some(id))
            .map(|s| s.article.clone())
            .collect();
        children.sort_by(|a, b| a.title.cmp(&b.title));

        Ok(children)
    }

    async fn count_children(&self, parent_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, usize>> {
        self.record_operation();
        let state = self.state.read().await;

        let mut counts = HashMap::new();
        for parent_id in state.articles.values().filter_map(|s| s.article.parent_id) {
            if parent_ids.contains(&parent_id) {
                *counts.entry(parent_id).or_insert(0) += 1;
            }
        }

        Ok(counts)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.record_operation();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_author() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                id: "author-1".to_string(),
                email: "author@example.com".to_string(),
            })
            .await
            .unwrap();
        (store, user.id)
    }

    fn fields(title: &str, slug: &str, author: &str) -> ArticleFields {
        ArticleFields {
            title: title.to_string(),
            slug: slug.to_string(),
            category: "Tech".to_string(),
            content: "content".to_string(),
            parent_id: None,
            author_id: author.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slug() {
        let (store, author) = store_with_author().await;
        store.create(fields("One", "same", &author)).await.unwrap();

        let err = store.create(fields("Two", "same", &author)).await.unwrap_err();
        assert!(matches!(err, StoreError::SlugConflict(slug) if slug == "same"));
    }

    #[tokio::test]
    async fn test_update_allows_own_slug() {
        let (store, author) = store_with_author().await;
        let article = store.create(fields("One", "one", &author)).await.unwrap();

        let updated = store
            .update(article.id, fields("One", "one", &author))
            .await
            .unwrap();
        assert_eq!(updated.slug, "one");
        assert!(updated.updated_at >= article.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_article() {
        let (store, author) = store_with_author().await;
        let id = Uuid::new_v4();

        let err = store.update(id, fields("X", "x", &author)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_create_checks_references() {
        let (store, author) = store_with_author().await;

        let mut orphan = fields("Child", "child", &author);
        orphan.parent_id = Some(Uuid::new_v4());
        assert!(matches!(
            store.create(orphan).await.unwrap_err(),
            StoreError::InvalidParent(_)
        ));

        assert!(matches!(
            store.create(fields("X", "x", "nobody")).await.unwrap_err(),
            StoreError::UnknownAuthor(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_orphans_children() {
        let (store, author) = store_with_author().await;
        let parent = store.create(fields("Parent", "parent", &author)).await.unwrap();

        let mut child_fields = fields("Child", "child", &author);
        child_fields.parent_id = Some(parent.id);
        let child = store.create(child_fields).await.unwrap();

        store.delete(parent.id).await.unwrap();

        let child = store.find_by_id(child.id).await.unwrap().unwrap();
        assert!(child.parent_id.is_none());
        assert!(matches!(
            store.delete(parent.id).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_orders_by_most_recent_write() {
        let (store, author) = store_with_author().await;
        let first = store.create(fields("First", "first", &author)).await.unwrap();
        store.create(fields("Second", "second", &author)).await.unwrap();
        store.update(first.id, fields("First", "first", &author)).await.unwrap();

        let titles: Vec<String> = store
            .list(&ArticleFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_children_sorted_by_title() {
        let (store, author) = store_with_author().await;
        let parent = store.create(fields("Parent", "parent", &author)).await.unwrap();

        for title in ["Zeta", "Alpha", "Mu"] {
            let mut child = fields(title, &title.to_lowercase(), &author);
            child.parent_id = Some(parent.id);
            store.create(child).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_children_of(parent.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Mu", "Zeta"]);
    }

    #[tokio::test]
    async fn test_count_children() {
        let (store, author) = store_with_author().await;
        let parent = store.create(fields("Parent", "parent", &author)).await.unwrap();
        let lonely = store.create(fields("Lonely", "lonely", &author)).await.unwrap();

        for title in ["One", "Two"] {
            let mut child = fields(title, &title.to_lowercase(), &author);
            child.parent_id = Some(parent.id);
            store.create(child).await.unwrap();
        }

        let counts = store.count_children(&[parent.id, lonely.id]).await.unwrap();
        assert_eq!(counts.get(&parent.id), Some(&2));
        assert!(!counts.contains_key(&lonely.id));

        assert!(store.count_children(&[lonely.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_user_email() {
        let (store, _) = store_with_author().await;

        let err = store
            .create_user(NewUser {
                id: "author-2".to_string(),
                email: "author@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUser(_)));
        assert_eq!(store.user_count().await, 1);
    }
}
