/// Category tree construction for the editor sidebar
///
/// Groups a flat article list into categories, each holding its root articles
/// with their direct children. Nesting is one level deep.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::article::Article;

/// A root article and its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleNode {
    pub article: Article,

    /// Direct children, ordered by title
    pub children: Vec<Article>,
}

/// All root articles of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTree {
    pub category: String,

    /// Root articles, ordered by title
    pub articles: Vec<ArticleNode>,
}

/// Builds the category tree for `articles`
///
/// - Categories appear in first-seen order.
/// - Only root articles become nodes; roots are ordered by title, ties keep
///   input order.
/// - Children are collected from the same list regardless of their own
///   category. A child whose parent is not in the list is dropped.
pub fn build_tree(articles: &[Article]) -> Vec<CategoryTree> {
    let mut children_by_parent: HashMap<Uuid, Vec<Article>> = HashMap::new();
    for article in articles {
        if let Some(parent_id) = article.parent_id {
            children_by_parent
                .entry(parent_id)
                .or_default()
                .push(article.clone());
        }
    }

    let mut categories: Vec<CategoryTree> = Vec::new();
    let mut category_index: HashMap<&str, usize> = HashMap::new();

    for article in articles {
        let index = *category_index
            .entry(article.category.as_str())
            .or_insert_with(|| {
                categories.push(CategoryTree {
                    category: article.category.clone(),
                    articles: Vec::new(),
                });
                categories.len() - 1
            });

        if !article.is_root() {
            continue;
        }

        let mut children = children_by_parent.remove(&article.id).unwrap_or_default();
        children.sort_by(|a, b| a.title.cmp(&b.title));

        categories[index].articles.push(ArticleNode {
            article: article.clone(),
            children,
        });
    }

    for tree in &mut categories {
        tree.articles.sort_by(|a, b| a.article.title.cmp(&b.article.title));
    }

    categories
}
