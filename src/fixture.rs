use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

const EMBEDDED_FEED: &str = include_str!("../assets/feed.yaml");

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("read fixture {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse fixture: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("duplicate post id {0:?}")]
    DuplicatePost(String),
    #[error("duplicate author id {0:?}")]
    DuplicateAuthor(String),
    #[error("post {post:?} references unknown author {author:?}")]
    UnknownAuthor { post: String, author: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub username: String,
    pub avatar: String,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub author: Arc<Author>,
    pub content: String,
    pub timestamp: String,
    pub likes: u64,
    pub replies: u64,
    pub images: Vec<String>,
    pub item_count: Option<String>,
    pub tags: Vec<String>,
}

impl Post {
    pub fn permalink(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.id)
    }
}

#[derive(Debug, Deserialize)]
struct RawFeed {
    #[serde(default)]
    authors: Vec<Author>,
    #[serde(default)]
    posts: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    author: String,
    content: String,
    timestamp: String,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    replies: u64,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    item_count: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Immutable post catalog, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    posts: Vec<Post>,
}

impl Feed {
    pub fn embedded() -> Result<Self, FixtureError> {
        Self::from_yaml(EMBEDDED_FEED)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, FixtureError> {
        match path {
            Some(path) => {
                let data = fs::read_to_string(path).map_err(|source| FixtureError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_yaml(&data)
            }
            None => Self::embedded(),
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self, FixtureError> {
        let raw: RawFeed = serde_yaml::from_str(data)?;

        let mut authors: HashMap<String, Arc<Author>> = HashMap::new();
        for author in raw.authors {
            if authors.contains_key(&author.id) {
                return Err(FixtureError::DuplicateAuthor(author.id));
            }
            authors.insert(author.id.clone(), Arc::new(author));
        }

        let mut seen = HashSet::new();
        let mut posts = Vec::with_capacity(raw.posts.len());
        for post in raw.posts {
            if !seen.insert(post.id.clone()) {
                return Err(FixtureError::DuplicatePost(post.id));
            }
            let author = authors
                .get(&post.author)
                .cloned()
                .ok_or_else(|| FixtureError::UnknownAuthor {
                    post: post.id.clone(),
                    author: post.author.clone(),
                })?;
            posts.push(Post {
                id: post.id,
                author,
                content: post.content.trim().to_string(),
                timestamp: post.timestamp,
                likes: post.likes,
                replies: post.replies,
                images: post.images,
                item_count: post.item_count,
                tags: post.tags,
            });
        }

        tracing::debug!(posts = posts.len(), authors = authors.len(), "feed fixture loaded");
        Ok(Self { posts })
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// The first `max` posts, in catalog order.
    pub fn take(&self, max: usize) -> Vec<Post> {
        self.posts.iter().take(max).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Compact count label: 1600 -> "1.6k".
pub fn compact_count(value: u64) -> String {
    match value {
        0..=999 => value.to_string(),
        1_000..=999_999 => trim_decimal(value as f64 / 1_000.0, "k"),
        _ => trim_decimal(value as f64 / 1_000_000.0, "M"),
    }
}

fn trim_decimal(value: f64, suffix: &str) -> String {
    let rendered = format!("{:.1}", value);
    let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{rendered}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn embedded_feed_matches_catalog() {
        let feed = Feed::embedded().unwrap();
        assert_eq!(feed.len(), 5);
        let counts: Vec<usize> = feed.posts().iter().map(|p| p.images.len()).collect();
        assert_eq!(counts, vec![6, 1, 3, 2, 5]);
        assert!(feed.posts()[0].author.verified);
        assert!(!feed.posts()[1].author.verified);
    }

    #[test]
    fn authors_are_shared_not_copied() {
        let yaml = r#"
authors:
  - { id: a, name: A, username: "@a", avatar: x }
posts:
  - { id: "1", author: a, content: one, timestamp: now }
  - { id: "2", author: a, content: two, timestamp: now }
"#;
        let feed = Feed::from_yaml(yaml).unwrap();
        assert!(Arc::ptr_eq(&feed.posts()[0].author, &feed.posts()[1].author));
    }

    #[test]
    fn duplicate_tags_survive_loading() {
        let yaml = r#"
authors:
  - { id: a, name: A, username: "@a", avatar: x }
posts:
  - { id: "1", author: a, content: one, timestamp: now, tags: [x, x, y] }
"#;
        let feed = Feed::from_yaml(yaml).unwrap();
        assert_eq!(feed.posts()[0].tags, vec!["x", "x", "y"]);
    }

    #[test]
    fn rejects_duplicate_post_ids() {
        let yaml = r#"
authors:
  - { id: a, name: A, username: "@a", avatar: x }
posts:
  - { id: "1", author: a, content: one, timestamp: now }
  - { id: "1", author: a, content: two, timestamp: now }
"#;
        let err = Feed::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, FixtureError::DuplicatePost(id) if id == "1"));
    }

    #[test]
    fn rejects_unknown_author() {
        let yaml = r#"
posts:
  - { id: "1", author: ghost, content: one, timestamp: now }
"#;
        let err = Feed::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, FixtureError::UnknownAuthor { .. }));
    }

    #[test]
    fn loads_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "authors: [{{ id: a, name: A, username: '@a', avatar: x }}]\nposts: [{{ id: p, author: a, content: c, timestamp: t }}]"
        )
        .unwrap();
        let feed = Feed::load(Some(file.path())).unwrap();
        assert_eq!(feed.posts()[0].id, "p");
    }

    #[test]
    fn take_respects_cap() {
        let feed = Feed::embedded().unwrap();
        assert_eq!(feed.take(2).len(), 2);
        assert_eq!(feed.take(10).len(), 5);
    }

    #[test]
    fn compact_counts() {
        assert_eq!(compact_count(856), "856");
        assert_eq!(compact_count(1600), "1.6k");
        assert_eq!(compact_count(2000), "2k");
        assert_eq!(compact_count(2_300_000), "2.3M");
    }

    #[test]
    fn permalink_joins_base() {
        let feed = Feed::embedded().unwrap();
        assert_eq!(
            feed.posts()[0].permalink("https://thoth.app/posts/"),
            "https://thoth.app/posts/1"
        );
    }
}
