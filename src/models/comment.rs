// src/models/comment.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Kind of entity a comment thread hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Song,
    Video,
    ForumTopic,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Song => "song",
            ContentType::Video => "video",
            ContentType::ForumTopic => "forum_topic",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "song" => Ok(ContentType::Song),
            "video" => Ok(ContentType::Video),
            "forum_topic" => Ok(ContentType::ForumTopic),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

/// Composite reference to the commented-on entity.
/// Every comment thread, cache entry and invalidation event is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    pub content_type: ContentType,
    pub content_id: i64,
}

impl ContentKey {
    pub fn new(content_type: ContentType, content_id: i64) -> Self {
        Self {
            content_type,
            content_id,
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.content_id)
    }
}

/// Public profile fields joined onto each comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A stored comment, as returned by the thread fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub content_type: ContentType,
    pub content_id: i64,
    pub user_id: i64,
    /// `None` for top-level comments.
    pub parent_id: Option<i64>,
    /// Depth recorded at creation time. Rendering uses the depth derived
    /// from the built tree instead.
    pub depth: i32,
    pub thread_path: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub author: Option<AuthorProfile>,
}

impl Comment {
    pub fn key(&self) -> ContentKey {
        ContentKey::new(self.content_type, self.content_id)
    }
}

/// Insert payload handed to the store. The store assigns id, timestamps,
/// depth and thread path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub content: String,
    pub content_type: ContentType,
    pub content_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Comment must be between 1 and 10000 characters"
    ))]
    pub content: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_id: Option<i64>,
}

/// A comment with its derived depth and nested replies.
/// Rebuilt from the flat list on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentTreeNode {
    #[serde(flatten)]
    pub comment: Comment,
    /// Distance from the root of this tree (0 for roots).
    #[serde(rename = "tree_depth")]
    pub depth: usize,
    pub replies: Vec<CommentTreeNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_round_trips_through_its_name() {
        for ct in [ContentType::Song, ContentType::Video, ContentType::ForumTopic] {
            assert_eq!(ct.as_str().parse::<ContentType>(), Ok(ct));
        }
        assert!("podcast".parse::<ContentType>().is_err());
    }

    #[test]
    fn content_key_display() {
        let key = ContentKey::new(ContentType::ForumTopic, 7);
        assert_eq!(key.to_string(), "forum_topic:7");
    }

    #[test]
    fn create_request_rejects_empty_body() {
        let req = CreateCommentRequest {
            content: String::new(),
            parent_id: None,
        };
        assert!(req.validate().is_err());
    }
}
