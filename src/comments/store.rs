// src/comments/store.rs

//! Persistence port for comments and comment preferences.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::comment::{Comment, ContentKey, NewComment};
use crate::models::profile::CommentPreferences;

/// Width of one zero-padded id segment in a thread path.
pub const PATH_SEGMENT_WIDTH: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    /// A reply pointed at a comment on different content.
    #[error("parent comment {parent_id} belongs to {parent_key}, not {key}")]
    ParentMismatch {
        parent_id: i64,
        parent_key: ContentKey,
        key: ContentKey,
    },
    #[error("comment store failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Storage behind the comment section.
///
/// `list_comments` must return comments ordered by `thread_path`
/// ascending. `insert_comment` assigns id, `created_at`, `depth` and
/// `thread_path`, and rejects parents from other content.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn list_comments(&self, key: &ContentKey) -> Result<Vec<Comment>, StoreError>;

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError>;

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError>;

    /// Deletes one comment. Replies are left in place. Returns whether a
    /// row was removed.
    async fn delete_comment(&self, id: i64) -> Result<bool, StoreError>;

    /// Preferences of whoever owns the content. Unknown content or owners
    /// yield the defaults.
    async fn owner_preferences(&self, key: &ContentKey) -> Result<CommentPreferences, StoreError>;

    async fn profile_preferences(&self, profile_id: i64) -> Result<CommentPreferences, StoreError>;

    async fn update_profile_preferences(
        &self,
        profile_id: i64,
        preferences: CommentPreferences,
    ) -> Result<CommentPreferences, StoreError>;
}

/// Path segment for a comment id.
pub fn path_segment(id: i64) -> String {
    format!("{:0width$}", id, width = PATH_SEGMENT_WIDTH)
}

/// Thread path of comment `id` under `parent_path` (none for roots).
/// Sorting paths as strings gives pre-order with siblings by id.
pub fn thread_path(parent_path: Option<&str>, id: i64) -> String {
    match parent_path {
        Some(parent) if !parent.is_empty() => format!("{}/{}", parent, path_segment(id)),
        _ => path_segment(id),
    }
}
