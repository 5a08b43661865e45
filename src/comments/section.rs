// src/comments/section.rs

//! Fetch and mutation orchestration for one comment section.

use std::sync::Arc;

use serde::Serialize;

use super::cache::{CommentCache, InvalidationSubscription, Lookup};
use super::render::{RenderOptions, RenderedComment, ThreadView};
use super::store::CommentStore;
use super::tree::CommentForest;
use crate::error::AppError;
use crate::models::comment::{Comment, CommentTreeNode, ContentKey, NewComment};
use crate::models::profile::{CommentPreferences, Viewer};

/// What a section shows for one content key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionView {
    /// The content owner turned comments off; nothing was fetched.
    Disabled,
    Open {
        total: usize,
        rows: Vec<RenderedComment>,
    },
}

/// Tree form of a section, for clients that render recursively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionTree {
    Disabled,
    Open {
        total: usize,
        comments: Vec<CommentTreeNode>,
    },
}

#[derive(Clone)]
pub struct CommentSection {
    store: Arc<dyn CommentStore>,
    cache: Arc<CommentCache>,
    options: RenderOptions,
}

impl CommentSection {
    pub fn new(store: Arc<dyn CommentStore>, cache: Arc<CommentCache>, options: RenderOptions) -> Self {
        Self {
            store,
            cache,
            options,
        }
    }

    /// Flat, path-ordered list for `key`, served from the cache when
    /// it holds one.
    pub async fn comments(&self, key: &ContentKey) -> Result<Arc<Vec<Comment>>, AppError> {
        match self.cache.lookup(key).await {
            Lookup::Hit(list) => Ok(list),
            Lookup::Miss(ticket) => {
                let list = self.store.list_comments(key).await.map_err(|e| {
                    tracing::error!(key = %key, "Failed to fetch comments: {:?}", e);
                    AppError::from(e)
                })?;
                Ok(self.cache.fill(ticket, list).await)
            }
        }
    }

    async fn comments_enabled(&self, key: &ContentKey) -> Result<bool, AppError> {
        let preferences = self.store.owner_preferences(key).await?;
        Ok(!preferences.disable_comments)
    }

    async fn forest(&self, key: &ContentKey) -> Result<CommentForest, AppError> {
        let list = self.comments(key).await?;
        Ok(CommentForest::build(list.as_ref().clone()))
    }

    pub async fn load(&self, key: &ContentKey, viewer: Viewer) -> Result<SectionView, AppError> {
        if !self.comments_enabled(key).await? {
            return Ok(SectionView::Disabled);
        }

        let view = ThreadView::new(self.forest(key).await?, viewer, self.options);
        let rows = view.rows();
        Ok(SectionView::Open {
            total: rows.len(),
            rows,
        })
    }

    pub async fn tree(&self, key: &ContentKey) -> Result<SectionTree, AppError> {
        if !self.comments_enabled(key).await? {
            return Ok(SectionTree::Disabled);
        }

        let forest = self.forest(key).await?;
        let total = forest.len();
        Ok(SectionTree::Open {
            total,
            comments: forest.into_nested(),
        })
    }

    /// Interactive view of the thread for `viewer`. Returns `None` when
    /// comments are disabled.
    pub async fn thread_view(&self, key: &ContentKey, viewer: Viewer) -> Result<Option<ThreadView>, AppError> {
        if !self.comments_enabled(key).await? {
            return Ok(None);
        }
        Ok(Some(ThreadView::new(self.forest(key).await?, viewer, self.options)))
    }

    /// Rebuilds `view` from the current list, keeping its open composers.
    pub async fn refresh(&self, key: &ContentKey, view: &mut ThreadView) -> Result<(), AppError> {
        view.replace_forest(self.forest(key).await?);
        Ok(())
    }

    /// Creates a root comment or a reply and invalidates the thread. The
    /// trimmed body is stored exactly as typed; rows escape it on render.
    pub async fn create(
        &self,
        viewer: Viewer,
        key: ContentKey,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Comment, AppError> {
        let user_id = viewer
            .user_id
            .ok_or_else(|| AppError::AuthError("Sign in to comment".to_string()))?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
        }

        if !self.comments_enabled(&key).await? {
            return Err(AppError::Forbidden(
                "Comments are disabled for this content".to_string(),
            ));
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                content,
                content_type: key.content_type,
                content_id: key.content_id,
                user_id,
                parent_id,
            })
            .await
            .map_err(|e| {
                tracing::error!(key = %key, "Failed to create comment: {:?}", e);
                AppError::from(e)
            })?;

        self.cache.invalidate(&key).await;
        tracing::info!(
            key = %key,
            comment_id = comment.id,
            parent_id = ?comment.parent_id,
            "Comment created"
        );
        Ok(comment)
    }

    /// Deletes one comment of `key` authored by `viewer`. Replies stay and
    /// show up as roots on the next fetch.
    pub async fn delete(&self, viewer: Viewer, key: &ContentKey, id: i64) -> Result<(), AppError> {
        let user_id = viewer
            .user_id
            .ok_or_else(|| AppError::AuthError("Sign in to delete comments".to_string()))?;

        let comment = self
            .store
            .find_comment(id)
            .await?
            .filter(|c| c.key() == *key)
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;

        if comment.user_id != user_id {
            return Err(AppError::Forbidden(
                "You are not authorized to delete this comment".to_string(),
            ));
        }

        let removed = self.store.delete_comment(id).await.map_err(|e| {
            tracing::error!(comment_id = id, "Failed to delete comment: {:?}", e);
            AppError::from(e)
        })?;
        if !removed {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        self.cache.invalidate(key).await;
        tracing::info!(key = %key, comment_id = id, "Comment deleted");
        Ok(())
    }

    pub fn subscribe(&self, key: ContentKey) -> InvalidationSubscription {
        self.cache.subscribe(key)
    }

    pub async fn preferences(&self, profile_id: i64) -> Result<CommentPreferences, AppError> {
        Ok(self.store.profile_preferences(profile_id).await?)
    }

    /// Only the profile's owner may change its comment preferences.
    pub async fn update_preferences(
        &self,
        viewer: Viewer,
        profile_id: i64,
        preferences: CommentPreferences,
    ) -> Result<CommentPreferences, AppError> {
        if !viewer.is_authenticated() {
            return Err(AppError::AuthError("Sign in to change preferences".to_string()));
        }
        if !viewer.owns(profile_id) {
            return Err(AppError::Forbidden(
                "You can only change your own preferences".to_string(),
            ));
        }

        let updated = self
            .store
            .update_profile_preferences(profile_id, preferences)
            .await?;
        tracing::info!(
            profile_id,
            disable_comments = updated.disable_comments,
            "Comment preferences updated"
        );
        Ok(updated)
    }
}
