// src/comments/memory.rs

//! In-process comment store, used when no database is configured and by
//! the test-suite.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CommentStore, StoreError, thread_path};
use crate::models::comment::{AuthorProfile, Comment, ContentKey, NewComment};
use crate::models::profile::CommentPreferences;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    comments: BTreeMap<i64, Comment>,
    profiles: HashMap<i64, AuthorProfile>,
    preferences: HashMap<i64, CommentPreferences>,
    owners: HashMap<ContentKey, i64>,
}

#[derive(Debug, Default)]
pub struct MemoryCommentStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_profile(&self, profile_id: i64, username: &str) {
        let mut inner = self.inner.write().await;
        inner.profiles.insert(
            profile_id,
            AuthorProfile {
                username: username.to_string(),
                full_name: None,
                avatar_url: None,
            },
        );
    }

    /// Records `profile_id` as the owner of the content behind `key`.
    pub async fn set_owner(&self, key: ContentKey, profile_id: i64) {
        self.inner.write().await.owners.insert(key, profile_id);
    }

    /// While set, every operation fails with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn list_comments(&self, key: &ContentKey) -> Result<Vec<Comment>, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut list: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| c.key() == *key)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.thread_path.cmp(&b.thread_path));
        Ok(list)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        self.check_available()?;
        Ok(self.inner.read().await.comments.get(&id).cloned())
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        let key = ContentKey::new(new.content_type, new.content_id);

        let parent = match new.parent_id {
            Some(pid) => {
                let parent = inner
                    .comments
                    .get(&pid)
                    .ok_or_else(|| StoreError::NotFound(format!("parent comment {}", pid)))?;
                if parent.key() != key {
                    return Err(StoreError::ParentMismatch {
                        parent_id: pid,
                        parent_key: parent.key(),
                        key,
                    });
                }
                Some((parent.depth, parent.thread_path.clone()))
            }
            None => None,
        };

        inner.next_id += 1;
        let id = inner.next_id;
        let (depth, path) = match parent {
            Some((parent_depth, parent_path)) => (parent_depth + 1, thread_path(Some(&parent_path), id)),
            None => (0, thread_path(None, id)),
        };

        let comment = Comment {
            id,
            content: new.content,
            content_type: new.content_type,
            content_id: new.content_id,
            user_id: new.user_id,
            parent_id: new.parent_id,
            depth,
            thread_path: path,
            created_at: chrono::Utc::now(),
            author: inner.profiles.get(&new.user_id).cloned(),
        };
        inner.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.inner.write().await.comments.remove(&id).is_some())
    }

    async fn owner_preferences(&self, key: &ContentKey) -> Result<CommentPreferences, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner
            .owners
            .get(key)
            .and_then(|owner| inner.preferences.get(owner))
            .copied()
            .unwrap_or_default())
    }

    async fn profile_preferences(&self, profile_id: i64) -> Result<CommentPreferences, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        if !inner.profiles.contains_key(&profile_id) {
            return Err(StoreError::NotFound(format!("profile {}", profile_id)));
        }
        Ok(inner.preferences.get(&profile_id).copied().unwrap_or_default())
    }

    async fn update_profile_preferences(
        &self,
        profile_id: i64,
        preferences: CommentPreferences,
    ) -> Result<CommentPreferences, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        if !inner.profiles.contains_key(&profile_id) {
            return Err(StoreError::NotFound(format!("profile {}", profile_id)));
        }
        inner.preferences.insert(profile_id, preferences);
        Ok(preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::comment::ContentType;

    fn new_comment(content_id: i64, parent_id: Option<i64>) -> NewComment {
        NewComment {
            content: "hello".to_string(),
            content_type: ContentType::Video,
            content_id,
            user_id: 1,
            parent_id,
        }
    }

    #[tokio::test]
    async fn list_is_thread_path_ordered() {
        let store = MemoryCommentStore::new();
        store.add_profile(1, "ada").await;
        let a = store.insert_comment(new_comment(5, None)).await.unwrap();
        let b = store.insert_comment(new_comment(5, None)).await.unwrap();
        let a1 = store.insert_comment(new_comment(5, Some(a.id))).await.unwrap();
        let a1x = store.insert_comment(new_comment(5, Some(a1.id))).await.unwrap();
        store.insert_comment(new_comment(6, None)).await.unwrap();

        assert_eq!(a1x.depth, 2);
        assert_eq!(a1.author.as_ref().map(|p| p.username.as_str()), Some("ada"));

        let ids: Vec<i64> = store
            .list_comments(&ContentKey::new(ContentType::Video, 5))
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![a.id, a1.id, a1x.id, b.id]);
    }

    #[tokio::test]
    async fn reply_must_share_content() {
        let store = MemoryCommentStore::new();
        let root = store.insert_comment(new_comment(5, None)).await.unwrap();

        let err = store.insert_comment(new_comment(6, Some(root.id))).await.unwrap_err();
        assert!(matches!(err, StoreError::ParentMismatch { .. }));

        let err = store.insert_comment(new_comment(5, Some(999))).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_leaves_replies() {
        let store = MemoryCommentStore::new();
        let root = store.insert_comment(new_comment(5, None)).await.unwrap();
        let reply = store.insert_comment(new_comment(5, Some(root.id))).await.unwrap();

        assert!(store.delete_comment(root.id).await.unwrap());
        assert!(!store.delete_comment(root.id).await.unwrap());
        assert_eq!(
            store.find_comment(reply.id).await.unwrap().map(|c| c.parent_id),
            Some(Some(root.id))
        );
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryCommentStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.insert_comment(new_comment(5, None)).await,
            Err(StoreError::Backend(_))
        ));
        store.set_unavailable(false);
        assert!(store.insert_comment(new_comment(5, None)).await.is_ok());
    }

    #[tokio::test]
    async fn owner_preferences_default_to_enabled() {
        let store = MemoryCommentStore::new();
        let key = ContentKey::new(ContentType::Song, 1);
        assert!(!store.owner_preferences(&key).await.unwrap().disable_comments);

        store.add_profile(7, "owner").await;
        store.set_owner(key, 7).await;
        store
            .update_profile_preferences(7, CommentPreferences { disable_comments: true })
            .await
            .unwrap();
        assert!(store.owner_preferences(&key).await.unwrap().disable_comments);
    }
}
