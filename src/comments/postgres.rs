// src/comments/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::store::{CommentStore, StoreError, thread_path};
use crate::models::comment::{AuthorProfile, Comment, ContentKey, ContentType, NewComment};
use crate::models::profile::CommentPreferences;

const SELECT_COMMENT: &str = r#"
    SELECT
        c.id, c.content, c.content_type, c.content_id, c.user_id,
        c.parent_id, c.depth, c.thread_path, c.created_at,
        p.username, p.full_name, p.avatar_url
    FROM comments c
    LEFT JOIN profiles p ON p.id = c.user_id
"#;

/// Row shape of `SELECT_COMMENT`.
#[derive(Debug, FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    content_type: String,
    content_id: i64,
    user_id: i64,
    parent_id: Option<i64>,
    depth: i32,
    thread_path: String,
    created_at: chrono::DateTime<chrono::Utc>,
    username: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = StoreError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let content_type = row
            .content_type
            .parse::<ContentType>()
            .map_err(StoreError::Backend)?;
        let author = row.username.map(|username| AuthorProfile {
            username,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
        });

        Ok(Comment {
            id: row.id,
            content: row.content,
            content_type,
            content_id: row.content_id,
            user_id: row.user_id,
            parent_id: row.parent_id,
            depth: row.depth,
            thread_path: row.thread_path,
            created_at: row.created_at,
            author,
        })
    }
}

/// Comment store backed by the Postgres schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn list_comments(&self, key: &ContentKey) -> Result<Vec<Comment>, StoreError> {
        let sql = format!(
            "{} WHERE c.content_type = $1 AND c.content_id = $2 ORDER BY c.thread_path ASC",
            SELECT_COMMENT
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(key.content_type.as_str())
            .bind(key.content_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Comment::try_from).collect()
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let sql = format!("{} WHERE c.id = $1", SELECT_COMMENT);
        sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Comment::try_from)
            .transpose()
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let key = ContentKey::new(new.content_type, new.content_id);
        let mut tx = self.pool.begin().await?;

        // 1. Resolve the parent's depth and path
        let parent: Option<(i32, String)> = match new.parent_id {
            Some(pid) => {
                let (parent_type, parent_content_id, depth, path): (String, i64, i32, String) =
                    sqlx::query_as(
                        "SELECT content_type, content_id, depth, thread_path FROM comments WHERE id = $1",
                    )
                    .bind(pid)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("parent comment {}", pid)))?;

                let parent_key = ContentKey::new(
                    parent_type.parse().map_err(StoreError::Backend)?,
                    parent_content_id,
                );
                if parent_key != key {
                    return Err(StoreError::ParentMismatch {
                        parent_id: pid,
                        parent_key,
                        key,
                    });
                }
                Some((depth, path))
            }
            None => None,
        };
        let depth = parent.as_ref().map(|(d, _)| d + 1).unwrap_or(0);

        // 2. Insert, then derive the path from the assigned id
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO comments (content, content_type, content_id, user_id, parent_id, depth, thread_path)
            VALUES ($1, $2, $3, $4, $5, $6, '')
            RETURNING id
            "#,
        )
        .bind(&new.content)
        .bind(new.content_type.as_str())
        .bind(new.content_id)
        .bind(new.user_id)
        .bind(new.parent_id)
        .bind(depth)
        .fetch_one(&mut *tx)
        .await?;

        let path = thread_path(parent.as_ref().map(|(_, p)| p.as_str()), id);
        sqlx::query("UPDATE comments SET thread_path = $1 WHERE id = $2")
            .bind(&path)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("{} WHERE c.id = $1", SELECT_COMMENT);
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Comment::try_from(row)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn owner_preferences(&self, key: &ContentKey) -> Result<CommentPreferences, StoreError> {
        let owner_sql = match key.content_type {
            ContentType::Song => {
                "SELECT m.profile_id FROM songs s JOIN musicians m ON m.id = s.musician_id WHERE s.id = $1"
            }
            ContentType::Video => {
                "SELECT m.profile_id FROM videos v JOIN musicians m ON m.id = v.musician_id WHERE v.id = $1"
            }
            ContentType::ForumTopic => "SELECT t.user_id FROM forum_topics t WHERE t.id = $1",
        };

        let owner: Option<(i64,)> = sqlx::query_as(owner_sql)
            .bind(key.content_id)
            .fetch_optional(&self.pool)
            .await?;

        match owner {
            Some((profile_id,)) => match self.profile_preferences(profile_id).await {
                Err(StoreError::NotFound(_)) => Ok(CommentPreferences::default()),
                other => other,
            },
            None => Ok(CommentPreferences::default()),
        }
    }

    async fn profile_preferences(&self, profile_id: i64) -> Result<CommentPreferences, StoreError> {
        let row: Option<(Option<bool>,)> = sqlx::query_as(
            "SELECT (comment_preferences->>'disable_comments')::BOOLEAN FROM profiles WHERE id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        let (disable_comments,) =
            row.ok_or_else(|| StoreError::NotFound(format!("profile {}", profile_id)))?;
        Ok(CommentPreferences {
            disable_comments: disable_comments.unwrap_or(false),
        })
    }

    async fn update_profile_preferences(
        &self,
        profile_id: i64,
        preferences: CommentPreferences,
    ) -> Result<CommentPreferences, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET comment_preferences = jsonb_set(
                COALESCE(comment_preferences, '{}'::JSONB),
                '{disable_comments}',
                to_jsonb($1::BOOLEAN)
            )
            WHERE id = $2
            "#,
        )
        .bind(preferences.disable_comments)
        .bind(profile_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile {}", profile_id)));
        }
        Ok(preferences)
    }
}
