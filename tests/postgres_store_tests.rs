// tests/postgres_store_tests.rs
//
// Runs against a real database. Set DATABASE_URL to enable; without it
// every test returns early.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use onus::comments::postgres::PgCommentStore;
use onus::comments::store::{CommentStore, StoreError, thread_path};
use onus::models::comment::{ContentKey, ContentType, NewComment};
use onus::models::profile::CommentPreferences;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

async fn connect() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

static SEEDED: AtomicU64 = AtomicU64::new(0);

/// Inserts a profile with a username no other run has used.
async fn seed_profile(pool: &PgPool, name: &str) -> i64 {
    let seq = SEEDED.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let (id,): (i64,) = sqlx::query_as("INSERT INTO profiles (username) VALUES ($1) RETURNING id")
        .bind(format!("{}-{}-{}", name, nanos, seq))
        .fetch_one(pool)
        .await
        .expect("Failed to insert profile");
    id
}

async fn seed_song(pool: &PgPool, owner: i64) -> i64 {
    let (musician_id,): (i64,) =
        sqlx::query_as("INSERT INTO musicians (profile_id) VALUES ($1) RETURNING id")
            .bind(owner)
            .fetch_one(pool)
            .await
            .expect("Failed to insert musician");
    let (song_id,): (i64,) =
        sqlx::query_as("INSERT INTO songs (musician_id, title) VALUES ($1, 'demo') RETURNING id")
            .bind(musician_id)
            .fetch_one(pool)
            .await
            .expect("Failed to insert song");
    song_id
}

async fn seed_topic(pool: &PgPool, author: i64) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO forum_topics (user_id, title) VALUES ($1, 'gear') RETURNING id")
            .bind(author)
            .fetch_one(pool)
            .await
            .expect("Failed to insert topic");
    id
}

fn new_comment(key: ContentKey, user_id: i64, content: &str, parent_id: Option<i64>) -> NewComment {
    NewComment {
        content: content.to_string(),
        content_type: key.content_type,
        content_id: key.content_id,
        user_id,
        parent_id,
    }
}

#[tokio::test]
async fn insert_assigns_depth_and_path_and_lists_in_pre_order() {
    let Some(pool) = connect().await else { return };
    let store = PgCommentStore::new(pool.clone());
    let ada = seed_profile(&pool, "ada").await;
    let key = ContentKey::new(ContentType::Song, seed_song(&pool, ada).await);

    let a = store.insert_comment(new_comment(key, ada, "a", None)).await.unwrap();
    let b = store.insert_comment(new_comment(key, ada, "b", None)).await.unwrap();
    let a1 = store
        .insert_comment(new_comment(key, ada, "a1", Some(a.id)))
        .await
        .unwrap();
    let a1x = store
        .insert_comment(new_comment(key, ada, "R&B <3", Some(a1.id)))
        .await
        .unwrap();

    assert_eq!((a.depth, b.depth, a1.depth, a1x.depth), (0, 0, 1, 2));
    assert_eq!(a.thread_path, thread_path(None, a.id));
    assert_eq!(a1.thread_path, thread_path(Some(&a.thread_path), a1.id));
    assert_eq!(a1x.thread_path, thread_path(Some(&a1.thread_path), a1x.id));
    assert_eq!(a1x.content, "R&B <3");
    assert!(a.author.as_ref().is_some_and(|p| p.username.starts_with("ada-")));

    let listed: Vec<i64> = store
        .list_comments(&key)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(listed, vec![a.id, a1.id, a1x.id, b.id]);
}

#[tokio::test]
async fn reply_parent_must_exist_on_the_same_content() {
    let Some(pool) = connect().await else { return };
    let store = PgCommentStore::new(pool.clone());
    let ada = seed_profile(&pool, "ada").await;
    let here = ContentKey::new(ContentType::Song, seed_song(&pool, ada).await);
    let there = ContentKey::new(ContentType::Song, seed_song(&pool, ada).await);

    let root = store.insert_comment(new_comment(here, ada, "root", None)).await.unwrap();

    let elsewhere = store
        .insert_comment(new_comment(there, ada, "x", Some(root.id)))
        .await;
    assert!(matches!(elsewhere, Err(StoreError::ParentMismatch { .. })));

    let missing = store
        .insert_comment(new_comment(here, ada, "x", Some(i64::MAX)))
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));

    assert_eq!(store.list_comments(&there).await.unwrap().len(), 0);
}

#[tokio::test]
async fn delete_keeps_replies() {
    let Some(pool) = connect().await else { return };
    let store = PgCommentStore::new(pool.clone());
    let ada = seed_profile(&pool, "ada").await;
    let key = ContentKey::new(ContentType::Song, seed_song(&pool, ada).await);

    let root = store.insert_comment(new_comment(key, ada, "root", None)).await.unwrap();
    let reply = store
        .insert_comment(new_comment(key, ada, "reply", Some(root.id)))
        .await
        .unwrap();

    assert!(store.delete_comment(root.id).await.unwrap());
    assert!(!store.delete_comment(root.id).await.unwrap());
    assert_eq!(
        store.find_comment(reply.id).await.unwrap().map(|c| c.parent_id),
        Some(Some(root.id))
    );
}

#[tokio::test]
async fn owner_preferences_follow_the_content_owner() {
    let Some(pool) = connect().await else { return };
    let store = PgCommentStore::new(pool.clone());
    let owner = seed_profile(&pool, "owner").await;
    let song = ContentKey::new(ContentType::Song, seed_song(&pool, owner).await);
    let topic = ContentKey::new(ContentType::ForumTopic, seed_topic(&pool, owner).await);

    assert!(!store.owner_preferences(&song).await.unwrap().disable_comments);

    store
        .update_profile_preferences(owner, CommentPreferences { disable_comments: true })
        .await
        .unwrap();
    assert!(store.profile_preferences(owner).await.unwrap().disable_comments);
    assert!(store.owner_preferences(&song).await.unwrap().disable_comments);
    assert!(store.owner_preferences(&topic).await.unwrap().disable_comments);

    let no_such_video = ContentKey::new(ContentType::Video, i64::MAX);
    assert!(!store.owner_preferences(&no_such_video).await.unwrap().disable_comments);

    let unknown = store
        .update_profile_preferences(i64::MAX, CommentPreferences::default())
        .await;
    assert!(matches!(unknown, Err(StoreError::NotFound(_))));
}
