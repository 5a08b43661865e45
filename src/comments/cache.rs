// src/comments/cache.rs

//! Content-addressed cache of flat comment lists with pub/sub invalidation.
//!
//! Mutations never patch a cached list. They drop the entry and publish the
//! key; every subscriber of that key refetches and rebuilds its tree.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::stream::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::models::comment::{Comment, ContentKey};

/// Lists kept before the oldest fill is evicted.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("comment cache invalidation channel closed")]
pub struct SubscriptionClosed;

#[derive(Debug)]
struct Entry {
    comments: Arc<Vec<Comment>>,
    filled_at: u64,
}

/// Proof that a fetch started while the cache was at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket {
    key: ContentKey,
    generation: u64,
}

#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(Arc<Vec<Comment>>),
    Miss(FillTicket),
}

pub struct CommentCache {
    entries: RwLock<HashMap<ContentKey, Entry>>,
    /// Bumped by every invalidation, whatever the key.
    generation: AtomicU64,
    /// Fill order, for evicting the oldest list.
    fills: AtomicU64,
    max_entries: usize,
    events: broadcast::Sender<ContentKey>,
}

impl std::fmt::Debug for CommentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentCache")
            .field("generation", &self.generation.load(Ordering::Acquire))
            .field("max_entries", &self.max_entries)
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl CommentCache {
    /// `capacity` is how many invalidations a slow subscriber may fall
    /// behind before it starts seeing lag.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            fills: AtomicU64::new(0),
            max_entries: DEFAULT_MAX_ENTRIES,
            events,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub async fn lookup(&self, key: &ContentKey) -> Lookup {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) => Lookup::Hit(Arc::clone(&entry.comments)),
            None => Lookup::Miss(FillTicket {
                key: *key,
                generation: self.generation.load(Ordering::Acquire),
            }),
        }
    }

    /// Stores a fetched list unless any invalidation happened after the
    /// ticket was issued. The fetched list is returned either way.
    pub async fn fill(&self, ticket: FillTicket, comments: Vec<Comment>) -> Arc<Vec<Comment>> {
        let list = Arc::new(comments);
        let mut entries = self.entries.write().await;
        // Invalidations bump the generation under the write lock.
        if self.generation.load(Ordering::Acquire) != ticket.generation {
            debug!(key = %ticket.key, "discarding comment list fetched before invalidation");
            return list;
        }

        if !entries.contains_key(&ticket.key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.filled_at)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!(key = %oldest, "evicted comment list");
            }
        }
        entries.insert(
            ticket.key,
            Entry {
                comments: Arc::clone(&list),
                filled_at: self.fills.fetch_add(1, Ordering::Relaxed),
            },
        );
        list
    }

    /// Drops the cached list for `key` and tells every subscriber.
    pub async fn invalidate(&self, key: &ContentKey) {
        {
            let mut entries = self.entries.write().await;
            entries.remove(key);
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        // No receivers is fine: nobody is watching this thread right now.
        let delivered = self.events.send(*key).unwrap_or(0);
        debug!(key = %key, delivered, "comment cache invalidated");
    }

    /// Number of cached lists.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn subscribe(&self, key: ContentKey) -> InvalidationSubscription {
        InvalidationSubscription {
            key,
            rx: self.events.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

/// Invalidation feed for one content key.
#[derive(Debug)]
pub struct InvalidationSubscription {
    key: ContentKey,
    rx: broadcast::Receiver<ContentKey>,
}

impl InvalidationSubscription {
    pub fn key(&self) -> ContentKey {
        self.key
    }

    /// Waits for the next invalidation of this key. Falling behind counts
    /// as a change, since missed events may have included this key.
    pub async fn changed(&mut self) -> Result<(), SubscriptionClosed> {
        loop {
            match self.rx.recv().await {
                Ok(key) if key == self.key => return Ok(()),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(key = %self.key, skipped, "invalidation subscriber lagged");
                    return Ok(());
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionClosed),
            }
        }
    }

    /// Same feed as a stream, one item per invalidation of this key.
    pub fn into_stream(self) -> impl Stream<Item = ContentKey> {
        let key = self.key;
        BroadcastStream::new(self.rx).filter_map(move |result| async move {
            match result {
                Ok(k) if k == key => Some(k),
                Ok(_) => None,
                Err(e) => {
                    warn!(key = %key, "invalidation stream lagged: {:?}", e);
                    Some(key)
                }
            }
        })
    }
}
