// src/state.rs

use std::sync::Arc;

use crate::comments::cache::CommentCache;
use crate::comments::section::CommentSection;
use crate::comments::store::CommentStore;
use crate::config::Config;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub comments: CommentSection,
    pub config: Config,
}

impl AppState {
    /// Wires a store into a fresh cache and section.
    pub fn new(store: Arc<dyn CommentStore>, config: Config) -> Self {
        let cache = Arc::new(
            CommentCache::new(config.event_capacity).with_max_entries(config.cache_entries),
        );
        let comments = CommentSection::new(store, cache, config.render_options());
        Self { comments, config }
    }
}

impl FromRef<AppState> for CommentSection {
    fn from_ref(state: &AppState) -> Self {
        state.comments.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
