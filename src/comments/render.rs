// src/comments/render.rs

//! Render rows and per-comment reply state for a comment thread.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use super::form::CommentForm;
use super::tree::CommentForest;
use crate::models::comment::Comment;
use crate::models::profile::Viewer;
use crate::utils::html::escape_html;

/// Replies are not offered at or beyond this depth.
pub const MAX_REPLY_DEPTH: usize = 5;
pub const INDENT_WIDTH: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub max_depth: usize,
    pub indent_width: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_REPLY_DEPTH,
            indent_width: INDENT_WIDTH,
        }
    }
}

/// Line drawn from a reply back to its parent: a vertical line at `line_x`
/// and a horizontal tick of `tick_width` into the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Connector {
    pub line_x: u32,
    pub tick_width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyState {
    Viewing,
    Replying,
    Submitting,
}

/// One comment, laid out for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedComment {
    #[serde(flatten)]
    pub comment: Comment,
    /// `comment.content` escaped for insertion into HTML.
    pub content_html: String,
    #[serde(rename = "tree_depth")]
    pub depth: usize,
    pub indent: u32,
    pub connector: Option<Connector>,
    pub reply_count: usize,
    pub can_reply: bool,
    pub can_delete: bool,
    pub reply_state: ReplyState,
}

/// Create request emitted when a reply composer is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub parent_id: i64,
    pub depth: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadError {
    #[error("comment {0} is not in this thread")]
    UnknownComment(i64),
    #[error("sign in to reply or delete")]
    Unauthenticated,
    #[error("replies are limited to depth {max}")]
    DepthLimit { max: usize },
    #[error("comment {0} has no open reply composer")]
    NotReplying(i64),
    #[error("a reply to comment {0} is already being sent")]
    Busy(i64),
    #[error("only the author can delete comment {0}")]
    NotAuthor(i64),
}

#[derive(Debug, Clone)]
struct Composing {
    form: CommentForm,
    pending: bool,
}

/// A thread as one viewer sees it, with their open reply composers.
///
/// Reply state is local to this view. A refetch replaces the forest
/// wholesale through [`ThreadView::replace_forest`].
#[derive(Debug, Clone)]
pub struct ThreadView {
    forest: CommentForest,
    viewer: Viewer,
    options: RenderOptions,
    composing: HashMap<i64, Composing>,
}

impl ThreadView {
    pub fn new(forest: CommentForest, viewer: Viewer, options: RenderOptions) -> Self {
        Self {
            forest,
            viewer,
            options,
            composing: HashMap::new(),
        }
    }

    pub fn forest(&self) -> &CommentForest {
        &self.forest
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    fn depth(&self, id: i64) -> Result<usize, ThreadError> {
        self.forest
            .depth_of(id)
            .ok_or(ThreadError::UnknownComment(id))
    }

    fn reply_allowed(&self, depth: usize) -> bool {
        self.viewer.is_authenticated() && depth < self.options.max_depth
    }

    pub fn can_reply(&self, id: i64) -> bool {
        self.depth(id).map(|d| self.reply_allowed(d)).unwrap_or(false)
    }

    pub fn can_delete(&self, id: i64) -> bool {
        self.forest
            .get(id)
            .map(|c| self.viewer.owns(c.user_id))
            .unwrap_or(false)
    }

    pub fn state(&self, id: i64) -> ReplyState {
        match self.composing.get(&id) {
            None => ReplyState::Viewing,
            Some(c) if c.pending => ReplyState::Submitting,
            Some(_) => ReplyState::Replying,
        }
    }

    /// Lays the thread out in pre-order.
    pub fn rows(&self) -> Vec<RenderedComment> {
        let indent_width = self.options.indent_width;
        self.forest
            .walk()
            .map(|visit| {
                let depth = visit.depth;
                let indent = indent_width.saturating_mul(depth as u32);
                let connector = (depth > 0).then(|| Connector {
                    line_x: indent - indent_width + indent_width / 2,
                    tick_width: indent_width / 2,
                });
                RenderedComment {
                    comment: visit.comment.clone(),
                    content_html: escape_html(&visit.comment.content),
                    depth,
                    indent,
                    connector,
                    reply_count: visit.reply_count,
                    can_reply: self.reply_allowed(depth),
                    can_delete: self.viewer.owns(visit.comment.user_id),
                    reply_state: self.state(visit.comment.id),
                }
            })
            .collect()
    }

    /// Viewing -> Replying.
    pub fn open_reply(&mut self, id: i64) -> Result<&mut CommentForm, ThreadError> {
        let depth = self.depth(id)?;
        if !self.viewer.is_authenticated() {
            return Err(ThreadError::Unauthenticated);
        }
        if depth >= self.options.max_depth {
            return Err(ThreadError::DepthLimit {
                max: self.options.max_depth,
            });
        }

        let composing = self.composing.entry(id).or_insert_with(|| Composing {
            form: CommentForm::new()
                .with_placeholder("Write a reply...")
                .with_auto_focus(true),
            pending: false,
        });
        Ok(&mut composing.form)
    }

    /// The open reply composer for `id`, if any.
    pub fn composer(&mut self, id: i64) -> Option<&mut CommentForm> {
        self.composing.get_mut(&id).map(|c| &mut c.form)
    }

    /// Replying -> Viewing, discarding the draft.
    pub fn cancel_reply(&mut self, id: i64) {
        self.composing.remove(&id);
    }

    /// Takes the composer's draft as a create request and marks the reply
    /// as in flight. An empty draft yields `Ok(None)` and changes nothing.
    pub fn begin_submit(&mut self, id: i64) -> Result<Option<ReplyRequest>, ThreadError> {
        let depth = self.depth(id)?;
        let composing = self
            .composing
            .get_mut(&id)
            .ok_or(ThreadError::NotReplying(id))?;
        if composing.pending {
            return Err(ThreadError::Busy(id));
        }
        let Some(content) = composing.form.pending_content() else {
            return Ok(None);
        };

        composing.pending = true;
        Ok(Some(ReplyRequest {
            parent_id: id,
            depth: depth + 1,
            content,
        }))
    }

    /// Settles an in-flight reply. Success closes the composer; failure
    /// leaves it open with the draft intact.
    pub fn finish_submit(&mut self, id: i64, succeeded: bool) {
        if succeeded {
            self.composing.remove(&id);
        } else if let Some(composing) = self.composing.get_mut(&id) {
            composing.pending = false;
        }
    }

    /// Id to send in a delete request. Only the author may delete, and only
    /// this comment is requested, never its replies.
    pub fn delete_request(&self, id: i64) -> Result<i64, ThreadError> {
        let comment = self.forest.get(id).ok_or(ThreadError::UnknownComment(id))?;
        if !self.viewer.is_authenticated() {
            return Err(ThreadError::Unauthenticated);
        }
        if !self.viewer.owns(comment.user_id) {
            return Err(ThreadError::NotAuthor(id));
        }
        Ok(id)
    }

    /// Swaps in a freshly built forest. Composers survive only for comments
    /// that still exist.
    pub fn replace_forest(&mut self, forest: CommentForest) {
        self.composing.retain(|id, _| forest.contains(*id));
        self.forest = forest;
    }
}
