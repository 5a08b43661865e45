// src/comments/form.rs

//! Comment composer state, shared by the root composer and in-place replies.

use std::future::Future;

use crate::models::profile::Viewer;

/// Key events the composer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter { shift: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Edited,
    /// Plain Enter: the caller should submit.
    SubmitRequested,
}

/// Result of a submit attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Trimmed draft was empty; the handler was not called.
    Empty,
    Sent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentForm {
    input: String,
    placeholder: Option<String>,
    auto_focus: bool,
}

impl CommentForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_auto_focus(mut self, auto_focus: bool) -> Self {
        self.auto_focus = auto_focus;
        self
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn auto_focus(&self) -> bool {
        self.auto_focus
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn clear(&mut self) {
        self.input.clear();
    }

    /// Enter submits, Shift+Enter inserts a newline.
    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        match key {
            Key::Char(c) => {
                self.input.push(c);
                KeyOutcome::Edited
            }
            Key::Backspace => {
                self.input.pop();
                KeyOutcome::Edited
            }
            Key::Enter { shift: true } => {
                self.input.push('\n');
                KeyOutcome::Edited
            }
            Key::Enter { shift: false } => KeyOutcome::SubmitRequested,
        }
    }

    /// The trimmed draft, or `None` when there is nothing to send.
    pub fn pending_content(&self) -> Option<String> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Hands the trimmed draft to `handler`.
    ///
    /// The input is cleared only when the handler succeeds, so a failed send
    /// can be retried without retyping.
    pub async fn submit<F, Fut, E>(&mut self, handler: F) -> Result<Submission, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let Some(content) = self.pending_content() else {
            return Ok(Submission::Empty);
        };

        handler(content).await?;
        self.clear();
        Ok(Submission::Sent)
    }
}

/// What a viewer sees in place of the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composer {
    SignInPrompt,
    Form(CommentForm),
}

impl Composer {
    pub fn for_viewer(viewer: &Viewer, form: CommentForm) -> Self {
        if viewer.is_authenticated() {
            Composer::Form(form)
        } else {
            Composer::SignInPrompt
        }
    }
}
