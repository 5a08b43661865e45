// src/models/profile.rs

use serde::{Deserialize, Serialize};

/// Per-profile comment settings, stored on the content owner's profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPreferences {
    #[serde(default)]
    pub disable_comments: bool,
}

/// DTO for updating comment preferences.
#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub disable_comments: bool,
}

/// Who is looking at a comment section.
/// Anonymous viewers can read but not reply or delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<i64>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn signed_in(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Whether this viewer authored something owned by `user_id`.
    pub fn owns(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}
