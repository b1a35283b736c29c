use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::ListFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterStatus {
    Processing,
    Ready,
    Failed,
}

impl CharacterStatus {
    pub const ALL: [CharacterStatus; 3] = [
        CharacterStatus::Processing,
        CharacterStatus::Ready,
        CharacterStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CharacterStatus::Processing => "processing",
            CharacterStatus::Ready => "ready",
            CharacterStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    #[serde(default)]
    pub account_id: i64,
    #[serde(default)]
    pub cameo_id: String,
    #[serde(default)]
    pub character_id: String,
    pub status: CharacterStatus,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub profile_url: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub account_email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Answer of `POST /characters/{id}/visibility`. The call flips the flag;
/// the body reports where it landed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisibilityChange {
    #[serde(default)]
    pub message: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CharacterFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CharacterStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl ListFilter for CharacterFilter {
    fn polls(&self) -> bool {
        matches!(self.status, None | Some(CharacterStatus::Processing))
    }
}
