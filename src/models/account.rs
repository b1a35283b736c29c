use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::ListFilter;
use crate::errors::ConsoleError;

/// Health of an upstream account. Derived server-side from token validity
/// and quota; never set directly by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    TokenExpired,
    QuotaExhausted,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 3] = [
        AccountStatus::Active,
        AccountStatus::TokenExpired,
        AccountStatus::QuotaExhausted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::TokenExpired => "token_expired",
            AccountStatus::QuotaExhausted => "quota_exhausted",
        }
    }
}

/// `remaining_count` with its `-1` sentinel decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Unknown,
    Remaining(u64),
}

impl Quota {
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Quota::Unknown
        } else {
            Quota::Remaining(raw as u64)
        }
    }

    pub fn is_exhausted(self) -> bool {
        self == Quota::Remaining(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub group_id: Option<i64>,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub at_hint: String,
    #[serde(default)]
    pub rt_hint: String,
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plan_title: String,
    pub plan_expires_at: Option<DateTime<Utc>>,
    #[serde(default = "unknown_quota")]
    pub remaining_count: i64,
    #[serde(default)]
    pub rate_limit_reached: bool,
    pub rate_limit_resets_at: Option<DateTime<Utc>>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub status: AccountStatus,
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn unknown_quota() -> i64 {
    -1
}

fn enabled_by_default() -> bool {
    true
}

impl Account {
    pub fn quota(&self) -> Quota {
        Quota::from_raw(self.remaining_count)
    }

    /// Name for listings: the operator-given name, else the derived email.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    /// Update body that keeps every field as it is. The backend replaces
    /// `group_id` on every update, so edits must start from the current record.
    pub fn to_update(&self) -> AccountRequest {
        AccountRequest {
            name: self.name.clone(),
            access_token: None,
            refresh_token: None,
            group_id: self.group_id,
            enabled: Some(self.enabled),
        }
    }
}

/// Body of `POST /accounts` and `PUT /accounts/{id}`. Tokens left `None`
/// are not replaced on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl AccountRequest {
    pub fn validate_create(&self) -> Result<(), ConsoleError> {
        self.validate_update()?;
        let has_at = self.access_token.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_rt = self.refresh_token.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_at && !has_rt {
            return Err(ConsoleError::Validation(
                "an access token or a refresh token is required".into(),
            ));
        }
        Ok(())
    }

    pub fn validate_update(&self) -> Result<(), ConsoleError> {
        if self.name.trim().is_empty() {
            return Err(ConsoleError::Validation("account name is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl ListFilter for AccountFilter {}

/// Body of `POST /accounts/batch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchImportRequest {
    pub tokens: Vec<String>,
    pub group_id: Option<i64>,
}
