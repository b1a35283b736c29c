//! Batch account import.
//!
//! Every non-blank input line is one token. A line starting with `rt_` is a
//! refresh token and is exchanged for a fresh pair first; anything else is
//! taken as an access token. The account's email, read from the access
//! token, is the identity: a refresh token and an access token of the same
//! account land on one record. Lines are processed in order and
//! independently, so a batch can partly succeed.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::lifecycle::AccountEvent;
use crate::models::{Account, AccountStatus};
use crate::secrets::{mask_token, Secret};

pub const REFRESH_TOKEN_PREFIX: &str = "rt_";

static JWT_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*$").unwrap()
});

/// Trim every line and drop the blank ones.
pub fn normalize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Refresh,
    Access,
}

pub fn classify(token: &str) -> TokenKind {
    if token.starts_with(REFRESH_TOKEN_PREFIX) {
        TokenKind::Refresh
    } else {
        TokenKind::Access
    }
}

pub fn looks_like_jwt(token: &str) -> bool {
    JWT_SHAPE.is_match(token)
}

#[derive(Deserialize)]
struct Claims {
    email: Option<String>,
    #[serde(rename = "https://api.openai.com/profile")]
    profile: Option<ProfileClaim>,
}

#[derive(Deserialize)]
struct ProfileClaim {
    email: Option<String>,
}

/// Email claim of an access token. The signature is not checked: this only
/// reads the identity the token claims, the backend does the verifying.
pub fn email_from_jwt(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let raw = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&raw).ok()?;
    claims
        .profile
        .and_then(|p| p.email)
        .or(claims.email)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Created,
    Updated,
    Failed,
}

/// Outcome of one input line. `token` is a masked hint, enough to find the
/// line again in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItem {
    pub token: String,
    #[serde(default)]
    pub email: String,
    pub action: ImportAction,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchImportReport {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// One entry per processed line, in input order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub details: Vec<ImportItem>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ImportItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ImportItem>>::deserialize(deserializer)?.unwrap_or_default())
}

impl BatchImportReport {
    fn push(&mut self, item: ImportItem) {
        self.total += 1;
        match item.action {
            ImportAction::Created => self.created += 1,
            ImportAction::Updated => self.updated += 1,
            ImportAction::Failed => self.failed += 1,
        }
        self.details.push(item);
    }

    /// Counters add up and every one of `submitted` lines has its entry.
    pub fn is_consistent_with(&self, submitted: usize) -> bool {
        self.total == submitted
            && self.details.len() == submitted
            && self.created + self.updated + self.failed == submitted
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImportItem> {
        self.details.iter().filter(|d| d.action == ImportAction::Failed)
    }
}

/// How a line would be treated, worked out locally without any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePreview {
    pub token: String,
    pub kind: TokenKind,
    /// Readable from the token itself; refresh tokens carry none.
    pub email: Option<String>,
    pub warning: Option<String>,
}

pub fn preview<S: AsRef<str>>(lines: &[S]) -> Vec<LinePreview> {
    normalize_lines(lines)
        .into_iter()
        .map(|line| {
            let kind = classify(&line);
            let (email, warning) = match kind {
                TokenKind::Refresh => (None, None),
                TokenKind::Access if !looks_like_jwt(&line) => {
                    (None, Some("not a JWT, the backend will likely reject it".to_string()))
                }
                TokenKind::Access => match email_from_jwt(&line) {
                    Some(email) => (Some(email), None),
                    None => (None, Some("no email claim in token".to_string())),
                },
            };
            LinePreview {
                token: mask_token(&line),
                kind,
                email,
                warning,
            }
        })
        .collect()
}

/// A fresh access/refresh pair from an exchange.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: Secret,
    pub refresh_token: Secret,
}

/// Talks to the token issuer on behalf of the import.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    async fn exchange_refresh_token(&self, refresh_token: &str) -> anyhow::Result<TokenPair>;

    async fn email_of(&self, access_token: &str) -> anyhow::Result<String> {
        email_from_jwt(access_token)
            .ok_or_else(|| anyhow::anyhow!("access token carries no email claim"))
    }
}

/// An account row together with its plaintext tokens.
#[derive(Debug, Clone)]
pub struct StoredAccount {
    pub account: Account,
    pub access_token: Secret,
    pub refresh_token: Secret,
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<StoredAccount>>;
    /// Persist a new account; returns it with its assigned id.
    async fn insert(&self, account: StoredAccount) -> anyhow::Result<StoredAccount>;
    async fn save(&self, account: StoredAccount) -> anyhow::Result<()>;
}

pub struct Reconciler<I, R> {
    introspector: I,
    repository: R,
}

impl<I: TokenIntrospector, R: AccountRepository> Reconciler<I, R> {
    pub fn new(introspector: I, repository: R) -> Self {
        Self {
            introspector,
            repository,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub async fn import<S: AsRef<str>>(&self, lines: &[S], group_id: Option<i64>) -> BatchImportReport {
        let mut report = BatchImportReport::default();
        for line in normalize_lines(lines) {
            let hint = mask_token(&line);
            let item = match self.import_line(&line, group_id).await {
                Ok((action, email)) => ImportItem {
                    token: hint,
                    email,
                    action,
                    error: String::new(),
                },
                Err(LineError { email, error }) => {
                    tracing::warn!(token = %hint, error = %error, "import line failed");
                    ImportItem {
                        token: hint,
                        email,
                        action: ImportAction::Failed,
                        error,
                    }
                }
            };
            report.push(item);
        }
        tracing::info!(
            total = report.total,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "batch import reconciled"
        );
        report
    }

    async fn import_line(&self, line: &str, group_id: Option<i64>) -> Result<(ImportAction, String), LineError> {
        let kind = classify(line);
        let (access_token, refresh_token) = match kind {
            TokenKind::Refresh => {
                let pair = self
                    .introspector
                    .exchange_refresh_token(line)
                    .await
                    .map_err(|e| LineError::new(format!("refresh token exchange failed: {}", e)))?;
                let rt = if pair.refresh_token.is_empty() {
                    Secret::new(line)
                } else {
                    pair.refresh_token
                };
                (pair.access_token, Some(rt))
            }
            TokenKind::Access => (Secret::new(line), None),
        };

        let email = self
            .introspector
            .email_of(access_token.expose())
            .await
            .map_err(|e| LineError::new(e.to_string()))?;
        let with_email = |e: anyhow::Error| LineError {
            email: email.clone(),
            error: e.to_string(),
        };

        let now = Utc::now();
        match self.repository.find_by_email(&email).await.map_err(with_email)? {
            Some(mut stored) => {
                stored.access_token = access_token;
                // An access-token line keeps the refresh token already on file.
                if let Some(rt) = refresh_token {
                    stored.refresh_token = rt;
                }
                if group_id.is_some() {
                    stored.account.group_id = group_id;
                }
                stored.account.at_hint = stored.access_token.hint();
                stored.account.rt_hint = stored.refresh_token.hint();
                stored.account.apply(AccountEvent::Refreshed { token_expires_at: None }, now);
                self.repository.save(stored).await.map_err(with_email)?;
                Ok((ImportAction::Updated, email))
            }
            None => {
                let refresh_token = refresh_token.unwrap_or_else(|| Secret::new(""));
                let account = new_account(&email, group_id, &access_token, &refresh_token);
                self.repository
                    .insert(StoredAccount {
                        account,
                        access_token,
                        refresh_token,
                    })
                    .await
                    .map_err(with_email)?;
                Ok((ImportAction::Created, email))
            }
        }
    }
}

struct LineError {
    email: String,
    error: String,
}

impl LineError {
    fn new(error: String) -> Self {
        Self {
            email: String::new(),
            error,
        }
    }
}

fn new_account(email: &str, group_id: Option<i64>, at: &Secret, rt: &Secret) -> Account {
    let now = Utc::now();
    Account {
        id: 0,
        group_id,
        group_name: String::new(),
        name: email.to_string(),
        email: email.to_string(),
        at_hint: at.hint(),
        rt_hint: rt.hint(),
        token_expires_at: None,
        plan_title: String::new(),
        plan_expires_at: None,
        remaining_count: -1,
        rate_limit_reached: false,
        rate_limit_resets_at: None,
        enabled: true,
        status: AccountStatus::Active,
        last_used_at: None,
        last_error: String::new(),
        last_sync_at: None,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

/// In-memory [`AccountRepository`], for local dry runs and tests.
#[derive(Default)]
pub struct MemoryAccountStore {
    rows: Mutex<Vec<StoredAccount>>,
    next_id: AtomicI64,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accounts(&self) -> Vec<StoredAccount> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<StoredAccount>> {
        let rows = self.rows.lock().map_err(|_| anyhow::anyhow!("store poisoned"))?;
        Ok(rows.iter().find(|r| r.account.email == email).cloned())
    }

    async fn insert(&self, mut account: StoredAccount) -> anyhow::Result<StoredAccount> {
        let mut rows = self.rows.lock().map_err(|_| anyhow::anyhow!("store poisoned"))?;
        if rows.iter().any(|r| r.account.email == account.account.email) {
            anyhow::bail!("account {} already exists", account.account.email);
        }
        account.account.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        rows.push(account.clone());
        Ok(account)
    }

    async fn save(&self, account: StoredAccount) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().map_err(|_| anyhow::anyhow!("store poisoned"))?;
        let slot = rows
            .iter_mut()
            .find(|r| r.account.id == account.account.id)
            .ok_or_else(|| anyhow::anyhow!("account {} not found", account.account.id))?;
        *slot = account;
        Ok(())
    }
}
