use async_trait::async_trait;
use reqwest::Method;

use super::ConsoleClient;
use crate::errors::ConsoleError;
use crate::models::{Account, AccountFilter, AccountRequest, BatchImportRequest, Page, PageRequest};
use crate::reconcile::{normalize_lines, BatchImportReport};
use crate::secrets::AccountTokens;
use crate::sync::ListSource;

#[derive(Clone)]
pub struct AccountsApi {
    client: ConsoleClient,
}

impl AccountsApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: &AccountFilter, page: PageRequest) -> Result<Page<Account>, ConsoleError> {
        self.client.get_page("/accounts", filter, page).await
    }

    pub async fn create(&self, req: &AccountRequest) -> Result<Account, ConsoleError> {
        req.validate_create()?;
        let account: Account = self.client.send_json(Method::POST, "/accounts", req).await?;
        tracing::info!(account_id = account.id, email = %account.email, "account created");
        Ok(account)
    }

    /// Full replacement of the editable fields; build `req` from the current
    /// record with [`Account::to_update`].
    pub async fn update(&self, id: i64, req: &AccountRequest) -> Result<Account, ConsoleError> {
        req.validate_update()?;
        let path = format!("/accounts/{}", id);
        let account: Account = self.client.send_json(Method::PUT, &path, req).await?;
        tracing::info!(account_id = id, "account updated");
        Ok(account)
    }

    /// Move an account into `group_id` (or out of any group) keeping the rest.
    pub async fn assign_group(&self, current: &Account, group_id: Option<i64>) -> Result<Account, ConsoleError> {
        let mut req = current.to_update();
        req.group_id = group_id;
        self.update(current.id, &req).await
    }

    pub async fn set_enabled(&self, current: &Account, enabled: bool) -> Result<Account, ConsoleError> {
        let mut req = current.to_update();
        req.enabled = Some(enabled);
        self.update(current.id, &req).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ConsoleError> {
        self.client.delete(&format!("/accounts/{}", id)).await?;
        tracing::info!(account_id = id, "account deleted");
        Ok(())
    }

    /// Exchange the stored refresh token for a new pair. Answers with the
    /// record as the backend left it, status recomputed.
    pub async fn refresh(&self, id: i64) -> Result<Account, ConsoleError> {
        let account: Account = self.client.post_empty(&format!("/accounts/{}/refresh", id)).await?;
        warn_if_inconsistent(&account);
        Ok(account)
    }

    /// Re-read quota and subscription upstream and return the fresh record.
    pub async fn sync_status(&self, id: i64) -> Result<Account, ConsoleError> {
        let account: Account = self.client.get_json(&format!("/accounts/{}/status", id)).await?;
        warn_if_inconsistent(&account);
        Ok(account)
    }

    /// Explicit reveal of both tokens. Callers keep the result in a
    /// [`RevealCache`](crate::secrets::RevealCache), never on disk.
    pub async fn reveal_tokens(&self, id: i64) -> Result<AccountTokens, ConsoleError> {
        self.client.get_json(&format!("/accounts/{}/tokens", id)).await
    }

    /// Submit raw token lines for server-side reconciliation. Lines are
    /// trimmed and blanks dropped first, so the report covers every
    /// submitted line one for one.
    pub async fn batch_import<S: AsRef<str>>(
        &self,
        lines: &[S],
        group_id: Option<i64>,
    ) -> Result<BatchImportReport, ConsoleError> {
        let tokens = normalize_lines(lines);
        if tokens.is_empty() {
            return Err(ConsoleError::Validation("no tokens to import".into()));
        }
        let body = BatchImportRequest { tokens, group_id };
        let report: BatchImportReport = self
            .client
            .send_json(Method::POST, "/accounts/batch", &body)
            .await?;

        if !report.is_consistent_with(body.tokens.len()) {
            tracing::warn!(
                submitted = body.tokens.len(),
                total = report.total,
                details = report.details.len(),
                "batch import report does not cover every submitted line"
            );
        }
        tracing::info!(
            total = report.total,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "batch import finished"
        );
        Ok(report)
    }
}

fn warn_if_inconsistent(account: &Account) {
    if !account.status_is_consistent() {
        tracing::warn!(
            account_id = account.id,
            status = account.status.as_str(),
            remaining = account.remaining_count,
            "backend reported a status that does not match the account's quota"
        );
    }
}

#[async_trait]
impl ListSource for AccountsApi {
    type Filter = AccountFilter;
    type Item = Account;

    async fn fetch_page(&self, filter: &AccountFilter, page: PageRequest) -> Result<Page<Account>, ConsoleError> {
        self.list(filter, page).await
    }
}
