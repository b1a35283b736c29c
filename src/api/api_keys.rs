use async_trait::async_trait;
use reqwest::Method;

use super::ConsoleClient;
use crate::errors::ConsoleError;
use crate::models::api_key::{CreatedApiKeyBody, RevealedKeyBody};
use crate::models::{ApiKey, ApiKeyFilter, ApiKeyRequest, CreatedApiKey, Page, PageRequest};
use crate::secrets::Secret;
use crate::sync::ListSource;

#[derive(Clone)]
pub struct ApiKeysApi {
    client: ConsoleClient,
}

impl ApiKeysApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: &ApiKeyFilter, page: PageRequest) -> Result<Page<ApiKey>, ConsoleError> {
        self.client.get_page("/api-keys", filter, page).await
    }

    /// Create a key. When `req.key` is empty the backend generates one. The
    /// plaintext comes back exactly once, inside the returned [`CreatedApiKey`].
    pub async fn create(&self, req: &ApiKeyRequest) -> Result<CreatedApiKey, ConsoleError> {
        req.validate(self.client.key_binding())?;
        let body: CreatedApiKeyBody = self.client.send_json(Method::POST, "/api-keys", req).await?;
        let created = CreatedApiKey::from(body);
        tracing::info!(
            key_id = created.record.id,
            key = %created.secret.hint(),
            "api key created"
        );
        Ok(created)
    }

    pub async fn update(&self, id: i64, req: &ApiKeyRequest) -> Result<ApiKey, ConsoleError> {
        req.validate(self.client.key_binding())?;
        let key: ApiKey = self
            .client
            .send_json(Method::PUT, &format!("/api-keys/{}", id), req)
            .await?;
        tracing::info!(key_id = id, "api key updated");
        Ok(key)
    }

    /// Takes effect for new calls only; requests already authorized finish.
    pub async fn set_enabled(&self, current: &ApiKey, enabled: bool) -> Result<ApiKey, ConsoleError> {
        let mut req = current.to_update();
        req.enabled = Some(enabled);
        self.update(current.id, &req).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ConsoleError> {
        self.client.delete(&format!("/api-keys/{}", id)).await?;
        tracing::info!(key_id = id, "api key deleted");
        Ok(())
    }

    pub async fn reveal(&self, id: i64) -> Result<Secret, ConsoleError> {
        let body: RevealedKeyBody = self.client.get_json(&format!("/api-keys/{}/reveal", id)).await?;
        Ok(body.key)
    }
}

#[async_trait]
impl ListSource for ApiKeysApi {
    type Filter = ApiKeyFilter;
    type Item = ApiKey;

    async fn fetch_page(&self, filter: &ApiKeyFilter, page: PageRequest) -> Result<Page<ApiKey>, ConsoleError> {
        self.list(filter, page).await
    }
}
