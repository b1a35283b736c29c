use reqwest::Method;
use serde::Serialize;

use super::ConsoleClient;
use crate::errors::ConsoleError;
use crate::models::{ProxyProbe, Settings, SettingsPatch, VersionInfo};

#[derive(Clone)]
pub struct SettingsApi {
    client: ConsoleClient,
}

#[derive(Serialize)]
struct ProxyTest<'a> {
    proxy_url: &'a str,
}

impl SettingsApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<Settings, ConsoleError> {
        self.client.get_json("/settings").await
    }

    /// Apply a partial update and return the settings as stored.
    pub async fn update(&self, patch: &SettingsPatch) -> Result<Settings, ConsoleError> {
        if patch.is_empty() {
            return Err(ConsoleError::Validation("nothing to update".into()));
        }
        let settings: Settings = self.client.send_json(Method::PUT, "/settings", patch).await?;
        tracing::info!("settings updated");
        Ok(settings)
    }

    /// Ask the backend to reach the upstream through `proxy_url`. A failed
    /// probe is a successful call with `success: false`.
    pub async fn test_proxy(&self, proxy_url: &str) -> Result<ProxyProbe, ConsoleError> {
        self.client
            .send_json(Method::POST, "/proxy-test", &ProxyTest { proxy_url })
            .await
    }

    pub async fn version(&self) -> Result<VersionInfo, ConsoleError> {
        self.client.get_json("/version").await
    }
}
