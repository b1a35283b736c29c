use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;

pub const PROXY_URL: &str = "proxy_url";
pub const TOKEN_REFRESH_INTERVAL: &str = "token_refresh_interval";
pub const CREDIT_SYNC_INTERVAL: &str = "credit_sync_interval";
pub const SUBSCRIPTION_SYNC_INTERVAL: &str = "subscription_sync_interval";

/// Keys the backend accepts on `PUT /settings`; anything else is ignored there,
/// so it is rejected here before sending.
pub const SETTING_KEYS: [&str; 4] = [
    PROXY_URL,
    TOKEN_REFRESH_INTERVAL,
    CREDIT_SYNC_INTERVAL,
    SUBSCRIPTION_SYNC_INTERVAL,
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub proxy_url: String,
    pub token_refresh_interval: String,
    pub credit_sync_interval: String,
    pub subscription_sync_interval: String,
}

impl Settings {
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            (PROXY_URL, &self.proxy_url),
            (TOKEN_REFRESH_INTERVAL, &self.token_refresh_interval),
            (CREDIT_SYNC_INTERVAL, &self.credit_sync_interval),
            (SUBSCRIPTION_SYNC_INTERVAL, &self.subscription_sync_interval),
        ]
    }
}

/// Partial update: only the keys present are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SettingsPatch(BTreeMap<String, String>);

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Result<Self, ConsoleError> {
        if !SETTING_KEYS.contains(&key) {
            return Err(ConsoleError::Validation(format!(
                "unknown setting '{}', expected one of: {}",
                key,
                SETTING_KEYS.join(", ")
            )));
        }
        self.0.insert(key.to_string(), value.into());
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Answer of `POST /proxy-test`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyProbe {
    pub success: bool,
    pub status_code: Option<u16>,
    pub latency: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub current: String,
    pub latest: String,
    pub has_update: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_rejects_unknown_keys() {
        let err = SettingsPatch::new().set("api_keys", "x").unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));

        let patch = SettingsPatch::new()
            .set(PROXY_URL, "http://127.0.0.1:7890")
            .unwrap()
            .set(CREDIT_SYNC_INTERVAL, "30m")
            .unwrap();
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"credit_sync_interval": "30m", "proxy_url": "http://127.0.0.1:7890"})
        );
    }
}
