use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::ListFilter;
use crate::errors::ConsoleError;
use crate::secrets::{mask_token, OneTimeSecret, Secret};

/// Caller-facing credential. Listings only ever carry `key_hint`; the
/// plaintext travels through [`CreatedApiKey`] or an explicit reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub key_hint: String,
    pub group_id: Option<i64>,
    #[serde(default)]
    pub group_name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn enabled_by_default() -> bool {
    true
}

impl ApiKey {
    pub fn to_update(&self) -> ApiKeyRequest {
        ApiKeyRequest {
            name: self.name.clone(),
            key: None,
            group_id: self.group_id,
            enabled: Some(self.enabled),
        }
    }
}

/// Whether an API key must be bound to a group. Deployments disagree, so
/// the console takes it as configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBinding {
    /// An unbound key may use the whole pool.
    #[default]
    Optional,
    /// Every key must name a group.
    Required,
}

impl std::str::FromStr for GroupBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optional" | "" => Ok(GroupBinding::Optional),
            "required" => Ok(GroupBinding::Required),
            other => Err(format!(
                "unknown api key group policy '{}', expected 'optional' or 'required'",
                other
            )),
        }
    }
}

/// Body of `POST /api-keys` and `PUT /api-keys/{id}`. An absent `key` lets
/// the backend generate one on create and keeps the current one on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiKeyRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ApiKeyRequest {
    pub fn validate(&self, binding: GroupBinding) -> Result<(), ConsoleError> {
        if self.name.trim().is_empty() {
            return Err(ConsoleError::Validation("api key name is required".into()));
        }
        if binding == GroupBinding::Required && self.group_id.is_none() {
            return Err(ConsoleError::Validation(
                "this deployment requires every api key to be bound to a group".into(),
            ));
        }
        Ok(())
    }
}

/// Wire shape of the create response: the full record plus the plaintext key.
#[derive(Deserialize)]
pub(crate) struct CreatedApiKeyBody {
    #[serde(flatten)]
    pub record: ApiKey,
    pub key: Secret,
}

/// A freshly created key. The plaintext can be taken exactly once.
#[derive(Debug)]
pub struct CreatedApiKey {
    pub record: ApiKey,
    pub secret: OneTimeSecret,
}

impl From<CreatedApiKeyBody> for CreatedApiKey {
    fn from(body: CreatedApiKeyBody) -> Self {
        let mut record = body.record;
        if record.key_hint.is_empty() {
            record.key_hint = mask_token(body.key.expose());
        }
        Self {
            record,
            secret: OneTimeSecret::new(body.key),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RevealedKeyBody {
    pub key: Secret,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiKeyFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl ListFilter for ApiKeyFilter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_ignores_blank_key_field() {
        let key: ApiKey = serde_json::from_str(
            r#"{"id":3,"name":"ci","key":"","key_hint":"sk-1****abcd","group_id":2,
                "group_name":"prod","enabled":true,"usage_count":17,"last_used_at":null,
                "created_at":null,"updated_at":null}"#,
        )
        .unwrap();
        assert_eq!(key.key_hint, "sk-1****abcd");
        assert_eq!(key.usage_count, 17);
    }

    #[test]
    fn test_created_key_fills_missing_hint() {
        let body: CreatedApiKeyBody = serde_json::from_str(
            r#"{"id":9,"name":"new","key":"sk-0011223344556677","group_id":null,
                "enabled":true,"usage_count":0,"last_used_at":null}"#,
        )
        .unwrap();
        let mut created = CreatedApiKey::from(body);
        assert_eq!(created.record.key_hint, "sk-0****6677");
        assert_eq!(
            created.secret.take().map(|s| s.expose().to_string()).as_deref(),
            Some("sk-0011223344556677")
        );
        assert!(created.secret.take().is_none());
    }

    #[test]
    fn test_group_binding_policy() {
        let unbound = ApiKeyRequest {
            name: "k".into(),
            ..Default::default()
        };
        assert!(unbound.validate(GroupBinding::Optional).is_ok());
        assert!(matches!(
            unbound.validate(GroupBinding::Required),
            Err(ConsoleError::Validation(_))
        ));
        assert_eq!("REQUIRED".parse::<GroupBinding>(), Ok(GroupBinding::Required));
        assert!("sometimes".parse::<GroupBinding>().is_err());
    }
}
