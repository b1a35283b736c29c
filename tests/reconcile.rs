//! Batch import reconciliation over an in-memory account store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use sora_console::models::AccountStatus;
use sora_console::reconcile::{
    ImportAction, MemoryAccountStore, Reconciler, TokenIntrospector, TokenPair,
};
use sora_console::secrets::Secret;

/// Mint an access token the way upstream shapes them: the email sits under
/// the profile claim.
fn access_token(email: &str, nonce: u32) -> String {
    let claims = json!({
        "https://api.openai.com/profile": { "email": email },
        "sub": format!("user-{}", email),
        "exp": 4_102_444_800u64,
        "nonce": nonce,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-only")).unwrap()
}

/// Exchanges known refresh tokens for fresh pairs; anything else is rejected
/// as upstream would.
#[derive(Default)]
struct FakeIssuer {
    accounts: HashMap<String, String>,
    exchanges: Mutex<u32>,
}

impl FakeIssuer {
    fn with(mut self, refresh_token: &str, email: &str) -> Self {
        self.accounts.insert(refresh_token.to_string(), email.to_string());
        self
    }
}

#[async_trait]
impl TokenIntrospector for FakeIssuer {
    async fn exchange_refresh_token(&self, refresh_token: &str) -> anyhow::Result<TokenPair> {
        let email = self
            .accounts
            .get(refresh_token)
            .ok_or_else(|| anyhow::anyhow!("invalid_grant"))?;
        let mut n = self.exchanges.lock().unwrap();
        *n += 1;
        Ok(TokenPair {
            access_token: Secret::new(access_token(email, *n)),
            refresh_token: Secret::new(format!("{}_rotated{}", refresh_token, n)),
        })
    }
}

#[tokio::test]
async fn test_two_fresh_lines_create_two_accounts() {
    let issuer = FakeIssuer::default().with("rt_alice_0001", "alice@example.com");
    let reconciler = Reconciler::new(issuer, MemoryAccountStore::new());

    let bob = access_token("bob@example.com", 0);
    let report = reconciler.import(&["rt_alice_0001", bob.as_str()], Some(4)).await;

    assert!(report.is_consistent_with(2));
    assert_eq!(report.created, 2);
    assert_eq!(report.details[0].email, "alice@example.com");
    assert_eq!(report.details[0].action, ImportAction::Created);
    assert_eq!(report.details[0].token, "rt_a****0001");

    let rows = reconciler.repository().accounts();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.account.group_id == Some(4)));
    assert!(rows.iter().all(|r| r.account.status == AccountStatus::Active && r.account.enabled));
    let alice = rows.iter().find(|r| r.account.email == "alice@example.com").unwrap();
    assert_eq!(alice.refresh_token.expose(), "rt_alice_0001_rotated1");
    let bob_row = rows.iter().find(|r| r.account.email == "bob@example.com").unwrap();
    assert!(bob_row.refresh_token.is_empty());
}

#[tokio::test]
async fn test_same_refresh_token_again_updates_in_place() {
    let issuer = FakeIssuer::default().with("rt_alice_0001", "alice@example.com");
    let reconciler = Reconciler::new(issuer, MemoryAccountStore::new());

    let first = reconciler.import(&["rt_alice_0001"], None).await;
    assert_eq!(first.created, 1);

    let second = reconciler.import(&["rt_alice_0001"], None).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(second.details[0].action, ImportAction::Updated);

    let rows = reconciler.repository().accounts();
    assert_eq!(rows.len(), 1, "deduplicated by email");
    assert_eq!(rows[0].refresh_token.expose(), "rt_alice_0001_rotated2");
}

#[tokio::test]
async fn test_access_line_keeps_existing_refresh_token() {
    let issuer = FakeIssuer::default().with("rt_carol_0001", "carol@example.com");
    let reconciler = Reconciler::new(issuer, MemoryAccountStore::new());
    reconciler.import(&["rt_carol_0001"], Some(1)).await;

    let fresh_at = access_token("carol@example.com", 99);
    let report = reconciler.import(&[fresh_at.as_str()], None).await;
    assert_eq!(report.updated, 1);

    let rows = reconciler.repository().accounts();
    assert_eq!(rows[0].access_token.expose(), fresh_at);
    assert_eq!(rows[0].refresh_token.expose(), "rt_carol_0001_rotated1");
    assert_eq!(rows[0].account.group_id, Some(1), "no group given keeps the current one");
}

#[tokio::test]
async fn test_failures_do_not_stop_the_batch() {
    let issuer = FakeIssuer::default().with("rt_dave_00001", "dave@example.com");
    let reconciler = Reconciler::new(issuer, MemoryAccountStore::new());

    let no_email = encode(
        &Header::default(),
        &json!({"sub": "anonymous", "exp": 4_102_444_800u64}),
        &EncodingKey::from_secret(b"test-only"),
    )
    .unwrap();
    let lines = [
        "rt_unknown_0001",
        "",
        "rt_dave_00001",
        "garbage",
        no_email.as_str(),
        "   ",
    ];
    let report = reconciler.import(&lines, None).await;

    assert!(report.is_consistent_with(4));
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 3);
    assert_eq!(report.details.len(), 4);
    assert!(report.details[0].error.contains("invalid_grant"));
    assert_eq!(report.details[1].action, ImportAction::Created);
    assert_eq!(report.details[3].action, ImportAction::Failed);
    assert_eq!(reconciler.repository().len(), 1);
}
