//! Secret disclosure: plaintext tokens and API keys only ever live inside
//! [`Secret`], which wipes its buffer on drop, never serializes and never
//! prints its contents through `Debug`/`Display`.
//!
//! Two ways a plaintext reaches the client:
//! - a freshly created secret, handed out once through [`OneTimeSecret`];
//! - an explicit reveal call, kept per view in a [`RevealCache`] until the
//!   operator hides it or the view is torn down.

use std::fmt;
use std::future::Future;
use std::hash::Hash;

use dashmap::DashMap;
use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

/// Redacted hint for a token: first 4 and last 4 chars around `****`.
/// Short tokens collapse to `****` entirely; an empty token stays empty.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        if chars.is_empty() {
            return String::new();
        }
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Plaintext access. Callers must not log or persist the returned value.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn hint(&self) -> String {
        mask_token(self.expose())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.hint())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Backends send `""` for a missing refresh token.
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Secret::new(raw.unwrap_or_default()))
    }
}

/// A plaintext the server returns exactly once (e.g. a newly generated API
/// key). `take` hands it out a single time; afterwards only the hint is left.
#[derive(Debug)]
pub struct OneTimeSecret {
    hint: String,
    value: Option<Secret>,
}

impl OneTimeSecret {
    pub fn new(value: Secret) -> Self {
        Self {
            hint: value.hint(),
            value: Some(value),
        }
    }

    pub fn take(&mut self) -> Option<Secret> {
        self.value.take()
    }

    pub fn is_consumed(&self) -> bool {
        self.value.is_none()
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }
}

/// Full access/refresh token pair of one account, as returned by a reveal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountTokens {
    #[serde(default = "empty_secret")]
    pub access_token: Secret,
    #[serde(default = "empty_secret")]
    pub refresh_token: Secret,
}

fn empty_secret() -> Secret {
    Secret::new(String::new())
}

/// Per-view store of revealed plaintexts, keyed by record id.
///
/// Lives only as long as the view that owns it: nothing here is written to
/// disk, and dropping the cache (or calling [`hide`](Self::hide)) zeroizes
/// the buffers.
pub struct RevealCache<K, V> {
    entries: DashMap<K, V>,
}

impl<K, V> Default for RevealCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K, V> RevealCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the explicit reveal call and keep its result for this view.
    /// Always hits the server: a reveal is an auditable action, not a cache read.
    pub async fn reveal<F, Fut, E>(&self, id: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let value = fetch().await?;
        tracing::info!(id = ?id, "secret revealed");
        self.entries.insert(id, value.clone());
        Ok(value)
    }

    /// Discard the cached plaintext for `id`. Returns whether one was held.
    pub fn hide(&self, id: &K) -> bool {
        self.entries.remove(id).is_some()
    }

    /// The already-revealed value, if any. Never triggers a reveal; copy
    /// actions go through here only.
    pub fn revealed(&self, id: &K) -> Option<V> {
        self.entries.get(id).map(|v| v.value().clone())
    }

    pub fn is_revealed(&self, id: &K) -> bool {
        self.entries.contains_key(id)
    }

    /// Drop every plaintext (view teardown, logout).
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
