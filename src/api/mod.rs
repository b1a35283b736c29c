//! Client for the pool's management API.
//!
//! One [`ConsoleClient`] is shared by every view. Resource handles
//! ([`ConsoleClient::accounts`] and friends) are cheap clones of it and can be
//! moved into pollers.
//!
//! Requests carry the session's bearer token and a fresh `x-request-id`.
//! A 401 ends the session. Nothing here retries a mutation; only the
//! read-only content downloads go through the retrying client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::ConsoleError;
use crate::models::{GroupBinding, Page, PageRequest};
use crate::session::Session;

pub mod accounts;
pub mod api_keys;
pub mod auth;
pub mod characters;
pub mod dashboard;
pub mod groups;
pub mod settings;
pub mod tasks;

pub use accounts::AccountsApi;
pub use api_keys::ApiKeysApi;
pub use auth::AuthApi;
pub use characters::CharactersApi;
pub use dashboard::DashboardApi;
pub use groups::GroupsApi;
pub use settings::SettingsApi;
pub use tasks::{Content, TasksApi};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct ConsoleClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    content: ClientWithMiddleware,
    /// Origin plus API prefix, without a trailing slash.
    root: String,
    session: Session,
    key_binding: GroupBinding,
}

impl ConsoleClient {
    pub fn new(config: &Config, session: Session) -> Result<Self, ConsoleError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let content_http = Client::builder()
            .use_rustls_tls()
            .timeout(config.content_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.content_retries);
        let content = ClientBuilder::new(content_http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let root = format!(
            "{}{}",
            config.base_url.as_str().trim_end_matches('/'),
            config.api_prefix
        );

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                content,
                root,
                session,
                key_binding: config.key_group_policy,
            }),
        })
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn key_binding(&self) -> GroupBinding {
        self.inner.key_binding
    }

    pub fn accounts(&self) -> AccountsApi {
        AccountsApi::new(self.clone())
    }

    pub fn groups(&self) -> GroupsApi {
        GroupsApi::new(self.clone())
    }

    pub fn api_keys(&self) -> ApiKeysApi {
        ApiKeysApi::new(self.clone())
    }

    pub fn tasks(&self) -> TasksApi {
        TasksApi::new(self.clone())
    }

    pub fn characters(&self) -> CharactersApi {
        CharactersApi::new(self.clone())
    }

    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.clone())
    }

    pub fn settings(&self) -> SettingsApi {
        SettingsApi::new(self.clone())
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ConsoleError> {
        Ok(Url::parse(&format!("{}{}", self.inner.root, path))?)
    }

    /// Request without credentials (the login endpoints).
    pub(crate) fn anonymous(&self, method: Method, path: &str) -> Result<RequestBuilder, ConsoleError> {
        Ok(self.inner.http.request(method, self.url(path)?))
    }

    pub(crate) fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ConsoleError> {
        let token = self.inner.session.bearer()?;
        Ok(self
            .inner
            .http
            .request(method, self.url(path)?)
            .bearer_auth(token.expose()))
    }

    /// Send, log and turn a non-2xx answer into a [`ConsoleError`].
    pub(crate) async fn execute(
        &self,
        method: &Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, ConsoleError> {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let result = request.header(REQUEST_ID_HEADER, &request_id).send().await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(%method, path, %request_id, elapsed_ms, error = %e, "request failed");
                return Err(e.into());
            }
        };
        self.check(method, path, &request_id, elapsed_ms, resp).await
    }

    async fn check(
        &self,
        method: &Method,
        path: &str,
        request_id: &str,
        elapsed_ms: u64,
        resp: Response,
    ) -> Result<Response, ConsoleError> {
        let status = resp.status();
        if status.is_success() {
            tracing::debug!(%method, path, request_id, status = status.as_u16(), elapsed_ms, "request ok");
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let err = ConsoleError::from_status(status, &body);
        tracing::warn!(
            %method,
            path,
            request_id,
            status = status.as_u16(),
            elapsed_ms,
            error = %err,
            "request rejected"
        );
        if matches!(err, ConsoleError::Unauthorized) {
            self.inner.session.end();
        }
        Err(err)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConsoleError> {
        let req = self.authorized(Method::GET, path)?;
        decode(self.execute(&Method::GET, path, req).await?).await
    }

    /// One page of a list endpoint: filters first, then `page`/`page_size`.
    pub(crate) async fn get_page<F, T>(
        &self,
        path: &str,
        filter: &F,
        page: PageRequest,
    ) -> Result<Page<T>, ConsoleError>
    where
        F: Serialize,
        T: DeserializeOwned,
    {
        let req = self.authorized(Method::GET, path)?.query(filter).query(&page);
        let page: Page<T> = decode(self.execute(&Method::GET, path, req).await?).await?;
        tracing::debug!(path, total = page.total, page = page.page, rows = page.list.len(), "page loaded");
        Ok(page)
    }

    pub(crate) async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ConsoleError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.authorized(method.clone(), path)?.json(body);
        decode(self.execute(&method, path, req).await?).await
    }

    /// POST without a body, decoding the answer.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConsoleError> {
        let req = self.authorized(Method::POST, path)?;
        decode(self.execute(&Method::POST, path, req).await?).await
    }

    /// DELETE; the backend answers 204 with no body.
    pub(crate) async fn delete(&self, path: &str) -> Result<(), ConsoleError> {
        let req = self.authorized(Method::DELETE, path)?;
        self.execute(&Method::DELETE, path, req).await?;
        Ok(())
    }

    /// Read-only binary GET through the retrying client.
    pub(crate) async fn get_content(&self, path: &str) -> Result<Response, ConsoleError> {
        let token = self.inner.session.bearer()?;
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let result = self
            .inner
            .content
            .get(self.url(path)?)
            .bearer_auth(token.expose())
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(path, %request_id, elapsed_ms, error = %e, "content download failed after retries");
                return Err(e.into());
            }
        };
        self.check(&Method::GET, path, &request_id, elapsed_ms, resp).await
    }
}

/// Path of one record under `collection`, plus an optional action segment.
/// `id` is percent-encoded as a single segment, so `/`, `?` or `#` in an
/// opaque id cannot reach another endpoint.
pub(crate) fn record_path(collection: &str, id: &str, action: Option<&str>) -> Result<String, ConsoleError> {
    let mut scratch = Url::parse("http://record.invalid/")?;
    scratch
        .path_segments_mut()
        .map_err(|_| ConsoleError::InvalidState(format!("cannot build a path for {} {}", collection, id)))?
        .pop_if_empty()
        .push(collection)
        .push(id)
        .extend(action);
    Ok(scratch.path().to_string())
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ConsoleError> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
