//! Application context: the signed-in identity shared by every request.
//!
//! The bearer token has a single writer. It is set on login and cleared on
//! logout or when the backend answers 401. Readers take a snapshot through a
//! `watch` channel, so in-flight requests never block on it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::ConsoleClient;
use crate::config::Config;
use crate::errors::ConsoleError;
use crate::models::Role;
use crate::secrets::Secret;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: Secret,
    pub role: Role,
}

#[derive(Clone)]
pub struct Session {
    state: Arc<watch::Sender<Option<Credentials>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { state: Arc::new(tx) }
    }

    pub fn begin(&self, credentials: Credentials) {
        tracing::info!(role = ?credentials.role, token = %credentials.token.hint(), "session started");
        self.state.send_replace(Some(credentials));
    }

    /// Drop the credentials. Returns whether a session was active.
    pub fn end(&self) -> bool {
        let previous = self.state.send_replace(None);
        if previous.is_some() {
            tracing::info!("session ended");
        }
        previous.is_some()
    }

    pub fn current(&self) -> Option<Credentials> {
        self.state.borrow().clone()
    }

    pub fn bearer(&self) -> Result<Secret, ConsoleError> {
        self.state
            .borrow()
            .as_ref()
            .map(|c| c.token.clone())
            .ok_or(ConsoleError::NoSession)
    }

    pub fn role(&self) -> Option<Role> {
        self.state.borrow().as_ref().map(|c| c.role)
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Change feed for views that must react to a forced logout.
    pub fn subscribe(&self) -> watch::Receiver<Option<Credentials>> {
        self.state.subscribe()
    }
}

/// Everything a view or command needs, passed explicitly instead of living in
/// globals. Built once at startup; [`teardown`](Self::teardown) signs out.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub session: Session,
    pub client: ConsoleClient,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self, ConsoleError> {
        let session = Session::new();
        let client = ConsoleClient::new(&config, session.clone())?;
        Ok(Self {
            config: Arc::new(config),
            session,
            client,
        })
    }

    /// Sign in with whatever the configuration provides: a pre-issued token,
    /// then username/password, then an API key.
    pub async fn sign_in(&self) -> Result<Role, ConsoleError> {
        if let Some(token) = &self.config.token {
            self.session.begin(Credentials {
                token: Secret::new(token.clone()),
                role: Role::Admin,
            });
            let me = self.client.auth().me().await?;
            // The token may belong to a viewer; trust the server.
            self.session.begin(Credentials {
                token: Secret::new(token.clone()),
                role: me.role,
            });
            return Ok(me.role);
        }
        match (&self.config.username, &self.config.password, &self.config.api_key) {
            (Some(user), Some(pass), _) => self.client.auth().login(user, pass).await,
            (_, _, Some(key)) => self.client.auth().login_with_api_key(key).await,
            _ => Err(ConsoleError::Validation(
                "no credentials configured: set SORA_CONSOLE_TOKEN, SORA_CONSOLE_USERNAME and \
                 SORA_CONSOLE_PASSWORD, or SORA_CONSOLE_API_KEY"
                    .into(),
            )),
        }
    }

    pub fn teardown(&self) {
        self.session.end();
    }
}
