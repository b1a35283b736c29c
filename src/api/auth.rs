use reqwest::Method;

use super::ConsoleClient;
use crate::errors::ConsoleError;
use crate::models::auth::{ApiKeyLogin, LoginResponse, PasswordLogin};
use crate::models::{Identity, Role};
use crate::session::Credentials;

#[derive(Clone)]
pub struct AuthApi {
    client: ConsoleClient,
}

impl AuthApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    /// Admin login. On success the session holds the issued token.
    pub async fn login(&self, username: &str, password: &str) -> Result<Role, ConsoleError> {
        let req = self
            .client
            .anonymous(Method::POST, "/login")?
            .json(&PasswordLogin { username, password });
        self.finish(self.client.execute(&Method::POST, "/login", req).await?).await
    }

    /// Viewer login with a caller API key.
    pub async fn login_with_api_key(&self, api_key: &str) -> Result<Role, ConsoleError> {
        let req = self
            .client
            .anonymous(Method::POST, "/login/apikey")?
            .json(&ApiKeyLogin { api_key });
        self.finish(self.client.execute(&Method::POST, "/login/apikey", req).await?)
            .await
    }

    async fn finish(&self, resp: reqwest::Response) -> Result<Role, ConsoleError> {
        let body: LoginResponse = serde_json::from_slice(&resp.bytes().await?)?;
        let role = body.role;
        self.client.session().begin(Credentials {
            token: body.token,
            role,
        });
        Ok(role)
    }

    pub async fn me(&self) -> Result<Identity, ConsoleError> {
        self.client.get_json("/me").await
    }

    /// Local only: the backend keeps no server-side session.
    pub fn logout(&self) {
        self.client.session().end();
    }
}
