use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("authentication required")]
    Unauthorized,

    #[error("not signed in")]
    NoSession,

    #[error("{0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by views to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Global: the session is gone, force a new login.
    Auth,
    /// Bad input, shown next to the triggering action.
    Validation,
    /// The record vanished; refresh the list.
    NotFound,
    Conflict,
    /// Network or timeout; the operator may retry by hand.
    Transient,
    Server,
    /// Rejected locally before any request was sent.
    Local,
}

/// The user action a failure belongs to. Drives the generic fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Load,
    Create,
    Update,
    Delete,
    Refresh,
    Sync,
    Reveal,
    Import,
    Download,
    ToggleVisibility,
    SaveSettings,
}

impl Action {
    fn fallback(self) -> &'static str {
        match self {
            Action::Login => "login failed",
            Action::Load => "failed to load data",
            Action::Create => "failed to create",
            Action::Update => "failed to update",
            Action::Delete => "failed to delete",
            Action::Refresh => "failed to refresh token",
            Action::Sync => "failed to sync account status",
            Action::Reveal => "failed to reveal secret",
            Action::Import => "batch import failed",
            Action::Download => "failed to download content",
            Action::ToggleVisibility => "failed to change visibility",
            Action::SaveSettings => "failed to save settings",
        }
    }
}

impl ConsoleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::Unauthorized | ConsoleError::NoSession => ErrorKind::Auth,
            ConsoleError::Validation(_) | ConsoleError::Forbidden(_) => ErrorKind::Validation,
            ConsoleError::NotFound(_) => ErrorKind::NotFound,
            ConsoleError::Conflict(_) => ErrorKind::Conflict,
            ConsoleError::Server { .. } | ConsoleError::Decode(_) => ErrorKind::Server,
            ConsoleError::InvalidState(_) | ConsoleError::Url(_) => ErrorKind::Local,
            ConsoleError::Transport(_) | ConsoleError::Middleware(_) | ConsoleError::Io(_) => {
                ErrorKind::Transient
            }
        }
    }

    /// Message the backend attached to the failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        let msg = match self {
            ConsoleError::Validation(m)
            | ConsoleError::Forbidden(m)
            | ConsoleError::NotFound(m)
            | ConsoleError::Conflict(m)
            | ConsoleError::Server { message: m, .. } => m.as_str(),
            _ => return None,
        };
        if msg.trim().is_empty() {
            None
        } else {
            Some(msg)
        }
    }

    /// Text to show the operator for a failed `action`: the server's own
    /// message verbatim when it sent one, a generic one otherwise.
    pub fn user_message(&self, action: Action) -> String {
        if let Some(msg) = self.server_message() {
            return msg.to_string();
        }
        match self.kind() {
            ErrorKind::Auth => "session expired, please sign in again".to_string(),
            ErrorKind::Transient => format!("{} (network error, try again)", action.fallback()),
            ErrorKind::Local => self.to_string(),
            _ => action.fallback().to_string(),
        }
    }

    /// A 404 on a mutation or detail call means the record is gone and the
    /// surrounding list should be fetched again.
    pub fn should_refresh_list(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Build the error for a non-2xx response from its status and raw body.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => ConsoleError::Unauthorized,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ConsoleError::Validation(message)
            }
            StatusCode::FORBIDDEN => ConsoleError::Forbidden(message),
            StatusCode::NOT_FOUND => ConsoleError::NotFound(message),
            StatusCode::CONFLICT => ConsoleError::Conflict(message),
            _ => ConsoleError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// `{ "error": "..." }` or `{ "message": "..." }`. Some backends nest the
/// message one level down as `{ "error": { "message": "..." } }`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<serde_json::Value>,
    message: Option<String>,
}

const MAX_RAW_MESSAGE: usize = 200;

fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        let nested = match env.error {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Object(map)) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        };
        return nested.or(env.message).filter(|m| !m.trim().is_empty());
    }

    // Plain-text body (proxy error pages and the like).
    let truncated: String = body.chars().take(MAX_RAW_MESSAGE).collect();
    Some(truncated)
}
