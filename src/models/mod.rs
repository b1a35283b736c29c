//! Wire shapes of the management API.

pub mod account;
pub mod api_key;
pub mod auth;
pub mod character;
pub mod dashboard;
pub mod group;
pub mod page;
pub mod settings;
pub mod task;

pub use account::{Account, AccountFilter, AccountRequest, AccountStatus, BatchImportRequest, Quota};
pub use api_key::{ApiKey, ApiKeyFilter, ApiKeyRequest, CreatedApiKey, GroupBinding};
pub use auth::{Identity, Role};
pub use character::{Character, CharacterFilter, CharacterStatus, VisibilityChange};
pub use dashboard::DashboardStats;
pub use group::{Group, GroupFilter, GroupRequest};
pub use page::{ListFilter, Page, PageRequest};
pub use settings::{ProxyProbe, Settings, SettingsPatch, VersionInfo};
pub use task::{Task, TaskFilter, TaskKind, TaskStatus};
