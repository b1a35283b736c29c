use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use sora_console::models::{AccountStatus, CharacterStatus, TaskKind, TaskStatus};

/// Sora pool console: manage pooled accounts, keys, tasks and characters
#[derive(Parser)]
#[command(name = "sora-console", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show who the console is signed in as
    Whoami,

    /// Pool overview: account, task and character counts
    Dashboard {
        /// Keep refreshing until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },

    /// Manage pooled upstream accounts
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Manage account groups
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },

    /// Manage client API keys
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Inspect generation tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Inspect and manage characters
    Character {
        #[command(subcommand)]
        command: CharacterCommands,
    },

    /// Backend settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Backend version and update availability
    Version,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// List accounts
    List {
        #[arg(long, value_parser = parse_enum::<AccountStatus>)]
        status: Option<AccountStatus>,
        #[arg(long)]
        group: Option<i64>,
        #[arg(short, long)]
        keyword: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
    },
    /// Add an account from an access and/or refresh token
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, env = "SORA_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
        #[arg(long, env = "SORA_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: Option<String>,
        #[arg(long)]
        group: Option<i64>,
    },
    /// Update an account; unspecified fields keep their current value
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        access_token: Option<String>,
        #[arg(long)]
        refresh_token: Option<String>,
        /// Move to this group
        #[arg(long, conflicts_with = "ungroup")]
        group: Option<i64>,
        /// Remove from its group
        #[arg(long)]
        ungroup: bool,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Delete an account
    Delete { id: i64 },
    /// Exchange the refresh token for a new access token
    Refresh { id: i64 },
    /// Re-sync quota and subscription from upstream
    Sync { id: i64 },
    /// Print the full tokens of an account
    Reveal { id: i64 },
    /// Import tokens, one per line (access tokens or `rt_` refresh tokens)
    Import {
        /// Token file; `-` reads stdin
        #[arg(short, long)]
        file: PathBuf,
        /// Assign every imported account to this group
        #[arg(long)]
        group: Option<i64>,
        /// Classify the lines locally without sending anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// List groups
    List {
        #[arg(short, long)]
        keyword: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
    },
    /// Create a group
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Update a group
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Delete a group; its accounts become ungrouped
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// List API keys
    List {
        #[arg(long)]
        group: Option<i64>,
        #[arg(short, long)]
        keyword: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
    },
    /// Create an API key; the plaintext is printed once
    Add {
        #[arg(long)]
        name: String,
        /// Bind the key to a group of accounts
        #[arg(long)]
        group: Option<i64>,
        /// Use this key instead of a generated one
        #[arg(long)]
        key: Option<String>,
    },
    /// Rename or rebind a key
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "ungroup")]
        group: Option<i64>,
        #[arg(long)]
        ungroup: bool,
    },
    /// Enable a key
    Enable { id: i64 },
    /// Disable a key
    Disable { id: i64 },
    /// Delete a key
    Delete { id: i64 },
    /// Print the full key
    Reveal { id: i64 },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// List tasks
    List {
        #[arg(long, value_parser = parse_enum::<TaskStatus>)]
        status: Option<TaskStatus>,
        #[arg(long = "type", value_parser = parse_enum::<TaskKind>)]
        kind: Option<TaskKind>,
        #[arg(long, default_value = "1")]
        page: u32,
        /// Keep refreshing until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },
    /// Show one task
    Show {
        id: String,
        /// Follow the task until it completes or fails
        #[arg(short, long)]
        follow: bool,
    },
    /// Save the output of a completed task
    Download {
        id: String,
        /// Defaults to `<id>.mp4` or `<id>.png`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CharacterCommands {
    /// List characters
    List {
        #[arg(long, value_parser = parse_enum::<CharacterStatus>)]
        status: Option<CharacterStatus>,
        #[arg(long)]
        public: Option<bool>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(short, long)]
        watch: bool,
    },
    /// Show one character
    Show {
        id: String,
        #[arg(short, long)]
        follow: bool,
    },
    /// Delete a character
    Delete { id: String },
    /// Flip a ready character between public and private
    Visibility { id: String },
    /// Save the character's avatar image
    Image {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show current settings
    Show,
    /// Change one or more settings, e.g. `proxy_url=http://proxy:3128`
    Set {
        #[arg(required = true, value_parser = parse_key_value)]
        pairs: Vec<(String, String)>,
    },
    /// Check that a proxy can reach upstream
    TestProxy {
        /// Defaults to the configured proxy
        url: Option<String>,
    },
}

/// Parse a status or kind by its wire name.
fn parse_enum<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown value '{}'", raw))
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enum_by_wire_name() {
        assert_eq!(parse_enum::<TaskStatus>("in_progress"), Ok(TaskStatus::InProgress));
        assert_eq!(parse_enum::<AccountStatus>("quota_exhausted"), Ok(AccountStatus::QuotaExhausted));
        assert!(parse_enum::<TaskStatus>("running").is_err());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("proxy_url=http://p:1?a=b"),
            Ok(("proxy_url".to_string(), "http://p:1?a=b".to_string()))
        );
        assert!(parse_key_value("proxy_url").is_err());
    }

    #[test]
    fn test_cli_parses_import() {
        let cli = Cli::try_parse_from(["sora-console", "account", "import", "-f", "tokens.txt", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Account {
                command: AccountCommands::Import { dry_run, group, .. },
            } => {
                assert!(dry_run);
                assert_eq!(group, None);
            }
            _ => panic!("wrong command"),
        }
    }
}
