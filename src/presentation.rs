//! Status badges for tables and watch output.
//!
//! Every status enum maps to its badge through an exhaustive `match`, so a
//! new backend status does not compile until it has a label and a tone.

use crate::models::{AccountStatus, CharacterStatus, DashboardStats, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Warning,
    Negative,
    Info,
    Neutral,
}

impl Tone {
    /// ANSI SGR color code.
    fn ansi(self) -> &'static str {
        match self {
            Tone::Positive => "32",
            Tone::Warning => "33",
            Tone::Negative => "31",
            Tone::Info => "36",
            Tone::Neutral => "90",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub label: &'static str,
    pub tone: Tone,
    /// Shown as in-flight (spinner, blinking) until the record settles.
    pub pulsing: bool,
}

impl Badge {
    const fn new(label: &'static str, tone: Tone) -> Self {
        Self {
            label,
            tone,
            pulsing: false,
        }
    }

    const fn pulsing(label: &'static str, tone: Tone) -> Self {
        Self {
            label,
            tone,
            pulsing: true,
        }
    }

    pub fn plain(&self) -> String {
        if self.pulsing {
            format!("{}…", self.label)
        } else {
            self.label.to_string()
        }
    }

    pub fn colored(&self) -> String {
        format!("\x1b[{}m{}\x1b[0m", self.tone.ansi(), self.plain())
    }
}

pub trait HasBadge {
    fn badge(&self) -> Badge;
}

impl HasBadge for AccountStatus {
    fn badge(&self) -> Badge {
        match self {
            AccountStatus::Active => Badge::new("active", Tone::Positive),
            AccountStatus::TokenExpired => Badge::new("token expired", Tone::Negative),
            AccountStatus::QuotaExhausted => Badge::new("quota exhausted", Tone::Warning),
        }
    }
}

impl HasBadge for TaskStatus {
    fn badge(&self) -> Badge {
        match self {
            TaskStatus::Queued => Badge::pulsing("queued", Tone::Neutral),
            TaskStatus::InProgress => Badge::pulsing("in progress", Tone::Info),
            TaskStatus::Completed => Badge::new("completed", Tone::Positive),
            TaskStatus::Failed => Badge::new("failed", Tone::Negative),
        }
    }
}

impl HasBadge for CharacterStatus {
    fn badge(&self) -> Badge {
        match self {
            CharacterStatus::Processing => Badge::pulsing("processing", Tone::Info),
            CharacterStatus::Ready => Badge::new("ready", Tone::Positive),
            CharacterStatus::Failed => Badge::new("failed", Tone::Negative),
        }
    }
}

/// Badge for an enabled/disabled flag.
pub fn enabled_badge(enabled: bool) -> Badge {
    if enabled {
        Badge::new("enabled", Tone::Positive)
    } else {
        Badge::new("disabled", Tone::Neutral)
    }
}

/// Text progress bar, `width` cells wide.
pub fn progress_bar(progress: u8, width: usize) -> String {
    let filled = (usize::from(progress.min(100)) * width) / 100;
    format!("[{}{}] {:>3}%", "#".repeat(filled), "-".repeat(width - filled), progress.min(100))
}

/// The three summary rows of the dashboard: accounts, tasks, characters.
pub fn dashboard_lines(s: &DashboardStats) -> [String; 3] {
    [
        format!(
            "Accounts   {:>6} total  {:>6} active  {:>6} expired  {:>6} exhausted  ({:.0}% healthy)",
            s.total_accounts,
            s.active_accounts,
            s.expired_accounts,
            s.exhausted_accounts,
            s.healthy_percent()
        ),
        format!(
            "Tasks      {:>6} total  {:>6} pending {:>6} done     {:>6} failed",
            s.total_tasks, s.pending_tasks, s.completed_tasks, s.failed_tasks
        ),
        format!(
            "Characters {:>6} total  {:>6} processing {:>3} ready  {:>6} failed",
            s.total_characters, s.processing_characters, s.ready_characters, s.failed_characters
        ),
    ]
}
