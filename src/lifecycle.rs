//! State machines of the pooled resources.
//!
//! Accounts have a *derived* status: it is recomputed from token validity and
//! quota after every refresh or sync and is never set on its own. Tasks and
//! characters move forward only; once a terminal state has been observed the
//! record is frozen on the client.

use chrono::{DateTime, Utc};

use crate::models::{Account, AccountStatus, Character, CharacterStatus, Quota, Task, TaskStatus};

/// Status an account must carry given what the last refresh/sync learned.
pub fn derive_account_status(token_valid: bool, quota: Quota) -> AccountStatus {
    if !token_valid {
        AccountStatus::TokenExpired
    } else if quota.is_exhausted() {
        AccountStatus::QuotaExhausted
    } else {
        AccountStatus::Active
    }
}

/// Outcome of a refresh or sync call against one account.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    Refreshed {
        token_expires_at: Option<DateTime<Utc>>,
    },
    RefreshFailed(String),
    Synced {
        remaining_count: i64,
        rate_limit_reached: bool,
        rate_limit_resets_at: Option<DateTime<Utc>>,
    },
    /// The upstream rejected the token while syncing.
    SyncAuthFailed(String),
}

impl Account {
    /// Fold one refresh/sync outcome into the record and recompute `status`.
    pub fn apply(&mut self, event: AccountEvent, now: DateTime<Utc>) {
        let token_valid = match event {
            AccountEvent::Refreshed { token_expires_at } => {
                self.token_expires_at = token_expires_at;
                self.last_error.clear();
                true
            }
            AccountEvent::Synced {
                remaining_count,
                rate_limit_reached,
                rate_limit_resets_at,
            } => {
                self.remaining_count = remaining_count;
                self.rate_limit_reached = rate_limit_reached;
                self.rate_limit_resets_at = rate_limit_resets_at;
                self.last_sync_at = Some(now);
                self.last_error.clear();
                true
            }
            AccountEvent::RefreshFailed(err) | AccountEvent::SyncAuthFailed(err) => {
                self.last_error = err;
                false
            }
        };
        self.status = derive_account_status(token_valid, self.quota());
        self.updated_at = Some(now);
    }

    /// Whether the server-reported status agrees with the quota it reported
    /// alongside. A token-expired record is always consistent: token validity
    /// is not visible on the wire.
    pub fn status_is_consistent(&self) -> bool {
        match self.status {
            AccountStatus::TokenExpired => true,
            status => status == derive_account_status(true, self.quota()),
        }
    }
}

/// Resources whose status machine has absorbing states.
pub trait Lifecycle {
    fn is_terminal(&self) -> bool;
}

impl Lifecycle for TaskStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl Lifecycle for CharacterStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, CharacterStatus::Ready | CharacterStatus::Failed)
    }
}

impl Lifecycle for Task {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Lifecycle for Character {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Queued => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Completed | TaskStatus::Failed => 2,
        }
    }

    /// `queued → in_progress → {completed, failed}`. A queued task may also
    /// fail (or finish) before it is ever reported in progress.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        if self == next {
            return true;
        }
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl CharacterStatus {
    pub fn can_transition_to(self, next: CharacterStatus) -> bool {
        self == next || self == CharacterStatus::Processing
    }
}

/// What happened to a freshly polled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Applied,
    Unchanged,
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The held record is already terminal and frozen.
    Terminal,
    /// The observation would move the status backwards.
    Regressed,
}

impl Task {
    /// Merge a polled copy of this task. Terminal records never change again
    /// and progress never goes down.
    pub fn accept(&mut self, mut observed: Task) -> Observation {
        if self.is_terminal() {
            return if *self == observed {
                Observation::Unchanged
            } else {
                Observation::Rejected(Rejection::Terminal)
            };
        }
        if !self.status.can_transition_to(observed.status) {
            return Observation::Rejected(Rejection::Regressed);
        }
        if observed.progress < self.progress {
            tracing::debug!(
                task_id = %self.id,
                held = self.progress,
                observed = observed.progress,
                "ignoring progress regression"
            );
            observed.progress = self.progress;
        }
        observed.progress = observed.progress.min(100);
        if *self == observed {
            return Observation::Unchanged;
        }
        *self = observed;
        Observation::Applied
    }
}

impl Character {
    pub fn accept(&mut self, observed: Character) -> Observation {
        if self.is_terminal() {
            return if *self == observed {
                Observation::Unchanged
            } else {
                Observation::Rejected(Rejection::Terminal)
            };
        }
        if !self.status.can_transition_to(observed.status) {
            return Observation::Rejected(Rejection::Regressed);
        }
        if *self == observed {
            return Observation::Unchanged;
        }
        *self = observed;
        Observation::Applied
    }

    /// Visibility is a side attribute of a ready character.
    pub fn can_toggle_visibility(&self) -> bool {
        self.status == CharacterStatus::Ready
    }

    /// Record the result of a confirmed visibility toggle.
    pub fn set_visibility(&mut self, is_public: bool) {
        if self.can_toggle_visibility() {
            self.is_public = is_public;
        }
    }
}
