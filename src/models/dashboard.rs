use serde::{Deserialize, Serialize};

/// Aggregate counters from `GET /dashboard`. Character counters are only
/// reported by newer backends and read as zero otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub total_accounts: u64,
    pub active_accounts: u64,
    pub expired_accounts: u64,
    pub exhausted_accounts: u64,
    pub total_tasks: u64,
    /// Queued plus in-progress.
    pub pending_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub total_characters: u64,
    pub processing_characters: u64,
    pub ready_characters: u64,
    pub failed_characters: u64,
}

impl DashboardStats {
    /// Accounts that can currently serve requests, as a percentage.
    pub fn healthy_percent(&self) -> f64 {
        if self.total_accounts == 0 {
            return 0.0;
        }
        self.active_accounts as f64 * 100.0 / self.total_accounts as f64
    }
}
