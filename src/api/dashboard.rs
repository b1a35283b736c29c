use async_trait::async_trait;

use super::ConsoleClient;
use crate::errors::ConsoleError;
use crate::models::DashboardStats;
use crate::sync::SnapshotSource;

#[derive(Clone)]
pub struct DashboardApi {
    client: ConsoleClient,
}

impl DashboardApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    pub async fn stats(&self) -> Result<DashboardStats, ConsoleError> {
        self.client.get_json("/dashboard").await
    }
}

#[async_trait]
impl SnapshotSource for DashboardApi {
    type Snapshot = DashboardStats;

    async fn fetch_snapshot(&self) -> Result<DashboardStats, ConsoleError> {
        self.stats().await
    }
}
