use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::{SnapshotSource, ViewScope};
use crate::errors::{Action, ConsoleError};

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotState<T> {
    /// Last value fetched successfully; kept through later failures.
    pub value: Option<T>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl<T> Default for SnapshotState<T> {
    fn default() -> Self {
        Self {
            value: None,
            fetched_at: None,
            error: None,
        }
    }
}

/// Refreshes one aggregate (the dashboard counters) on a fixed cadence for
/// as long as the watch is alive.
pub struct SnapshotWatch<T> {
    state: watch::Receiver<SnapshotState<T>>,
    scope: ViewScope,
}

impl<T: Clone + Send + Sync + 'static> SnapshotWatch<T> {
    pub fn start<S>(source: S, cadence: Duration) -> Self
    where
        S: SnapshotSource<Snapshot = T>,
    {
        let (tx, rx) = watch::channel(SnapshotState::default());
        let scope = ViewScope::new();
        let source = Arc::new(source);
        scope.spawn(async move {
            let mut interval = time::interval(cadence);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match source.fetch_snapshot().await {
                    Ok(value) => {
                        tx.send_replace(SnapshotState {
                            value: Some(value),
                            fetched_at: Some(Utc::now()),
                            error: None,
                        });
                    }
                    Err(err) => {
                        let stop = matches!(err, ConsoleError::Unauthorized | ConsoleError::NoSession);
                        tracing::warn!(error = %err, "snapshot refresh failed");
                        tx.send_modify(|s| s.error = Some(err.user_message(Action::Load)));
                        if stop {
                            return;
                        }
                    }
                }
            }
        });
        Self { state: rx, scope }
    }

    pub fn current(&self) -> SnapshotState<T> {
        self.state.borrow().clone()
    }

    /// Next refresh, successful or not. `None` once the watch stopped.
    pub async fn changed(&mut self) -> Option<SnapshotState<T>> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    pub fn stop(&self) {
        self.scope.cancel();
    }
}
