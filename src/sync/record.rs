use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::{RecordSource, Tracked, ViewScope};
use crate::errors::{Action, ConsoleError, ErrorKind};
use crate::lifecycle::Observation;

#[derive(Debug, Clone, PartialEq)]
pub enum WatchState<T> {
    Loading,
    /// Still moving; polled again on the next tick.
    Live(T),
    /// Terminal. The timer is gone and the record will not change again.
    Settled(T),
    /// The backend no longer knows the id.
    Vanished,
    /// Last fetch failed. `last` is the record as previously seen, if any.
    Failed { last: Option<T>, message: String },
}

impl<T> WatchState<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            WatchState::Live(r) | WatchState::Settled(r) => Some(r),
            WatchState::Failed { last, .. } => last.as_ref(),
            WatchState::Loading | WatchState::Vanished => None,
        }
    }

    /// No further update will come.
    pub fn is_final(&self) -> bool {
        matches!(self, WatchState::Settled(_) | WatchState::Vanished)
    }
}

/// Follows a single task or character on its own timer until a terminal
/// status is observed, independently of any list that also shows it.
pub struct RecordWatch<T: Tracked> {
    state: watch::Receiver<WatchState<T>>,
    scope: ViewScope,
    done: bool,
}

impl<T: Tracked> RecordWatch<T> {
    pub fn start<S>(source: S, id: T::Id, cadence: Duration) -> Self
    where
        S: RecordSource<Item = T>,
    {
        let (tx, rx) = watch::channel(WatchState::Loading);
        let scope = ViewScope::new();
        let source = Arc::new(source);
        scope.spawn(follow(source, id, cadence, tx));
        Self {
            state: rx,
            scope,
            done: false,
        }
    }

    pub fn current(&self) -> WatchState<T> {
        self.state.borrow().clone()
    }

    /// Wait for the next state change. Returns `None` once the watch ended
    /// and no more changes will come.
    pub async fn changed(&mut self) -> Option<WatchState<T>> {
        if self.done {
            return None;
        }
        self.state.changed().await.ok()?;
        let state = self.state.borrow_and_update().clone();
        self.done = state.is_final();
        Some(state)
    }

    /// Wait until the record settles or vanishes.
    pub async fn finished(&mut self) -> WatchState<T> {
        loop {
            let state = self.state.borrow_and_update().clone();
            if state.is_final() {
                self.done = true;
                return state;
            }
            if self.state.changed().await.is_err() {
                return self.state.borrow().clone();
            }
        }
    }

    pub fn stop(&self) {
        self.scope.cancel();
    }
}

async fn follow<S, T>(source: Arc<S>, id: T::Id, cadence: Duration, tx: watch::Sender<WatchState<T>>)
where
    S: RecordSource<Item = T>,
    T: Tracked,
{
    let mut held: Option<T> = None;
    let mut interval = time::interval(cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match source.fetch_record(&id).await {
            Ok(fresh) => {
                let record = match held.take() {
                    None => fresh,
                    Some(mut record) => {
                        if let Observation::Rejected(why) = record.observe(fresh) {
                            tracing::debug!(id = ?id, reason = ?why, "ignoring observation");
                        }
                        record
                    }
                };
                if record.is_terminal() {
                    tracing::debug!(id = ?id, "record settled, stopping its timer");
                    tx.send_replace(WatchState::Settled(record));
                    return;
                }
                tx.send_replace(WatchState::Live(record.clone()));
                held = Some(record);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(id = ?id, "record vanished");
                tx.send_replace(WatchState::Vanished);
                return;
            }
            Err(err) => {
                let auth = matches!(err, ConsoleError::Unauthorized | ConsoleError::NoSession);
                tx.send_replace(WatchState::Failed {
                    last: held.clone(),
                    message: err.user_message(Action::Load),
                });
                if auth {
                    return;
                }
                tracing::warn!(id = ?id, error = %err, "record poll failed, retrying on next tick");
            }
        }
    }
}
