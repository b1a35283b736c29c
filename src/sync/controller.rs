use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{self, MissedTickBehavior};

use super::view::{ApplyOutcome, ListView};
use super::{ListSource, Record, ViewScope};

type View<S> = ListView<<S as ListSource>::Filter, <S as ListSource>::Item>;
type Outcome<S> = ApplyOutcome<<<S as ListSource>::Item as Record>::Id>;

/// Copy of a list view handed to renderers.
#[derive(Debug, Clone)]
pub struct ListSnapshot<F, T> {
    pub filter: F,
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub error: Option<String>,
    pub loaded: bool,
    pub polling: bool,
}

/// A list view wired to its source, with an optional refresh timer.
///
/// The timer runs only while the current filter can still contain
/// non-terminal records, and is restarted whenever filter or page change.
/// Its fetches are sequential: a tick waits for the previous fetch to land.
/// Dropping the controller (or [`close`](Self::close)) aborts the timer and
/// whatever request it had in flight.
pub struct ListController<S: ListSource> {
    source: Arc<S>,
    view: Arc<Mutex<View<S>>>,
    updates: Arc<watch::Sender<u64>>,
    cadence: Duration,
    scope: ViewScope,
    poller: Mutex<Option<AbortHandle>>,
}

impl<S: ListSource> ListController<S> {
    pub fn new(source: S, filter: S::Filter, page_size: u32, cadence: Duration) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            source: Arc::new(source),
            view: Arc::new(Mutex::new(ListView::new(filter, page_size))),
            updates: Arc::new(tx),
            cadence,
            scope: ViewScope::new(),
            poller: Mutex::new(None),
        }
    }

    /// First load; also arms the poller when the filter calls for it.
    pub async fn open(&self) -> Outcome<S> {
        let outcome = self.refresh().await;
        self.restart_poller();
        outcome
    }

    pub async fn set_filter(&self, filter: S::Filter) -> Outcome<S> {
        let ticket = lock(&self.view).select_filter(filter);
        self.restart_poller();
        fetch_and_apply(&self.source, &self.view, &self.updates, ticket).await
    }

    pub async fn set_page(&self, page: u32) -> Outcome<S> {
        let ticket = lock(&self.view).select_page(page);
        self.restart_poller();
        fetch_and_apply(&self.source, &self.view, &self.updates, ticket).await
    }

    /// Re-fetch the current page, e.g. after a mutation the server confirmed
    /// or a 404 that says a record vanished.
    pub async fn refresh(&self) -> Outcome<S> {
        let ticket = lock(&self.view).refetch();
        fetch_and_apply(&self.source, &self.view, &self.updates, ticket).await
    }

    pub fn snapshot(&self) -> ListSnapshot<S::Filter, S::Item> {
        let polling = self.is_polling();
        let view = lock(&self.view);
        ListSnapshot {
            filter: view.filter().clone(),
            items: view.items().to_vec(),
            total: view.total(),
            page: view.page(),
            page_size: view.page_size(),
            total_pages: view.total_pages(),
            error: view.last_error().map(str::to_string),
            loaded: view.is_loaded(),
            polling,
        }
    }

    /// Bumped every time the view is replaced or records an error.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .map(|p| p.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Tear the view down: stop the timer and ignore anything in flight.
    pub fn close(&self) {
        self.scope.cancel();
        if let Ok(mut poller) = self.poller.lock() {
            *poller = None;
        }
        lock(&self.view).invalidate();
    }

    // Never hold `view` and `poller` at the same time.
    fn restart_poller(&self) {
        let polls = lock(&self.view).polls();
        let Ok(mut poller) = self.poller.lock() else {
            return;
        };
        if let Some(old) = poller.take() {
            old.abort();
        }
        if !polls {
            tracing::debug!("list filter has only terminal states, not polling");
            return;
        }

        let source = self.source.clone();
        let view = self.view.clone();
        let updates = self.updates.clone();
        let cadence = self.cadence;
        *poller = Some(self.scope.spawn(async move {
            let mut interval = time::interval(cadence);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the view was just loaded.
            interval.tick().await;
            loop {
                interval.tick().await;
                let ticket = lock(&view).refetch();
                if let ApplyOutcome::Failed { message } =
                    fetch_and_apply(&source, &view, &updates, ticket).await
                {
                    tracing::warn!(error = %message, "list poll failed, keeping previous rows");
                }
            }
        }));
    }
}

impl<S: ListSource> Drop for ListController<S> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn fetch_and_apply<S: ListSource>(
    source: &Arc<S>,
    view: &Arc<Mutex<View<S>>>,
    updates: &watch::Sender<u64>,
    ticket: super::FetchTicket<S::Filter>,
) -> Outcome<S> {
    let result = source.fetch_page(&ticket.filter, ticket.page).await;
    let outcome = lock(view).apply(&ticket, result);
    if !matches!(outcome, ApplyOutcome::Stale) {
        updates.send_modify(|n| *n += 1);
    }
    outcome
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned view only means a renderer panicked mid-read; the data is intact.
    m.lock().unwrap_or_else(|e| e.into_inner())
}
