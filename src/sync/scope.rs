use std::future::Future;
use std::sync::Mutex;

use tokio::task::AbortHandle;

/// Lifetime of one view's background work. Every task spawned through it is
/// aborted when the scope is cancelled or dropped, whatever it was awaiting.
#[derive(Default)]
pub struct ViewScope {
    tasks: Mutex<Vec<AbortHandle>>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, fut: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut).abort_handle();
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(handle.clone());
        }
        handle
    }

    /// Abort everything spawned so far. The scope stays usable.
    pub fn cancel(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }

    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.cancel();
    }
}
