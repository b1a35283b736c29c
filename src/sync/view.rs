use crate::errors::{Action, ConsoleError};
use crate::models::{ListFilter, Page, PageRequest};

use super::Record;

/// Request issued by a [`ListView`]. Only the ticket with the latest
/// generation may write to the view.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket<F> {
    pub generation: u64,
    pub filter: F,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome<Id> {
    /// The view moved on since the ticket was issued; nothing was touched.
    Stale,
    /// The page was replaced. `changed` lists ids that are new or differ
    /// from the previous copy, leaving out records that were already settled.
    Replaced { changed: Vec<Id> },
    /// The fetch failed. The previous rows stay visible next to the error.
    Failed { message: String },
}

/// State of one paged, filtered list. Pure bookkeeping: it issues tickets
/// and applies their results, the caller does the I/O.
#[derive(Debug, Clone)]
pub struct ListView<F, T> {
    filter: F,
    page: u32,
    page_size: u32,
    generation: u64,
    items: Vec<T>,
    total: u64,
    last_error: Option<String>,
    loaded: bool,
}

impl<F, T> ListView<F, T>
where
    F: ListFilter,
    T: Record,
{
    pub fn new(filter: F, page_size: u32) -> Self {
        Self {
            filter,
            page: 1,
            page_size: PageRequest::first(page_size).page_size,
            generation: 0,
            items: Vec::new(),
            total: 0,
            last_error: None,
            loaded: false,
        }
    }

    fn issue(&mut self) -> FetchTicket<F> {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
            filter: self.filter.clone(),
            page: PageRequest::new(self.page, self.page_size),
        }
    }

    /// New filter: back to page 1, and any fetch in flight becomes stale.
    pub fn select_filter(&mut self, filter: F) -> FetchTicket<F> {
        self.filter = filter;
        self.page = 1;
        self.issue()
    }

    pub fn select_page(&mut self, page: u32) -> FetchTicket<F> {
        self.page = page.max(1);
        self.issue()
    }

    /// Same filter and page again (poll tick, or after a confirmed mutation).
    pub fn refetch(&mut self) -> FetchTicket<F> {
        self.issue()
    }

    /// Drop every in-flight ticket without issuing a new one.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn apply(
        &mut self,
        ticket: &FetchTicket<F>,
        result: Result<Page<T>, ConsoleError>,
    ) -> ApplyOutcome<T::Id> {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale list response"
            );
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(page) => {
                let changed = page
                    .list
                    .iter()
                    .filter(|fresh| {
                        let id = fresh.id();
                        match self.items.iter().find(|held| held.id() == id) {
                            Some(held) => !held.is_settled() && held != *fresh,
                            None => true,
                        }
                    })
                    .map(Record::id)
                    .collect();

                self.items = page.list;
                self.total = page.total;
                self.last_error = None;
                self.loaded = true;
                ApplyOutcome::Replaced { changed }
            }
            Err(err) => {
                let message = err.user_message(Action::Load);
                self.last_error = Some(message.clone());
                ApplyOutcome::Failed { message }
            }
        }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u32 {
        self.total.div_ceil(self.page_size as u64) as u32
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether this view should keep a refresh timer running.
    pub fn polls(&self) -> bool {
        self.filter.polls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, TaskFilter, TaskKind, TaskStatus};

    fn task(id: &str, status: TaskStatus, progress: u8) -> Task {
        Task {
            id: id.into(),
            sora_task_id: String::new(),
            account_id: 1,
            kind: TaskKind::Video,
            model: "sora-2".into(),
            prompt: String::new(),
            status,
            progress,
            error_message: String::new(),
            image_url: String::new(),
            created_at: None,
            updated_at: None,
            completed_at: None,
        }
    }

    fn page(list: Vec<Task>) -> Page<Task> {
        Page {
            total: list.len() as u64,
            page: 1,
            page_size: 20,
            list,
        }
    }

    #[test]
    fn test_filter_change_resets_page_and_stales_inflight() {
        let mut view: ListView<TaskFilter, Task> = ListView::new(TaskFilter::default(), 20);
        let on_page_3 = view.select_page(3);
        assert_eq!(on_page_3.page.page, 3);

        let fresh = view.select_filter(TaskFilter {
            status: Some(TaskStatus::Failed),
            kind: None,
        });
        assert_eq!(fresh.page.page, 1);
        assert_eq!(view.page(), 1);

        let late = view.apply(&on_page_3, Ok(page(vec![task("old", TaskStatus::Queued, 0)])));
        assert_eq!(late, ApplyOutcome::Stale);
        assert!(view.items().is_empty());

        let applied = view.apply(&fresh, Ok(page(vec![task("t1", TaskStatus::Failed, 0)])));
        assert_eq!(applied, ApplyOutcome::Replaced { changed: vec!["t1".to_string()] });
    }

    #[test]
    fn test_refetch_replaces_whole_page() {
        let mut view: ListView<TaskFilter, Task> = ListView::new(TaskFilter::default(), 20);
        let t = view.refetch();
        view.apply(
            &t,
            Ok(page(vec![
                task("a", TaskStatus::InProgress, 10),
                task("b", TaskStatus::Queued, 0),
            ])),
        );

        let t = view.refetch();
        view.apply(&t, Ok(page(vec![task("a", TaskStatus::InProgress, 50)])));
        assert_eq!(view.items().len(), 1);
        assert_eq!(view.items()[0].progress, 50);
        assert_eq!(view.total(), 1);
    }

    #[test]
    fn test_settled_records_leave_the_mutation_set() {
        let mut view: ListView<TaskFilter, Task> = ListView::new(TaskFilter::default(), 20);
        let t = view.refetch();
        view.apply(&t, Ok(page(vec![task("a", TaskStatus::InProgress, 40)])));

        let t = view.refetch();
        let outcome = view.apply(&t, Ok(page(vec![task("a", TaskStatus::Completed, 100)])));
        assert_eq!(outcome, ApplyOutcome::Replaced { changed: vec!["a".to_string()] });

        let mut drifted = task("a", TaskStatus::Completed, 100);
        drifted.error_message = "late write".into();
        let t = view.refetch();
        let outcome = view.apply(&t, Ok(page(vec![drifted])));
        assert_eq!(outcome, ApplyOutcome::Replaced { changed: vec![] });
    }

    #[test]
    fn test_failed_fetch_keeps_stale_rows() {
        let mut view: ListView<TaskFilter, Task> = ListView::new(TaskFilter::default(), 20);
        let t = view.refetch();
        view.apply(&t, Ok(page(vec![task("a", TaskStatus::Queued, 0)])));

        let t = view.refetch();
        let outcome = view.apply(
            &t,
            Err(ConsoleError::Server {
                status: 500,
                message: String::new(),
            }),
        );
        assert_eq!(
            outcome,
            ApplyOutcome::Failed {
                message: "failed to load data".into()
            }
        );
        assert_eq!(view.items().len(), 1);
        assert_eq!(view.last_error(), Some("failed to load data"));
    }
}
