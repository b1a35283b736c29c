//! Client/server synchronization: paged list views, their pollers, and
//! per-record watches.
//!
//! Nothing is patched locally. A list re-fetch replaces the page it covers,
//! a record watch replaces the record it follows, and a response that
//! arrives after its view moved on (new filter, new page, teardown) is
//! dropped.

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;

use crate::errors::ConsoleError;
use crate::lifecycle::{Lifecycle, Observation};
use crate::models::{Account, ApiKey, Character, Group, ListFilter, Page, PageRequest, Task};

pub mod controller;
pub mod record;
pub mod scope;
pub mod snapshot;
pub mod view;

pub use controller::{ListController, ListSnapshot};
pub use record::{RecordWatch, WatchState};
pub use scope::ViewScope;
pub use snapshot::{SnapshotState, SnapshotWatch};
pub use view::{ApplyOutcome, FetchTicket, ListView};

/// A row of a list view.
pub trait Record: Clone + PartialEq + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    /// Settled records can no longer change server-side; a changed copy of
    /// one is not reported as a mutation.
    fn is_settled(&self) -> bool {
        false
    }
}

/// A record followed on its own until it reaches a terminal state.
pub trait Tracked: Record + Lifecycle {
    fn observe(&mut self, next: Self) -> Observation;
}

/// Something that serves pages of one resource.
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    type Filter: ListFilter;
    type Item: Record;

    async fn fetch_page(
        &self,
        filter: &Self::Filter,
        page: PageRequest,
    ) -> Result<Page<Self::Item>, ConsoleError>;
}

/// Something that serves single records by id.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    type Item: Tracked;

    async fn fetch_record(&self, id: &<Self::Item as Record>::Id) -> Result<Self::Item, ConsoleError>;
}

/// Something that serves one aggregate value (the dashboard).
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    type Snapshot: Clone + Send + Sync + 'static;

    async fn fetch_snapshot(&self) -> Result<Self::Snapshot, ConsoleError>;
}

impl Record for Account {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Group {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for ApiKey {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Task {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn is_settled(&self) -> bool {
        self.is_terminal()
    }
}

impl Record for Character {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn is_settled(&self) -> bool {
        self.is_terminal()
    }
}

impl Tracked for Task {
    fn observe(&mut self, next: Task) -> Observation {
        self.accept(next)
    }
}

impl Tracked for Character {
    fn observe(&mut self, next: Character) -> Observation {
        self.accept(next)
    }
}
