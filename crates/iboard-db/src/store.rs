use uuid::Uuid;

use iboard_types::{Idea, IdeaStats, VoteDirection};

use crate::StoreError;

/// Persistence contract for ideas and their vote counters.
///
/// `increment` must be a single indivisible storage operation. Implementors
/// never read a counter into the application and write it back, since two
/// concurrent read-then-write sequences lose an update.
pub trait VoteStore: Send + Sync {
    /// Insert a new idea with zero counters. The store assigns the id and
    /// both timestamps.
    fn insert(&self, text: &str) -> Result<Idea, StoreError>;

    /// Atomically add one to the counter selected by `direction` and return
    /// the row as written by that statement.
    fn increment(&self, id: Uuid, direction: VoteDirection) -> Result<Idea, StoreError>;

    fn fetch(&self, id: Uuid) -> Result<Idea, StoreError>;

    /// Every idea, newest first. Not paginated: the board is expected to fit
    /// in one response.
    fn fetch_all(&self) -> Result<Vec<Idea>, StoreError>;

    fn stats(&self) -> Result<IdeaStats, StoreError>;

    /// Cheap connectivity probe for health checks.
    fn ping(&self) -> Result<(), StoreError>;
}
