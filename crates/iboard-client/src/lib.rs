//! Client-side live synchronization for the idea board: an interval poller,
//! a snapshot differ that drives change highlights, and a local board that
//! applies the user's own actions optimistically.

pub mod api;
pub mod board;
pub mod changes;
pub mod error;
pub mod filters;
pub mod poller;
pub mod snapshot;

pub use api::{ApiClient, IdeaApi};
pub use board::{Board, LoadMode, Notification, NotificationKind, PendingCreate, PendingVote};
pub use changes::{ChangeDetector, ChangeKind, ChangeRecord, detect_changes};
pub use error::ClientError;
pub use filters::{IdeaFilter, SortOption};
pub use poller::{PollerConfig, PollerHandle, PollerState, spawn_poller};
pub use snapshot::Snapshot;
