use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use iboard_types::models::MAX_IDEA_CHARS;
use iboard_types::{Idea, VoteDirection};

use crate::api::IdeaApi;
use crate::changes::{ChangeDetector, ChangeRecord};
use crate::error::ClientError;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// User-initiated; a failure is reported.
    Explicit,
    /// Background refresh; a failure is only logged.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// A vote that was sent (or is about to be) but not yet answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingVote {
    pub id: Uuid,
    pub direction: VoteDirection,
    applied: bool,
    generation: u64,
}

/// A locally shown idea waiting for the server to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCreate {
    pub temp_id: Uuid,
    pub text: String,
}

/// The client replica of the board.
///
/// Every change to the replica is routed through a [`ChangeDetector`], so
/// local edits animate immediately and a poll that only confirms them emits
/// nothing.
pub struct Board<A> {
    api: Arc<A>,
    detector: ChangeDetector,
    notifications: Vec<Notification>,
    // Bumped on every applied poll
    generation: u64,
}

impl<A: IdeaApi> Board<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            detector: ChangeDetector::new(),
            notifications: Vec::new(),
            generation: 0,
        }
    }

    pub fn ideas(&self) -> &[Idea] {
        self.detector.snapshot().ideas()
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.detector.snapshot()
    }

    pub fn change_for(&self, id: Uuid, now: Instant) -> Option<&ChangeRecord> {
        self.detector.change_for(id, now)
    }

    pub fn active_changes(&self, now: Instant) -> &[ChangeRecord] {
        self.detector.active(now)
    }

    pub fn clear_expired(&mut self, now: Instant) {
        self.detector.clear_expired(now);
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Fetch the full list and apply it. A silent load that fails keeps the
    /// last good replica and returns no records.
    pub async fn load(&mut self, mode: LoadMode) -> Result<Vec<ChangeRecord>, ClientError> {
        match self.api.fetch_all().await {
            Ok(ideas) => Ok(self.apply_snapshot(Snapshot::new(ideas))),
            Err(e) => match mode {
                LoadMode::Explicit => {
                    warn!("Failed to load ideas: {}", e);
                    self.notifications.push(Notification::error(e.user_message()));
                    Err(e)
                }
                LoadMode::Silent => {
                    warn!("Silent refresh failed: {}", e);
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Replace the replica with a server snapshot. Server counts win over any
    /// local optimistic value.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Vec<ChangeRecord> {
        self.generation += 1;
        self.detector.observe(snapshot, Instant::now())
    }

    /// Show the vote locally before the server has answered.
    pub fn begin_vote(&mut self, id: Uuid, direction: VoteDirection) -> PendingVote {
        let applied = match self.snapshot().with_vote(id, direction) {
            Some(next) => {
                self.detector.observe(next, Instant::now());
                true
            }
            None => {
                debug!("Vote on {} not in the local board, sending without preview", id);
                false
            }
        };

        PendingVote {
            id,
            direction,
            applied,
            generation: self.generation,
        }
    }

    /// On failure, take the local vote back (unless a poll has since replaced
    /// the counts) and report the error.
    pub fn settle_vote(
        &mut self,
        pending: PendingVote,
        result: Result<Idea, ClientError>,
    ) -> Result<Idea, ClientError> {
        match result {
            Ok(idea) => {
                info!("{} confirmed for {}", pending.direction.as_str(), idea.id);
                Ok(idea)
            }
            Err(e) => {
                warn!("Failed to {} idea {}: {}", pending.direction.as_str(), pending.id, e);
                if pending.applied && pending.generation == self.generation {
                    if let Some(reverted) =
                        self.snapshot().with_vote_reverted(pending.id, pending.direction)
                    {
                        self.detector.rebase(reverted);
                        self.detector.retract(pending.id);
                    }
                }
                self.notifications.push(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    pub async fn vote(&mut self, id: Uuid, direction: VoteDirection) -> Result<Idea, ClientError> {
        let pending = self.begin_vote(id, direction);
        let result = self.api.vote(id, direction).await;
        self.settle_vote(pending, result)
    }

    /// Validate `text` and show it at the top of the board under a temporary
    /// id. Invalid text is reported without touching the board.
    pub fn begin_create(&mut self, text: &str) -> Result<PendingCreate, ClientError> {
        let text = text.trim();
        let chars = text.chars().count();
        if chars == 0 || chars > MAX_IDEA_CHARS {
            let e = ClientError::Validation {
                message: format!("Idea text must be between 1 and {} characters", MAX_IDEA_CHARS),
            };
            self.notifications.push(Notification::error(e.user_message()));
            return Err(e);
        }

        let now = Utc::now();
        let draft = Idea {
            id: Uuid::new_v4(),
            text: text.to_string(),
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        let pending = PendingCreate {
            temp_id: draft.id,
            text: draft.text.clone(),
        };

        let next = self.snapshot().with_prepended(draft);
        self.detector.observe(next, Instant::now());
        Ok(pending)
    }

    /// Swap the draft for the confirmed idea, or drop it on failure.
    pub fn settle_create(
        &mut self,
        pending: PendingCreate,
        result: Result<Idea, ClientError>,
    ) -> Result<Idea, ClientError> {
        match result {
            Ok(idea) => {
                let current = self.snapshot();
                let next = if current.contains(pending.temp_id) {
                    current.with_replaced(pending.temp_id, idea.clone())
                } else if !current.contains(idea.id) {
                    Some(current.with_prepended(idea.clone()))
                } else {
                    None
                };
                if let Some(next) = next {
                    self.detector.rebase(next);
                }
                // The draft already announced this post; a poll that saw the
                // row before this response may have flagged it again
                self.detector.retract(idea.id);
                self.detector.retract(pending.temp_id);

                info!("Idea {} posted", idea.id);
                self.notifications
                    .push(Notification::success("Your idea has been posted successfully."));
                Ok(idea)
            }
            Err(e) => {
                warn!("Failed to create idea: {}", e);
                let next = self.snapshot().without(pending.temp_id);
                self.detector.rebase(next);
                self.detector.retract(pending.temp_id);
                self.notifications.push(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    pub async fn create(&mut self, text: &str) -> Result<Idea, ClientError> {
        let pending = self.begin_create(text)?;
        let result = self.api.create(&pending.text).await;
        self.settle_create(pending, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::changes::ChangeKind;
    use crate::snapshot::tests::idea;

    async fn loaded(api: &Arc<FakeApi>) -> Board<FakeApi> {
        let mut board = Board::new(Arc::clone(api));
        board.load(LoadMode::Explicit).await.unwrap();
        board
    }

    #[tokio::test]
    async fn first_load_marks_everything_new() {
        let api = Arc::new(FakeApi::new());
        api.seed(idea("a", 0, 0));
        api.seed(idea("b", 1, 0));

        let mut board = Board::new(Arc::clone(&api));
        let records = board.load(LoadMode::Explicit).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind == ChangeKind::New));
        assert_eq!(board.ideas().len(), 2);
    }

    #[tokio::test]
    async fn explicit_load_failure_is_reported_silent_is_not() {
        let api = Arc::new(FakeApi::new());
        api.seed(idea("a", 0, 0));
        let mut board = loaded(&api).await;

        api.set_failing(true);
        assert!(board.load(LoadMode::Silent).await.unwrap().is_empty());
        assert!(board.take_notifications().is_empty());
        assert_eq!(board.ideas().len(), 1);

        assert!(board.load(LoadMode::Explicit).await.is_err());
        let notes = board.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
        assert_eq!(
            notes[0].message,
            "Server is temporarily unavailable. Please try again later."
        );
        assert_eq!(board.ideas().len(), 1);
    }

    #[tokio::test]
    async fn vote_animates_at_once_and_confirming_poll_is_quiet() {
        let api = Arc::new(FakeApi::new());
        let a = idea("a", 0, 0);
        api.seed(a.clone());
        let mut board = loaded(&api).await;

        let pending = board.begin_vote(a.id, VoteDirection::Up);
        let now = Instant::now();
        let record = board.change_for(a.id, now).unwrap();
        assert_eq!(record.kind, ChangeKind::VoteUp);
        assert_eq!(record.new_score, Some(1));

        let result = api.vote(a.id, VoteDirection::Up).await;
        board.settle_vote(pending, result).unwrap();

        let records = board.load(LoadMode::Silent).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(board.snapshot().get(a.id).unwrap().score(), 1);
    }

    #[tokio::test]
    async fn poll_counts_replace_local_counts() {
        let api = Arc::new(FakeApi::new());
        let a = idea("a", 0, 0);
        api.seed(a.clone());
        let mut board = loaded(&api).await;

        board.vote(a.id, VoteDirection::Up).await.unwrap();
        // Two more votes land from elsewhere
        api.vote(a.id, VoteDirection::Up).await.unwrap();
        api.vote(a.id, VoteDirection::Up).await.unwrap();

        let records = board.load(LoadMode::Silent).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].previous_score, Some(1));
        assert_eq!(records[0].new_score, Some(3));
        assert_eq!(board.snapshot().get(a.id).unwrap().upvotes, 3);
    }

    #[tokio::test]
    async fn failed_vote_rolls_back_and_notifies() {
        let api = Arc::new(FakeApi::new());
        let a = idea("a", 2, 0);
        api.seed(a.clone());
        let mut board = loaded(&api).await;

        api.set_failing(true);
        assert!(board.vote(a.id, VoteDirection::Up).await.is_err());
        assert_eq!(board.snapshot().get(a.id).unwrap().score(), 2);
        assert!(board.change_for(a.id, Instant::now()).is_none());
        assert_eq!(board.take_notifications()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn failed_vote_after_a_poll_keeps_the_poll_counts() {
        let api = Arc::new(FakeApi::new());
        let a = idea("a", 0, 0);
        api.seed(a.clone());
        let mut board = loaded(&api).await;

        let pending = board.begin_vote(a.id, VoteDirection::Up);
        api.vote(a.id, VoteDirection::Up).await.unwrap();
        board.load(LoadMode::Silent).await.unwrap();

        let err = ClientError::from_status(429, None);
        assert!(board.settle_vote(pending, Err(err)).is_err());
        assert_eq!(board.snapshot().get(a.id).unwrap().upvotes, 1);
        assert_eq!(
            board.take_notifications()[0].message,
            "Too many requests. Please wait a moment before trying again."
        );
    }

    #[tokio::test]
    async fn vote_on_unknown_idea_reports_not_found() {
        let api = Arc::new(FakeApi::new());
        let mut board = loaded(&api).await;

        let err = board.vote(Uuid::new_v4(), VoteDirection::Up).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert!(board.ideas().is_empty());
    }

    #[tokio::test]
    async fn create_swaps_draft_for_confirmed_idea() {
        let api = Arc::new(FakeApi::new());
        let mut board = loaded(&api).await;

        let pending = board.begin_create("  free lunch fridays ").unwrap();
        assert_eq!(board.ideas()[0].id, pending.temp_id);
        assert_eq!(board.ideas()[0].text, "free lunch fridays");
        assert_eq!(
            board.change_for(pending.temp_id, Instant::now()).unwrap().kind,
            ChangeKind::New
        );

        let result = api.create(&pending.text).await;
        let confirmed = board.settle_create(pending.clone(), result).unwrap();
        assert_eq!(board.ideas().len(), 1);
        assert_eq!(board.ideas()[0].id, confirmed.id);
        assert!(!board.snapshot().contains(pending.temp_id));

        // The poll carries the same id, so nothing new is reported
        assert!(board.load(LoadMode::Silent).await.unwrap().is_empty());
        assert_eq!(
            board.take_notifications(),
            vec![Notification::success("Your idea has been posted successfully.")]
        );
    }

    #[tokio::test]
    async fn create_confirmed_after_a_poll_is_not_duplicated() {
        let api = Arc::new(FakeApi::new());
        let mut board = loaded(&api).await;

        let pending = board.begin_create("standing desks").unwrap();
        let result = api.create(&pending.text).await;
        let confirmed = result.as_ref().unwrap().clone();

        // A poll lands before the create response is handled
        let records = board.load(LoadMode::Silent).await.unwrap();
        assert!(!board.snapshot().contains(pending.temp_id));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, confirmed.id);

        board.settle_create(pending.clone(), result).unwrap();
        assert_eq!(board.ideas().len(), 1);
        assert_eq!(board.ideas()[0].id, confirmed.id);

        let now = Instant::now();
        assert!(board.change_for(confirmed.id, now).is_none());
        assert!(board.change_for(pending.temp_id, now).is_none());
        assert!(board.load(LoadMode::Silent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_text_never_reaches_the_board() {
        let api = Arc::new(FakeApi::new());
        let mut board = loaded(&api).await;

        assert!(matches!(
            board.create("   ").await,
            Err(ClientError::Validation { .. })
        ));
        assert!(board.create(&"x".repeat(281)).await.is_err());
        assert!(board.ideas().is_empty());
        assert!(api.ideas.lock().unwrap().is_empty());
        assert_eq!(board.take_notifications().len(), 2);
    }

    #[tokio::test]
    async fn failed_create_removes_the_draft() {
        let api = Arc::new(FakeApi::new());
        let mut board = loaded(&api).await;

        api.set_failing(true);
        assert!(board.create("more coffee").await.is_err());
        assert!(board.ideas().is_empty());
        assert!(board.active_changes(Instant::now()).is_empty());
        let notes = board.take_notifications();
        assert_eq!(notes[0].kind, NotificationKind::Error);
    }
}
