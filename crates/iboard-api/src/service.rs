use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use iboard_db::{StoreError, VoteStore};
use iboard_types::models::MAX_IDEA_CHARS;
use iboard_types::{Idea, IdeaStats, VoteDirection};

use crate::error::ApiError;

/// Validates requests and drives the [`VoteStore`].
///
/// Votes are not idempotent: every successful `vote` call adds one. A client
/// that retries after a timeout may count the same click twice.
pub struct IdeaService {
    store: Arc<dyn VoteStore>,
    expose_details: bool,
}

impl IdeaService {
    pub fn new(store: Arc<dyn VoteStore>, expose_details: bool) -> Self {
        Self {
            store,
            expose_details,
        }
    }

    pub fn create(&self, text: &str) -> Result<Idea, ApiError> {
        let text = validate_text(text)?;

        let idea = self
            .store
            .insert(text)
            .map_err(|e| self.storage_error("create idea", e))?;

        info!("Created idea {}", idea.id);
        Ok(idea)
    }

    /// Atomically add one vote and return the row as the increment left it.
    /// Other voters may have moved the counters again by the time the
    /// caller displays it.
    pub fn vote(&self, raw_id: &str, direction: VoteDirection) -> Result<Idea, ApiError> {
        let id = parse_idea_id(raw_id)?;

        let idea = self
            .store
            .increment(id, direction)
            .map_err(|e| self.storage_error(direction.as_str(), e))?;

        info!(
            "{} on idea {}: upvotes={} downvotes={}",
            direction.as_str(),
            id,
            idea.upvotes,
            idea.downvotes
        );
        Ok(idea)
    }

    pub fn get(&self, raw_id: &str) -> Result<Idea, ApiError> {
        let id = parse_idea_id(raw_id)?;
        self.store
            .fetch(id)
            .map_err(|e| self.storage_error("fetch idea", e))
    }

    pub fn list(&self) -> Result<Vec<Idea>, ApiError> {
        self.store
            .fetch_all()
            .map_err(|e| self.storage_error("fetch ideas", e))
    }

    pub fn stats(&self) -> Result<IdeaStats, ApiError> {
        self.store
            .stats()
            .map_err(|e| self.storage_error("fetch statistics", e))
    }

    pub fn database_healthy(&self) -> bool {
        match self.store.ping() {
            Ok(()) => true,
            Err(e) => {
                error!("Database ping failed: {}", e);
                false
            }
        }
    }

    fn storage_error(&self, action: &str, err: StoreError) -> ApiError {
        match err {
            StoreError::NotFound => {
                warn!("Idea not found while trying to {}", action);
                ApiError::not_found("Idea not found")
            }
            other => {
                error!("Failed to {}: {}", action, other);
                let details = self.expose_details.then(|| other.to_string());
                ApiError::internal(format!("Failed to {}", action), details)
            }
        }
    }
}

/// Trim and enforce the 1..=280 character bound.
pub fn validate_text(text: &str) -> Result<&str, ApiError> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_IDEA_CHARS {
        warn!("Rejected idea text of {} characters", len);
        return Err(ApiError::validation(format!(
            "Idea text must be between 1 and {} characters",
            MAX_IDEA_CHARS
        )));
    }
    // SQLite's length() stops at NUL, so such text would trip the column CHECK
    if trimmed.chars().any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t')) {
        warn!("Rejected idea text with control characters");
        return Err(ApiError::validation(
            "Idea text must not contain control characters",
        ));
    }
    Ok(trimmed)
}

pub fn parse_idea_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.trim().parse::<Uuid>().map_err(|_| {
        warn!("Rejected malformed idea id '{}'", raw);
        ApiError::validation("Invalid idea ID format")
    })
}
