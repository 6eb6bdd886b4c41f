use std::sync::Arc;
use std::time::Instant;

use tracing::error;

use crate::error::ApiError;
use crate::service::IdeaService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub ideas: IdeaService,
    pub environment: Environment,
    pub started_at: Instant,
}

impl AppStateInner {
    pub fn new(ideas: IdeaService, environment: Environment) -> AppState {
        Arc::new(Self {
            ideas,
            environment,
            started_at: Instant::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` is treated as development.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Whether storage error text may be echoed back in `details`.
    pub fn exposes_details(self) -> bool {
        self == Self::Development
    }
}

/// Run a store-bound closure off the async runtime.
pub async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&IdeaService) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.ideas))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("Internal server error", None)
        })?
}
