pub mod error;
pub mod health;
pub mod ideas;
pub mod rate_limit;
pub mod routes;
pub mod service;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner, Environment};
