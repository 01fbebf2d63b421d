//! Recommendation serving layer: HTTP routes, API-key gating, and the
//! application state wired at the composition point in `main`.

pub mod auth;
pub mod routes;
pub mod state;

pub use auth::ApiKeyAuth;
pub use state::{AppState, Coordinator};
