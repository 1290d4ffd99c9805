//! API layer - admission control, probes and admin endpoints

pub mod admin;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;

pub use middleware::{Principal, RequireAdmin};
pub use router::{create_router, create_router_with_state, merge_routes};
pub use state::AppState;
