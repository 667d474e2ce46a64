//! HTTP surface: `/health` liveness probe and the `/ws` session endpoint

mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
