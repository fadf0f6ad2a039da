//! HTTP API: handlers, simulation endpoints and routing

pub mod handlers;
pub mod routes;
pub mod simulate;

pub use handlers::AppState;
pub use routes::build_router;
