//! REST API for the hospital back office.
//!
//! Routes are nested under `/api/`. Protected routes pass through
//! Auth → Audit before reaching the handler; login, username checks and
//! health are public.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::ApiContext;
