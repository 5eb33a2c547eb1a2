//! API module for the ragdesk HTTP server

pub mod middleware;
pub mod routes;
pub mod server;

pub use middleware::RateLimiter;
pub use server::{ApiServer, ApiServerConfig};
