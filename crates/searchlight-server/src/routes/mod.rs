//! HTTP routes.

pub mod health;
pub mod mcp;

pub use health::{HealthResponse, health_routes};
pub use mcp::{SESSION_ID_HEADER, delete_mcp, get_mcp, mcp_routes, post_mcp};
