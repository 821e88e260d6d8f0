//! HTTP API over a single epic scheduler.

pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
pub(crate) mod tests_support;

pub use models::*;
pub use server::*;
pub use state::*;
