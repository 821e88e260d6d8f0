pub mod api;
pub mod config;
pub mod epic;
pub mod error;
pub mod events;
pub mod traits;
