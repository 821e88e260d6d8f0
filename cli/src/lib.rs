//! epicflow command line front end.

pub mod app;
pub mod commands;
pub mod http;
