pub mod factory;
pub mod http_client;
pub mod provider;
pub mod runtime;
