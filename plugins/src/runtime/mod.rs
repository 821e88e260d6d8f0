pub mod dry_run;
pub mod http;

pub use dry_run::DryRunAgentRuntime;
pub use http::HttpAgentRuntime;
