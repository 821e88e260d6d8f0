pub mod file;
pub mod http;

pub use file::FileTaskProvider;
pub use http::HttpTaskProvider;

use epicflow_core::api::ProviderEpic;

pub(crate) fn with_title_fallback(mut epic: ProviderEpic, epic_id: &str) -> ProviderEpic {
    if epic.epic_title.trim().is_empty() {
        epic.epic_title = epic_id.to_string();
    }
    epic
}
