use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use epicflow_core::api::{ProviderEpic, TaskProvider};

use super::with_title_fallback;

/// Reads an epic's children from a JSON document shaped like the HTTP
/// provider's response.
pub struct FileTaskProvider {
    path: PathBuf,
}

impl FileTaskProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TaskProvider for FileTaskProvider {
    fn name(&self) -> &str {
        "file_task_provider"
    }

    async fn fetch_children(&self, epic_id: &str) -> Result<ProviderEpic> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read {} failed", self.path.display()))?;
        let epic: ProviderEpic = serde_json::from_str(&raw)
            .with_context(|| format!("parse {} failed", self.path.display()))?;
        tracing::debug!(
            target: "epicflow.provider",
            epic_id = %epic_id,
            path = %self.path.display(),
            children = epic.children.len(),
            "loaded epic from file"
        );
        Ok(with_title_fallback(epic, epic_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_children_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"epicTitle":"Billing","children":[
                {{"id":"a","title":"A","priority":2,"status":"closed"}},
                {{"id":"b","title":"B","priority":0,"status":"open","blockedBy":["a"],"assignee":"sam"}}
            ]}}"#
        )
        .unwrap();

        let provider = FileTaskProvider::new(file.path());
        let epic = provider.fetch_children("epic-1").await.unwrap();
        assert_eq!(epic.epic_title, "Billing");
        assert_eq!(epic.children.len(), 2);
        assert_eq!(epic.children[0].status, "closed");
        assert_eq!(epic.children[1].assignee.as_deref(), Some("sam"));
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let provider = FileTaskProvider::new("/nonexistent/epic.json");
        let err = provider.fetch_children("e").await.unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/epic.json"));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let provider = FileTaskProvider::new(file.path());
        let err = provider.fetch_children("e").await.unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
