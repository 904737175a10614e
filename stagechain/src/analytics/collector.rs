//! Data collection stage.

use super::records::parse_csv;
use super::RAW_DATA;
use crate::context::SharedState;
use crate::core::Event;
use crate::errors::StageError;
use crate::stages::{EventStream, Stage};
use async_stream::stream;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Loads a CSV file into the `raw_data` key as an array of records.
#[derive(Debug, Clone)]
pub struct DataCollectorStage {
    name: String,
    path: PathBuf,
}

impl DataCollectorStage {
    /// Creates a collector reading `path`.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Returns the source path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn collect(&self, state: &mut SharedState) -> Result<usize, StageError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StageError::collaborator("source not found", self.path.display())
            } else {
                StageError::collaborator("Error during data collection", e)
            }
        })?;

        let records = parse_csv(&text)
            .map_err(|e| StageError::collaborator("Error during data collection", e))?;
        let rows = records.len();
        state.set_as(RAW_DATA, &records)?;
        Ok(rows)
    }
}

impl Stage for DataCollectorStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(stream! {
            tracing::info!(stage = %self.name, path = %self.path.display(), "Collecting data");

            match self.collect(state).await {
                Ok(rows) => {
                    yield Event::progress(
                        &self.name,
                        "Data collection complete. Raw data loaded and stored in state.",
                    )
                    .with_data(serde_json::json!({ "rows": rows }));
                }
                Err(err) => {
                    yield err.into_event(&self.name);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::records::write_sample_data;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_collects_csv_into_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        write_sample_data(&path).unwrap();
        let stage = DataCollectorStage::new("DataCollector", &path);
        let mut state = SharedState::new();

        let events: Vec<Event> = stage.execute(&mut state).collect().await;

        assert_eq!(events.len(), 1);
        assert!(!events[0].is_terminal());
        let raw = state.get(RAW_DATA).and_then(|v| v.as_array()).unwrap();
        assert_eq!(raw.len(), 6);
    }

    #[tokio::test]
    async fn test_missing_source_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let stage = DataCollectorStage::new("DataCollector", &path);
        let mut state = SharedState::new();

        let events: Vec<Event> = stage.execute(&mut state).collect().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(events[0].text().starts_with("source not found: "));
        assert!(!state.contains(RAW_DATA));
    }

    #[tokio::test]
    async fn test_malformed_csv_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2,3\n").unwrap();
        let stage = DataCollectorStage::new("DataCollector", &path);
        let mut state = SharedState::new();

        let events: Vec<Event> = stage.execute(&mut state).collect().await;

        assert!(events[0].is_terminal());
        assert!(events[0].text().starts_with("Error during data collection"));
    }
}
