//! Language-model analysis stage.

use super::client::{ClientError, CompletionClient};
use super::{GEMINI_ANALYSIS, OPENAI_ANALYSIS, PROCESSED_DATA};
use crate::context::SharedState;
use crate::core::Event;
use crate::errors::StageError;
use crate::stages::{EventStream, Stage};
use async_stream::stream;
use std::fmt;
use std::sync::Arc;

/// Placeholder replaced by the JSON-encoded table in a prompt template.
pub const DATA_PLACEHOLDER: &str = "{data}";

const TREND_PROMPT: &str = "You are an expert data analyst.
Analyze the following sales data, provided in JSON format, to identify key trends.
Focus specifically on:
1. Monthly revenue changes: Describe any significant increases or decreases.
2. Top-performing products: Identify products with high revenue or sales volume.
Provide a concise, bullet-pointed summary of your findings.

Sales Data:
{data}

Your Analysis:
";

const ANOMALY_PROMPT: &str = "You are a meticulous data auditor.
Based on the following sales data (in JSON format), identify potential anomalies or outliers.
Consider unusual spikes or dips in units sold or revenue that deviate from general patterns.
Explain any unusual patterns you detect in a brief, clear manner.

Sales Data:
{data}

Anomaly Report:
";

/// Sends `processed_data` to a language model and stores the answer.
///
/// The client is resolved when the stage is built. If that failed, the stage
/// still joins the pipeline but stops the run on its first invocation.
pub struct AnalystStage {
    name: String,
    label: String,
    output_key: String,
    template: String,
    client: Result<Arc<dyn CompletionClient>, String>,
}

impl AnalystStage {
    /// Creates an analyst.
    ///
    /// `template` must contain [`DATA_PLACEHOLDER`]; the label names the
    /// analysis in event text.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        output_key: impl Into<String>,
        template: impl Into<String>,
        client: Result<Arc<dyn CompletionClient>, ClientError>,
    ) -> Self {
        let name = name.into();
        let client = client.map_err(|e| {
            tracing::warn!(stage = %name, error = %e, "Completion client unavailable");
            e.to_string()
        });

        Self {
            name,
            label: label.into(),
            output_key: output_key.into(),
            template: template.into(),
            client,
        }
    }

    /// Trend analyst writing `gemini_analysis`.
    #[must_use]
    pub fn trends(
        name: impl Into<String>,
        client: Result<Arc<dyn CompletionClient>, ClientError>,
    ) -> Self {
        Self::new(name, "Gemini", GEMINI_ANALYSIS, TREND_PROMPT, client)
    }

    /// Anomaly auditor writing `openai_analysis`.
    #[must_use]
    pub fn anomalies(
        name: impl Into<String>,
        client: Result<Arc<dyn CompletionClient>, ClientError>,
    ) -> Self {
        Self::new(name, "OpenAI", OPENAI_ANALYSIS, ANOMALY_PROMPT, client)
    }

    /// Returns the state key this stage writes.
    #[must_use]
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// Builds the prompt for a JSON-encoded table.
    #[must_use]
    pub fn prompt(&self, data: &str) -> String {
        self.template.replace(DATA_PLACEHOLDER, data)
    }

    async fn analyze(&self, state: &mut SharedState) -> Result<usize, StageError> {
        let client = self.client.as_ref().map_err(|reason| {
            StageError::configuration(format!("{} model not initialized: {reason}", self.label))
        })?;

        let data = state.require(PROCESSED_DATA)?.to_string();
        let prompt = self.prompt(&data);

        tracing::info!(stage = %self.name, client = %client.describe(), "Requesting analysis");
        let mut text = client
            .complete(&prompt)
            .await
            .map_err(|e| StageError::collaborator(format!("Error during {} analysis", self.label), e))?;

        if text.trim().is_empty() {
            text = format!("{} analysis did not return text.", self.label);
        }

        let chars = text.chars().count();
        state.set(self.output_key.clone(), serde_json::Value::String(text));
        Ok(chars)
    }
}

impl fmt::Debug for AnalystStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalystStage")
            .field("name", &self.name)
            .field("output_key", &self.output_key)
            .field("configured", &self.client.is_ok())
            .finish()
    }
}

impl Stage for AnalystStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(stream! {
            match self.analyze(state).await {
                Ok(chars) => {
                    yield Event::progress(
                        &self.name,
                        format!("{} analysis complete. Insights stored.", self.label),
                    )
                    .with_data(serde_json::json!({ "key": self.output_key, "chars": chars }));
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
    use crate::analytics::client::MockCompletionClient;
    use futures::StreamExt;
    use serde_json::json;

    fn mock_returning(result: Result<String, ClientError>) -> Arc<dyn CompletionClient> {
        let mut mock = MockCompletionClient::new();
        mock.expect_describe().return_const("mock".to_string());
        mock.expect_complete()
            .times(1)
            .returning(move |_| result.clone());
        Arc::new(mock)
    }

    fn state_with_data() -> SharedState {
        let mut state = SharedState::new();
        state.set(PROCESSED_DATA, json!([{"Revenue": 10}]));
        state
    }

    async fn run(stage: &AnalystStage, state: &mut SharedState) -> Vec<Event> {
        stage.execute(state).collect().await
    }

    #[tokio::test]
    async fn test_stores_analysis() {
        let stage = AnalystStage::trends("GeminiAnalyst", Ok(mock_returning(Ok("- up".to_string()))));
        let mut state = state_with_data();

        let events = run(&stage, &mut state).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text(), "Gemini analysis complete. Insights stored.");
        assert_eq!(state.get(GEMINI_ANALYSIS), Some(&json!("- up")));
    }

    #[tokio::test]
    async fn test_prompt_embeds_data() {
        let mut mock = MockCompletionClient::new();
        mock.expect_describe().return_const("mock".to_string());
        mock.expect_complete()
            .withf(|prompt: &str| prompt.contains(r#"[{"Revenue":10}]"#) && prompt.contains("anomalies"))
            .times(1)
            .returning(|_| Ok("none".to_string()));
        let stage = AnalystStage::anomalies("OpenAIAnalyst", Ok(Arc::new(mock)));
        let mut state = state_with_data();

        run(&stage, &mut state).await;

        assert_eq!(state.get(OPENAI_ANALYSIS), Some(&json!("none")));
    }

    #[tokio::test]
    async fn test_empty_answer_gets_placeholder() {
        let stage = AnalystStage::trends("GeminiAnalyst", Ok(mock_returning(Ok("  ".to_string()))));
        let mut state = state_with_data();

        run(&stage, &mut state).await;

        assert_eq!(
            state.get(GEMINI_ANALYSIS),
            Some(&json!("Gemini analysis did not return text."))
        );
    }

    #[tokio::test]
    async fn test_client_failure_is_terminal() {
        let stage = AnalystStage::anomalies(
            "OpenAIAnalyst",
            Ok(mock_returning(Err(ClientError::Status {
                status: 429,
                body: "slow down".to_string(),
            }))),
        );
        let mut state = state_with_data();

        let events = run(&stage, &mut state).await;

        assert!(events[0].is_terminal());
        assert_eq!(
            events[0].text(),
            "Error during OpenAI analysis: endpoint returned status 429: slow down"
        );
        assert!(!state.contains(OPENAI_ANALYSIS));
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_terminal() {
        let stage = AnalystStage::trends(
            "GeminiAnalyst",
            Err(ClientError::MissingApiKey("GOOGLE_API_KEY")),
        );
        let mut state = state_with_data();

        let events = run(&stage, &mut state).await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(events[0].text().contains("GOOGLE_API_KEY environment variable not set"));
        assert!(format!("{stage:?}").contains("configured: false"));
    }

    #[tokio::test]
    async fn test_missing_processed_data_is_terminal() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().never();
        let stage = AnalystStage::trends("GeminiAnalyst", Ok(Arc::new(mock)));
        let mut state = SharedState::new();

        let events = run(&stage, &mut state).await;

        assert_eq!(events[0].text(), format!("missing dependency: {PROCESSED_DATA}"));
    }
}
