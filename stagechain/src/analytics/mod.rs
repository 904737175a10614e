//! Reference sales analytics pipeline.
//!
//! Five stages share one run state through these keys:
//!
//! | Key                   | Written by          | Read by                      |
//! |-----------------------|---------------------|------------------------------|
//! | `raw_data`            | `DataCollector`     | `Preprocessor`               |
//! | `processed_data`      | `Preprocessor`      | analysts, `Visualizer`       |
//! | `gemini_analysis`     | `GeminiAnalyst`     | `Visualizer` (optional)      |
//! | `openai_analysis`     | `OpenAIAnalyst`     | `Visualizer` (optional)      |
//! | `visualization_paths` | `Visualizer`        |                              |
//!
//! Model calls go through [`CompletionClient`]; the HTTP implementations are
//! behind the `llm` feature.

pub mod analyst;
pub mod client;
pub mod collector;
pub mod config;
pub mod preprocess;
#[cfg(feature = "llm")]
pub mod providers;
pub mod records;
pub mod report;

pub use analyst::AnalystStage;
pub use client::{ClientError, CompletionClient};
pub use collector::DataCollectorStage;
pub use config::AnalyticsConfig;
pub use preprocess::{PreprocessStats, PreprocessorStage};
#[cfg(feature = "llm")]
pub use providers::{GeminiClient, OpenAiClient};
pub use records::{sample_sales_data, write_sample_data, Record, SalesRow};
pub use report::ReportStage;

use crate::pipeline::Pipeline;
use std::sync::Arc;

/// Rows loaded from the source CSV.
pub const RAW_DATA: &str = "raw_data";
/// Cleaned rows.
pub const PROCESSED_DATA: &str = "processed_data";
/// Trend analysis text.
pub const GEMINI_ANALYSIS: &str = "gemini_analysis";
/// Anomaly analysis text.
pub const OPENAI_ANALYSIS: &str = "openai_analysis";
/// Paths of the rendered report files.
pub const VISUALIZATION_PATHS: &str = "visualization_paths";

/// Application name the analytics runner registers sessions under.
pub const APP_NAME: &str = "StagechainAnalytics";

type ClientResult = Result<Arc<dyn CompletionClient>, ClientError>;

#[cfg(feature = "llm")]
fn env_clients(config: &AnalyticsConfig) -> (ClientResult, ClientResult) {
    let gemini = GeminiClient::from_env(config).map(|c| Arc::new(c) as Arc<dyn CompletionClient>);
    let openai = OpenAiClient::from_env(config).map(|c| Arc::new(c) as Arc<dyn CompletionClient>);
    (gemini, openai)
}

#[cfg(not(feature = "llm"))]
fn env_clients(_config: &AnalyticsConfig) -> (ClientResult, ClientResult) {
    (Err(ClientError::Disabled), Err(ClientError::Disabled))
}

/// Builds the sales pipeline with clients keyed from the environment.
///
/// With `skip_analysis` the two analyst stages are left out and the report
/// uses its placeholder notes.
#[must_use]
pub fn sales_pipeline(config: &AnalyticsConfig, skip_analysis: bool) -> Pipeline {
    if skip_analysis {
        return sales_pipeline_with(config, None);
    }
    sales_pipeline_with(config, Some(env_clients(config)))
}

/// Builds the sales pipeline around the given trend and anomaly clients.
#[must_use]
pub fn sales_pipeline_with(
    config: &AnalyticsConfig,
    clients: Option<(ClientResult, ClientResult)>,
) -> Pipeline {
    let mut pipeline = Pipeline::new("sales_analytics")
        .stage(DataCollectorStage::new("DataCollector", &config.data_path))
        .stage(PreprocessorStage::new("Preprocessor"));

    if let Some((trends, anomalies)) = clients {
        pipeline = pipeline
            .stage(AnalystStage::trends("GeminiAnalyst", trends))
            .stage(AnalystStage::anomalies("OpenAIAnalyst", anomalies));
    }

    pipeline.stage(ReportStage::new("Visualizer", &config.results_dir))
}
