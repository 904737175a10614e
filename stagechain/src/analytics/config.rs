//! Configuration for the sales analytics pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the reference analytics stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// CSV file the collector reads.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Directory the report stage writes into.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Gemini model used by the trend analyst.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    /// Gemini API base URL.
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    /// OpenAI-compatible model used by the anomaly analyst.
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    /// Per-request timeout for model calls, in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: f64,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/sample_sales_data.csv")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_timeout() -> f64 {
    60.0
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            results_dir: default_results_dir(),
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

impl AnalyticsConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from defaults overlaid with environment
    /// variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Overlays values found by `lookup` onto this configuration.
    ///
    /// Recognized names: `STAGECHAIN_DATA_PATH`, `STAGECHAIN_RESULTS_DIR`,
    /// `GEMINI_MODEL`, `GEMINI_BASE_URL`, `OPENAI_MODEL`, `OPENAI_BASE_URL`,
    /// `STAGECHAIN_REQUEST_TIMEOUT`. Timeouts that are not positive finite
    /// numbers are ignored.
    #[must_use]
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("STAGECHAIN_DATA_PATH") {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STAGECHAIN_RESULTS_DIR") {
            self.results_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            self.gemini_model = v;
        }
        if let Some(v) = lookup("GEMINI_BASE_URL") {
            self.gemini_base_url = v;
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.openai_model = v;
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.openai_base_url = v;
        }
        if let Some(v) = lookup("STAGECHAIN_REQUEST_TIMEOUT")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
        {
            self.request_timeout_seconds = v;
        }
        self
    }

    /// Sets the data path.
    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Sets the results directory.
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }
}
