use crate::analytics::{self, SampleData};

const NOT_CONFIGURED: &str = "Not configured";

/// Display-only configuration values shown on the dashboard. Unlike the
/// assistant session, missing values fall back to placeholder labels
/// instead of failing.
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub search_endpoint: String,
    pub gpt_deployment: String,
    pub embedding_deployment: String,
    pub search_index: String,
    pub agent_name: String,
    pub storage_container: String,
}

impl DisplaySettings {
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| get(key).unwrap_or_else(|| NOT_CONFIGURED.to_string());
        Self {
            search_endpoint: value("AZURE_SEARCH_ENDPOINT"),
            gpt_deployment: value("AZURE_OPENAI_GPT_DEPLOYMENT"),
            embedding_deployment: value("AZURE_OPENAI_EMBEDDING_DEPLOYMENT"),
            search_index: value("TXT_SEARCH_INDEX"),
            agent_name: value("TXT_SEARCH_AGENT_NAME"),
            storage_container: value("TXT_STORAGE_CONTAINER_NAME"),
        }
    }

    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Search Index", self.search_index.as_str()),
            ("Agent Name", self.agent_name.as_str()),
            ("Storage Container", self.storage_container.as_str()),
            ("GPT Deployment", self.gpt_deployment.as_str()),
            ("Embedding Model", self.embedding_deployment.as_str()),
            ("Search Endpoint", self.search_endpoint.as_str()),
        ]
    }
}

/// Shared state for the dashboard server: the fixed sample dataset plus
/// display settings. Read-only after construction.
pub struct DashboardState {
    pub data: SampleData,
    pub display: DisplaySettings,
}

impl DashboardState {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            data: analytics::sample_data(),
            display: DisplaySettings::from_lookup(get),
        }
    }
}
