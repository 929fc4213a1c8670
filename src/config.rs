use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Application configuration, loaded from `earthnight.toml`.
///
/// These are presentation and tuning knobs only. Service endpoints and
/// credentials live in the environment — see [`ServiceSettings`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub enable_dashboard: bool,
    pub dashboard_port: u16,
    pub retrieval_top_k: usize,
    pub run_poll_interval_ms: u64,
    pub max_run_polls: u32,
    pub request_timeout_secs: u64,
    pub log_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enable_dashboard: false,
            dashboard_port: 8780,
            retrieval_top_k: 5,
            run_poll_interval_ms: 750,
            max_run_polls: 120,
            request_timeout_secs: 60,
            log_dir: "logs".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./earthnight.toml` -> `~/earthnight.toml` -> defaults.
    pub fn load() -> Self {
        let candidates = Self::config_paths();
        for path in &candidates {
            if let Ok(contents) = fs::read_to_string(path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("earthnight.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("earthnight.toml"));
        }
        paths
    }
}

const DEFAULT_GPT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-3-large";
const DEFAULT_SEARCH_INDEX: &str = "txt_files_index";
const DEFAULT_SEARCH_AGENT: &str = "txt-files-agent";
const DEFAULT_STORAGE_CONTAINER: &str = "earthdata";

/// Remote service settings, sourced from the environment.
///
/// Endpoints and credentials are required and fail fast with a message
/// naming the missing variable. Display-only values fall back to the
/// deployment defaults.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub project_endpoint: String,
    pub project_api_key: String,
    pub search_endpoint: String,
    pub openai_endpoint: String,
    pub openai_key: String,
    pub managed_identity_client_id: Option<String>,
    pub gpt_deployment: String,
    pub embedding_deployment: String,
    pub search_index: String,
    pub search_agent_name: String,
    pub storage_container: String,
}

impl ServiceSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an injected lookup, so tests never have to
    /// mutate the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} is not set, required to initialize the assistant"))
        };
        let defaulted =
            |key: &str, fallback: &str| get(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| fallback.to_string());

        Ok(Self {
            project_endpoint: required("PROJECT_ENDPOINT")?,
            project_api_key: required("PROJECT_API_KEY")?,
            search_endpoint: required("AZURE_SEARCH_ENDPOINT")?,
            openai_endpoint: required("AZURE_OPENAI_ENDPOINT")?,
            openai_key: required("AZURE_OPENAI_KEY")?,
            managed_identity_client_id: get("MANAGED_IDENTITY_CLIENT_ID"),
            gpt_deployment: defaulted("AZURE_OPENAI_GPT_DEPLOYMENT", DEFAULT_GPT_DEPLOYMENT),
            embedding_deployment: defaulted(
                "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
                DEFAULT_EMBEDDING_DEPLOYMENT,
            ),
            search_index: defaulted("TXT_SEARCH_INDEX", DEFAULT_SEARCH_INDEX),
            search_agent_name: defaulted("TXT_SEARCH_AGENT_NAME", DEFAULT_SEARCH_AGENT),
            storage_container: defaulted("TXT_STORAGE_CONTAINER_NAME", DEFAULT_STORAGE_CONTAINER),
        })
    }

    /// Key/value rows for the configuration panel. Credentials are omitted.
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Search Index", self.search_index.clone()),
            ("Agent Name", self.search_agent_name.clone()),
            ("GPT Model", self.gpt_deployment.clone()),
            ("Embedding Model", self.embedding_deployment.clone()),
            ("Container", self.storage_container.clone()),
            ("Project Endpoint", self.project_endpoint.clone()),
            ("Search Endpoint", self.search_endpoint.clone()),
        ]
    }
}
