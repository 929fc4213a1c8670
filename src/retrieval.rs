//! Client for the knowledge-agent retrieval service, plus the tool-callback
//! contract the orchestrator invokes during a run.

use crate::utils::find_char_boundary;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const API_VERSION: &str = "2025-05-01-preview";

#[derive(Clone)]
pub struct RetrievalClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    agent_name: String,
    index_name: String,
}

#[derive(Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    index_name: &'a str,
    top: usize,
}

/// Ranked, citable result set returned by the retrieval service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResponse {
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// One retrieved text chunk. `id` is the unique citation handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RetrievalClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        agent_name: &str,
        index_name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building the retrieval HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent_name: agent_name.to_string(),
            index_name: index_name.to_string(),
        })
    }

    /// Issue one retrieval request scoped by `query`, bounded to `top`
    /// results against the configured index.
    pub async fn retrieve(&self, query: &str, top: usize) -> Result<RetrievalResponse> {
        let url = format!("{}/agents/{}/retrieve", self.endpoint, self.agent_name);
        let body = RetrieveRequest {
            query,
            index_name: &self.index_name,
            top,
        };

        let resp = self
            .http
            .post(&url)
            .query(&[("api-version", API_VERSION)])
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("HTTP error while retrieving documents")?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("reading the retrieval response")?;
        if !status.is_success() {
            bail!(
                "retrieval service error {}: {}",
                status,
                &text[..find_char_boundary(&text, 500)]
            );
        }
        serde_json::from_str(&text).with_context(|| {
            format!(
                "parsing the retrieval response: {}",
                &text[..find_char_boundary(&text, 500)]
            )
        })
    }
}

/// The `agentic_retrieval` tool body.
///
/// Contract: always returns a serialized payload and never fails the run.
/// Without a pending query it returns an error payload; any retrieval
/// failure is likewise caught and serialized, letting the orchestrator
/// still produce an answer or an explicit "I don't know".
pub async fn run_retrieval_tool(
    client: &RetrievalClient,
    query: Option<&str>,
    top: usize,
) -> String {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return json!({ "error": "No query provided" }).to_string();
    };

    match client.retrieve(query, top).await {
        Ok(result) => serde_json::to_string(&result)
            .unwrap_or_else(|e| json!({ "error": format!("Retrieval failed: {e}") }).to_string()),
        Err(e) => json!({ "error": format!("Retrieval failed: {e:#}") }).to_string(),
    }
}
