//! The assistant session: one logical conversation with the remote
//! retrieval-augmented agent, exposed to the UI as a minimal ask/answer
//! surface that never raises.

use crate::agents::{AgentsClient, RunStatus, ToolCall, RETRIEVAL_TOOL_NAME};
use crate::config::{AppConfig, ServiceSettings};
use crate::history::{ChatEntry, ChatHistory, Role};
use crate::retrieval::{run_retrieval_tool, RetrievalClient};
use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;

/// Fixed reply for any `ask` on a session that is not connected.
pub const NOT_INITIALIZED_MSG: &str =
    "Error: Agent not initialized. Please check connection.";

const AGENT_DISPLAY_NAME: &str = "Earth at Night AI Assistant";

const AGENT_INSTRUCTIONS: &str = "\
A Q&A agent specializing in Earth at night topics including:
- Nighttime satellite imagery and observations
- Urban lighting patterns and light pollution
- Nocturnal ecosystems and wildlife
- Disaster monitoring using night imagery
- Human activity patterns visible from space
- Climate monitoring and urban heat island effects
- Bioluminescence in marine environments

Sources are text documents that have been processed into chunks. Each source \
has an 'id' field that must be cited in your answer using the format [id]. \
When referencing information, always cite the source using the document ID. \
If you do not have the answer in the provided sources, respond with \"I don't know\".

Be comprehensive in your answers and cite multiple relevant sources when available.";

/// Connection state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Uninitialized,
    Connected,
    Failed(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Status text for the UI indicator.
    pub fn describe(&self) -> String {
        match self {
            Self::Uninitialized => "Disconnected".to_string(),
            Self::Connected => "Connected".to_string(),
            Self::Failed(reason) => format!("Error: {reason}"),
        }
    }
}

/// Whether an answer string is a degraded failure reply rather than a real
/// assistant answer. Used for session metrics only.
pub fn is_failure_text(answer: &str) -> bool {
    answer.starts_with("Failed:") || answer.starts_with("Error:")
}

pub struct AssistantSession {
    status: ConnectionStatus,
    settings: Option<ServiceSettings>,
    agents: Option<AgentsClient>,
    retrieval: Option<RetrievalClient>,
    agent_id: Option<String>,
    thread_id: Option<String>,
    history: ChatHistory,
    top_k: usize,
    poll_interval: Duration,
    max_polls: u32,
    request_timeout: Duration,
}

impl AssistantSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            status: ConnectionStatus::Uninitialized,
            settings: None,
            agents: None,
            retrieval: None,
            agent_id: None,
            thread_id: None,
            history: ChatHistory::new(),
            top_k: config.retrieval_top_k,
            poll_interval: Duration::from_millis(config.run_poll_interval_ms),
            max_polls: config.max_run_polls,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Clear the transcript. Connection status is untouched.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn settings(&self) -> Option<&ServiceSettings> {
        self.settings.as_ref()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Initialize from the process environment. On failure the reason is
    /// returned as text and recorded in the status; fixing the environment
    /// and re-initializing recovers.
    pub async fn initialize(&mut self) -> Result<(), String> {
        self.initialize_from(|key| std::env::var(key).ok()).await
    }

    /// Initialize with an injected settings lookup (see
    /// [`ServiceSettings::from_lookup`]).
    pub async fn initialize_from<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match ServiceSettings::from_lookup(lookup) {
            Ok(settings) => self.connect(settings).await,
            Err(e) => {
                let reason = format!("{e:#}");
                self.status = ConnectionStatus::Failed(reason.clone());
                Err(reason)
            }
        }
    }

    /// Connect with already-resolved settings: build both remote clients,
    /// create the agent definition with its single registered tool, and
    /// create one conversation thread. A fresh connect always creates a
    /// brand-new agent and thread, discarding any prior references.
    pub async fn connect(&mut self, settings: ServiceSettings) -> Result<(), String> {
        match self.try_connect(settings).await {
            Ok(()) => {
                self.status = ConnectionStatus::Connected;
                Ok(())
            }
            Err(e) => {
                let reason = format!("{e:#}");
                self.status = ConnectionStatus::Failed(reason.clone());
                Err(reason)
            }
        }
    }

    async fn try_connect(&mut self, settings: ServiceSettings) -> Result<()> {
        let agents = AgentsClient::new(
            &settings.project_endpoint,
            &settings.project_api_key,
            self.request_timeout,
        )?;
        let retrieval = RetrievalClient::new(
            &settings.search_endpoint,
            &settings.openai_key,
            &settings.search_agent_name,
            &settings.search_index,
            self.request_timeout,
        )?;

        let agent_id = agents
            .create_agent(&settings.gpt_deployment, AGENT_DISPLAY_NAME, AGENT_INSTRUCTIONS)
            .await
            .context("creating the remote agent definition")?;
        let thread_id = agents
            .create_thread()
            .await
            .context("creating the conversation thread")?;

        self.agents = Some(agents);
        self.retrieval = Some(retrieval);
        self.agent_id = Some(agent_id);
        self.thread_id = Some(thread_id);
        self.settings = Some(settings);
        Ok(())
    }

    /// Ask one question. Always returns display text and always appends
    /// exactly two history entries: the question, then the answer or the
    /// failure text. Errors never propagate to the caller.
    pub async fn ask(&mut self, question: &str) -> String {
        self.history.append(ChatEntry::now(Role::User, question));

        let answer = if self.status.is_connected() {
            match self.run_turn(question).await {
                Ok(text) => text,
                Err(e) => format!("Error: {e:#}"),
            }
        } else {
            NOT_INITIALIZED_MSG.to_string()
        };

        self.history
            .append(ChatEntry::now(Role::Assistant, answer.clone()));
        answer
    }

    async fn run_turn(&self, question: &str) -> Result<String> {
        let agents = self.agents.as_ref().context("orchestration client missing")?;
        let thread_id = self.thread_id.as_deref().context("conversation thread missing")?;
        let agent_id = self.agent_id.as_deref().context("agent definition missing")?;
        let retrieval = self
            .retrieval
            .as_ref()
            .context("retrieval client missing")?
            .clone();

        agents.create_message(thread_id, "user", question).await?;

        // The query is passed by value into the per-turn tool executor, so
        // the callback can only ever see this turn's question.
        let top_k = self.top_k;
        let pending_query = question.to_string();
        let tool = move |call: ToolCall| {
            let retrieval = retrieval.clone();
            let query = pending_query.clone();
            async move {
                if call.function.name == RETRIEVAL_TOOL_NAME {
                    run_retrieval_tool(&retrieval, Some(&query), top_k).await
                } else {
                    json!({ "error": format!("Unknown tool: {}", call.function.name) }).to_string()
                }
            }
        };

        let run = agents
            .run_to_completion(thread_id, agent_id, tool, self.poll_interval, self.max_polls)
            .await?;

        match run.status {
            RunStatus::Completed => agents.last_assistant_text(thread_id).await,
            RunStatus::Failed => {
                let reason = run
                    .last_error
                    .map(|e| e.describe())
                    .unwrap_or_else(|| "unknown error".to_string());
                Ok(format!("Failed: {reason}"))
            }
            status => Ok(format!("Failed: run ended with status {status:?}")),
        }
    }
}
