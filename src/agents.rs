//! Client for the agent orchestration service.
//!
//! Covers the slice of the threads/runs REST surface the assistant needs:
//! create an agent definition with a single registered function tool, create
//! a conversation thread, post user messages, drive a run to its terminal
//! status (answering `requires_action` callbacks with locally produced tool
//! output), and read back the newest assistant message.

use crate::utils::find_char_boundary;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::time::Duration;

/// Name of the single function tool registered with the orchestrator.
pub const RETRIEVAL_TOOL_NAME: &str = "agentic_retrieval";

const API_VERSION: &str = "2025-05-01";

#[derive(Clone)]
pub struct AgentsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CreateAgentRequest<'a> {
    model: &'a str,
    name: &'a str,
    instructions: &'a str,
    tools: Vec<ToolDefinition<'a>>,
}

#[derive(Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    function: FunctionDefinition<'a>,
}

#[derive(Serialize)]
struct FunctionDefinition<'a> {
    name: &'a str,
    description: &'a str,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl RunError {
    /// Human-readable reason: "code: message", dropping whichever is empty.
    pub fn describe(&self) -> String {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => format!("{}: {}", self.code, self.message),
            (false, true) => self.code.clone(),
            (true, false) => self.message.clone(),
            (true, true) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
}

#[derive(Debug, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: CalledFunction,
}

#[derive(Debug, Deserialize)]
pub struct CalledFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Deserialize)]
struct TextValue {
    value: String,
}

// ── Client ───────────────────────────────────────────────────────────────

impl AgentsClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building the orchestration HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.endpoint, path))
            .query(&[("api-version", API_VERSION)])
            .bearer_auth(&self.api_key)
    }

    async fn send<T: DeserializeOwned>(req: reqwest::RequestBuilder, what: &str) -> Result<T> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("HTTP error while {what}"))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading the response while {what}"))?;
        if !status.is_success() {
            bail!(
                "agent service error {} while {}: {}",
                status,
                what,
                &body[..find_char_boundary(&body, 500)]
            );
        }
        serde_json::from_str(&body).with_context(|| {
            format!(
                "parsing the response while {what}: {}",
                &body[..find_char_boundary(&body, 500)]
            )
        })
    }

    /// Create the remote agent definition. Exactly one callable tool — the
    /// retrieval function — is registered; it takes no arguments because the
    /// query is supplied by the local turn context.
    pub async fn create_agent(&self, model: &str, name: &str, instructions: &str) -> Result<String> {
        let body = CreateAgentRequest {
            model,
            name,
            instructions,
            tools: vec![ToolDefinition {
                kind: "function",
                function: FunctionDefinition {
                    name: RETRIEVAL_TOOL_NAME,
                    description: "Searches text documents about Earth at night topics. \
                                  Returns text chunks with unique document IDs for citation.",
                    parameters: json!({
                        "type": "object",
                        "properties": {},
                        "required": [],
                    }),
                },
            }],
        };
        let created: Created = Self::send(
            self.request(reqwest::Method::POST, "assistants").json(&body),
            "creating the agent",
        )
        .await?;
        Ok(created.id)
    }

    pub async fn create_thread(&self) -> Result<String> {
        let created: Created = Self::send(
            self.request(reqwest::Method::POST, "threads").json(&json!({})),
            "creating the conversation thread",
        )
        .await?;
        Ok(created.id)
    }

    pub async fn create_message(&self, thread_id: &str, role: &str, content: &str) -> Result<()> {
        let _: Created = Self::send(
            self.request(reqwest::Method::POST, &format!("threads/{thread_id}/messages"))
                .json(&json!({ "role": role, "content": content })),
            "posting the user message",
        )
        .await?;
        Ok(())
    }

    /// Start a run with a mandatory call to the registered retrieval tool.
    pub async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let body = json!({
            "assistant_id": agent_id,
            "tool_choice": {
                "type": "function",
                "function": { "name": RETRIEVAL_TOOL_NAME },
            },
        });
        Self::send(
            self.request(reqwest::Method::POST, &format!("threads/{thread_id}/runs"))
                .json(&body),
            "starting the run",
        )
        .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        Self::send(
            self.request(
                reqwest::Method::GET,
                &format!("threads/{thread_id}/runs/{run_id}"),
            ),
            "polling the run",
        )
        .await
    }

    pub async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        Self::send(
            self.request(
                reqwest::Method::POST,
                &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            )
            .json(&json!({ "tool_outputs": outputs })),
            "submitting tool outputs",
        )
        .await
    }

    /// Drive a run until it reaches a terminal status.
    ///
    /// Each `requires_action` round invokes `tool` once per pending call and
    /// submits the outputs; `tool` is expected to always produce a string
    /// payload (the retrieval callback serializes its own errors). The poll
    /// budget bounds a run that never settles, so a hung remote call cannot
    /// hang the turn forever.
    pub async fn run_to_completion<F, Fut>(
        &self,
        thread_id: &str,
        agent_id: &str,
        mut tool: F,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Result<Run>
    where
        F: FnMut(ToolCall) -> Fut,
        Fut: Future<Output = String>,
    {
        let mut run = self.create_run(thread_id, agent_id).await?;
        let mut polls = 0u32;

        loop {
            match run.status {
                status if status.is_terminal() => return Ok(run),
                RunStatus::RequiresAction => {
                    let action = run
                        .required_action
                        .take()
                        .context("run requires action but listed no tool calls")?;
                    let mut outputs = Vec::with_capacity(action.submit_tool_outputs.tool_calls.len());
                    for call in action.submit_tool_outputs.tool_calls {
                        let tool_call_id = call.id.clone();
                        let output = tool(call).await;
                        outputs.push(ToolOutput {
                            tool_call_id,
                            output,
                        });
                    }
                    run = self.submit_tool_outputs(thread_id, &run.id, &outputs).await?;
                }
                RunStatus::Queued | RunStatus::InProgress => {
                    polls += 1;
                    if polls > max_polls {
                        bail!(
                            "run {} did not reach a terminal state after {} polls",
                            run.id,
                            max_polls
                        );
                    }
                    tokio::time::sleep(poll_interval).await;
                    run = self.get_run(thread_id, &run.id).await?;
                }
                RunStatus::Unknown => {
                    bail!("run {} reported an unrecognized status", run.id);
                }
                // is_terminal() above covers the remaining variants
                _ => unreachable!(),
            }
        }
    }

    /// Text of the newest assistant-authored message on the thread.
    pub async fn last_assistant_text(&self, thread_id: &str) -> Result<String> {
        let list: MessageList = Self::send(
            self.request(reqwest::Method::GET, &format!("threads/{thread_id}/messages"))
                .query(&[("order", "desc"), ("limit", "20")]),
            "reading the thread messages",
        )
        .await?;

        list.data
            .iter()
            .find(|m| m.role == "assistant")
            .and_then(|m| {
                m.content
                    .iter()
                    .find(|part| part.kind == "text")
                    .and_then(|part| part.text.as_ref())
                    .map(|t| t.value.clone())
            })
            .context("the run completed but no assistant message was found on the thread")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn client(url: &str) -> AgentsClient {
        AgentsClient::new(url, "test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_run_status_deserialization() {
        let status: RunStatus = serde_json::from_str("\"requires_action\"").unwrap();
        assert_eq!(status, RunStatus::RequiresAction);
        let status: RunStatus = serde_json::from_str("\"completed\"").unwrap();
        assert!(status.is_terminal());
        let status: RunStatus = serde_json::from_str("\"brand_new_status\"").unwrap();
        assert_eq!(status, RunStatus::Unknown);
    }

    #[test]
    fn test_run_error_describe() {
        let err = RunError {
            code: "rate_limited".to_string(),
            message: "Rate limit exceeded".to_string(),
        };
        assert_eq!(err.describe(), "rate_limited: Rate limit exceeded");

        let err = RunError {
            code: "rate_limited".to_string(),
            message: String::new(),
        };
        assert_eq!(err.describe(), "rate_limited");

        let err = RunError {
            code: String::new(),
            message: String::new(),
        };
        assert_eq!(err.describe(), "unknown error");
    }

    #[tokio::test]
    async fn test_create_thread_parses_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/threads")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": "thread_abc"}"#)
            .create_async()
            .await;

        let id = client(&server.url()).create_thread().await.unwrap();
        assert_eq!(id, "thread_abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_agent_registers_retrieval_tool() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/assistants")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJsonString(
                r#"{"tools": [{"type": "function", "function": {"name": "agentic_retrieval"}}]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id": "agent_1"}"#)
            .create_async()
            .await;

        let id = client(&server.url())
            .create_agent("gpt-4o", "Earth at Night AI Assistant", "instructions")
            .await
            .unwrap();
        assert_eq!(id, "agent_1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_to_completion_answers_tool_call() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/threads/t1/runs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{
                    "id": "run_1",
                    "status": "requires_action",
                    "required_action": {
                        "submit_tool_outputs": {
                            "tool_calls": [
                                {"id": "call_1", "function": {"name": "agentic_retrieval", "arguments": "{}"}}
                            ]
                        }
                    }
                }"#,
            )
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/threads/t1/runs/run_1/submit_tool_outputs")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJsonString(
                r#"{"tool_outputs": [{"tool_call_id": "call_1"}]}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id": "run_1", "status": "completed"}"#)
            .create_async()
            .await;

        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = invocations.clone();
        let run = client(&server.url())
            .run_to_completion(
                "t1",
                "agent_1",
                move |call: ToolCall| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(call.function.name, RETRIEVAL_TOOL_NAME);
                        r#"{"references": []}"#.to_string()
                    }
                },
                Duration::from_millis(1),
                10,
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_to_completion_returns_failed_run() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/threads/t1/runs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"id": "run_9", "status": "failed",
                    "last_error": {"code": "rate_limited", "message": "Rate limit exceeded"}}"#,
            )
            .create_async()
            .await;

        let run = client(&server.url())
            .run_to_completion(
                "t1",
                "agent_1",
                |_call: ToolCall| async { String::new() },
                Duration::from_millis(1),
                10,
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        let reason = run.last_error.unwrap().describe();
        assert!(reason.contains("rate_limited"));
    }

    #[tokio::test]
    async fn test_run_to_completion_poll_budget() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/threads/t1/runs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": "run_2", "status": "in_progress"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/threads/t1/runs/run_2")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": "run_2", "status": "in_progress"}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let err = client(&server.url())
            .run_to_completion(
                "t1",
                "agent_1",
                |_call: ToolCall| async { String::new() },
                Duration::from_millis(1),
                3,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("terminal state"));
    }

    #[tokio::test]
    async fn test_last_assistant_text_skips_user_messages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/threads/t1/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data": [
                    {"role": "user", "content": [{"type": "text", "text": {"value": "question"}}]},
                    {"role": "assistant", "content": [{"type": "text", "text": {"value": "the answer [doc_1]"}}]}
                ]}"#,
            )
            .create_async()
            .await;

        let text = client(&server.url()).last_assistant_text("t1").await.unwrap();
        assert_eq!(text, "the answer [doc_1]");
    }

    #[tokio::test]
    async fn test_server_error_includes_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/threads")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client(&server.url()).create_thread().await.unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("401"));
        assert!(text.contains("unauthorized"));
    }
}
