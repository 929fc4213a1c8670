// Integration tests for the Earth at Night assistant

use earthnight::analytics;
use earthnight::config::{AppConfig, ServiceSettings};
use earthnight::history::Role;
use earthnight::session::{AssistantSession, ConnectionStatus, NOT_INITIALIZED_MSG};
use mockito::{Matcher, ServerGuard};

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.run_poll_interval_ms = 1;
    config.max_run_polls = 10;
    config
}

fn settings_for(server: &ServerGuard) -> ServiceSettings {
    let url = server.url();
    ServiceSettings::from_lookup(|key| match key {
        "PROJECT_ENDPOINT" => Some(url.clone()),
        "PROJECT_API_KEY" => Some("project-key".to_string()),
        "AZURE_SEARCH_ENDPOINT" => Some(url.clone()),
        "AZURE_OPENAI_ENDPOINT" => Some(url.clone()),
        "AZURE_OPENAI_KEY" => Some("openai-key".to_string()),
        _ => None,
    })
    .unwrap()
}

async fn mock_connect_endpoints(server: &mut ServerGuard) -> (mockito::Mock, mockito::Mock) {
    let agent = server
        .mock("POST", "/assistants")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": "agent_1"}"#)
        .expect(1)
        .create_async()
        .await;
    let thread = server
        .mock("POST", "/threads")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": "t1"}"#)
        .expect(1)
        .create_async()
        .await;
    (agent, thread)
}

#[tokio::test]
async fn test_connected_turn_with_retrieval_and_citation() {
    let mut server = mockito::Server::new_async().await;
    let (agent_mock, thread_mock) = mock_connect_endpoints(&mut server).await;

    server
        .mock("POST", "/threads/t1/messages")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": "msg_1"}"#)
        .create_async()
        .await;
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
    let retrieve_mock = server
        .mock("POST", "/agents/txt-files-agent/retrieve")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJsonString(
            r#"{"query": "What is bioluminescence?", "top": 5}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"references": [{"id": "doc_1", "content": "Plankton glow at night."}]}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/threads/t1/runs/run_1/submit_tool_outputs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": "run_1", "status": "completed"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/threads/t1/messages")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"data": [
                {"role": "assistant", "content": [{"type": "text", "text": {"value": "Bioluminescence is light made by living organisms [doc_1]."}}]},
                {"role": "user", "content": [{"type": "text", "text": {"value": "What is bioluminescence?"}}]}
            ]}"#,
        )
        .create_async()
        .await;

    let mut session = AssistantSession::new(&test_config());
    session.connect(settings_for(&server)).await.unwrap();
    assert!(session.status().is_connected());
    assert_eq!(session.thread_id(), Some("t1"));

    let answer = session.ask("What is bioluminescence?").await;
    assert!(answer.contains("[doc_1]"));

    // Exactly two history entries: user question then assistant answer
    let entries: Vec<_> = session.history().iter().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[0].content, "What is bioluminescence?");
    assert_eq!(entries[1].role, Role::Assistant);
    assert_eq!(entries[1].content, answer);

    // Agent and thread were created exactly once, retrieval exactly once
    agent_mock.assert_async().await;
    thread_mock.assert_async().await;
    retrieve_mock.assert_async().await;
}

#[tokio::test]
async fn test_failed_run_surfaces_reason_in_history() {
    let mut server = mockito::Server::new_async().await;
    mock_connect_endpoints(&mut server).await;

    server
        .mock("POST", "/threads/t1/messages")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": "msg_1"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/threads/t1/runs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"id": "run_1", "status": "failed",
                "last_error": {"code": "rate_limited", "message": "Rate limit exceeded"}}"#,
        )
        .create_async()
        .await;

    let mut session = AssistantSession::new(&test_config());
    session.connect(settings_for(&server)).await.unwrap();

    let answer = session.ask("What is bioluminescence?").await;
    assert!(answer.contains("Failed"));
    assert!(answer.contains("rate_limited"));

    // Session stays Connected, the user may simply ask again
    assert!(session.status().is_connected());

    let entries: Vec<_> = session.history().iter().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content, "What is bioluminescence?");
    assert_eq!(entries[1].content, answer);
}

#[tokio::test]
async fn test_connection_failure_sets_failed_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/assistants")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("backend exploded")
        .create_async()
        .await;

    let mut session = AssistantSession::new(&test_config());
    let err = session.connect(settings_for(&server)).await.unwrap_err();
    assert!(err.contains("500"));
    match session.status() {
        ConnectionStatus::Failed(reason) => assert!(reason.contains("agent definition")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_uninitialized_asks_never_connect() {
    let mut session = AssistantSession::new(&test_config());

    for i in 1..=3 {
        let answer = session.ask(&format!("question {i}")).await;
        assert_eq!(answer, NOT_INITIALIZED_MSG);
        assert_eq!(*session.status(), ConnectionStatus::Uninitialized);
        assert_eq!(session.history().len(), i * 2);
    }

    session.clear_history();
    assert!(session.history().is_empty());
    assert_eq!(*session.status(), ConnectionStatus::Uninitialized);
}

#[test]
fn test_dashboard_aggregates_invariants() {
    let data = analytics::sample_data();

    // Grouping by hour preserves the total count
    let hourly = analytics::hourly_counts(&data.queries);
    let total: usize = hourly.iter().map(|(_, n)| n).sum();
    assert_eq!(total, 5);

    // Topic percentages sum to 100% within rounding tolerance
    let shares = analytics::topic_shares(&data.topics);
    let sum: f64 = shares.iter().map(|s| s.percent).sum();
    assert!((sum - 100.0).abs() < 1e-6);

    // Histogram redistributes every sample
    let buckets = analytics::response_time_histogram(&data.queries, 10);
    let total: usize = buckets.iter().map(|b| b.count).sum();
    assert_eq!(total, data.queries.len());
}
