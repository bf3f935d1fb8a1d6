use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use toasttalk_sandbox::CodeRunner;
use toasttalk_traits::{
    CollaboratorError, Coordinate, FixedLocation, FnTool, Journey, Leg, Line, RouteSearch, Stop,
    ToolError, ToolOutput, ToolRegistry, TransitRouteResolver, TransitStop, UnavailableLocation,
};

use super::*;
use crate::agent::stream::{ChannelSink, ConversationEvent, NullSink};
use crate::llm::{MockLlmClient, MockStep, Role};
use crate::tools::{TRANSIT_ROUTE_TOOL, TransitRouteTool};

#[derive(Default)]
struct RecordingSink {
    chunks: Vec<String>,
    observed: Vec<ToolCallRecord>,
    executed: Vec<(String, String, bool)>,
    code: Vec<ExecutionResult>,
    notices: Vec<String>,
}

#[async_trait]
impl ConversationSink for RecordingSink {
    async fn on_chunk(&mut self, text: &str) {
        self.chunks.push(text.to_string());
    }

    async fn on_tool_call_observed(&mut self, record: &ToolCallRecord) {
        self.observed.push(record.clone());
    }

    async fn on_tool_executed(&mut self, id: &str, summary: &str, success: bool) {
        self.executed
            .push((id.to_string(), summary.to_string(), success));
    }

    async fn on_code_executed(&mut self, result: &ExecutionResult) {
        self.code.push(result.clone());
    }

    async fn on_notice(&mut self, notice: &str) {
        self.notices.push(notice.to_string());
    }
}

fn weather_tool() -> FnTool {
    FnTool::new(
        "get_weather",
        "Current weather for a city",
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }),
        |input| async move {
            let city = input["city"].as_str().unwrap_or_default().to_string();
            Ok(ToolOutput::success(json!({"city": city, "temp_c": 21})))
        },
    )
}

fn failing_tool() -> FnTool {
    FnTool::new("flaky", "Always fails", json!({"type": "object"}), |_| async {
        Err(ToolError::execution("upstream returned 503"))
    })
}

fn slow_tool() -> FnTool {
    FnTool::new("slow", "Sleeps", json!({"type": "object"}), |_| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(ToolOutput::success(json!({})))
    })
}

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(weather_tool());
    registry.register(failing_tool());
    registry.register(slow_tool());
    Arc::new(registry)
}

fn orchestrator(mock: &MockLlmClient, config: OrchestratorConfig) -> ConversationOrchestrator {
    ConversationOrchestrator::new(
        Arc::new(mock.clone()),
        registry(),
        Arc::new(CodeRunner::default()),
        config,
    )
}

fn tool_turn(history: &[Message]) -> &Message {
    history
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool turn present")
}

#[tokio::test]
async fn test_plain_text_reply() {
    let mock = MockLlmClient::from_steps("mock", vec![MockStep::text("Hello there, friend.")]);
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());
    let mut sink = RecordingSink::default();

    let outcome = orch.send("hi", &mut sink).await.unwrap();

    assert_eq!(outcome.final_text, "Hello there, friend.");
    assert_eq!(outcome.iterations, 1);
    assert_eq!(sink.chunks.concat(), "Hello there, friend.");
    assert!(sink.chunks.len() > 1);
    assert_eq!(orch.state(), ConversationState::Idle);

    let roles: Vec<Role> = orch.history().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_tool_call_then_answer() {
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_call("call_1", "get_weather", json!({"city": "Berlin"})),
            MockStep::text("It is 21 degrees in Berlin."),
        ],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());
    let mut sink = RecordingSink::default();

    let outcome = orch.send("weather in Berlin?", &mut sink).await.unwrap();

    assert_eq!(outcome.final_text, "It is 21 degrees in Berlin.");
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.tool_executions.len(), 1);
    assert!(outcome.tool_executions[0].success);
    assert_eq!(
        outcome.tool_executions[0].call.arguments,
        r#"{"city":"Berlin"}"#
    );

    // Opened with empty arguments, then again once complete.
    assert_eq!(sink.observed.len(), 2);
    assert_eq!(sink.observed[0].arguments, "");
    assert_eq!(sink.observed[1].arguments, r#"{"city":"Berlin"}"#);
    assert_eq!(sink.executed.len(), 1);
    assert_eq!(sink.executed[0].0, "call_1");
    assert!(sink.executed[0].2);

    let requests = mock.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 3);
    assert_eq!(requests[0].temperature, Some(0.7));
    assert_eq!(requests[0].max_tokens, Some(1000));

    let second = &requests[1].messages;
    let roles: Vec<Role> = second.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool]
    );
    let assistant = &second[2];
    assert_eq!(assistant.content, "");
    assert_eq!(assistant.tool_calls.as_ref().unwrap()[0].id, "call_1");
    let tool = &second[3];
    assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    let content: serde_json::Value = serde_json::from_str(&tool.content).unwrap();
    assert_eq!(content["temp_c"], 21);
}

#[tokio::test]
async fn test_parallel_tool_calls_run_in_index_order() {
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_calls(vec![
                ("a".into(), "get_weather".into(), json!({"city": "Oslo"})),
                ("b".into(), "get_weather".into(), json!({"city": "Rome"})),
            ]),
            MockStep::text("Done."),
        ],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());

    let outcome = orch.send("two cities", &mut NullSink).await.unwrap();

    let ids: Vec<&str> = outcome
        .tool_executions
        .iter()
        .map(|e| e.call.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    let tool_ids: Vec<Option<&str>> = orch
        .history()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(tool_ids, vec![Some("a"), Some("b")]);
}

#[tokio::test]
async fn test_failing_tool_reason_reaches_model() {
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_call("call_x", "flaky", json!({})),
            MockStep::text("Sorry, the service is down."),
        ],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());
    let mut sink = RecordingSink::default();

    let outcome = orch.send("try it", &mut sink).await.unwrap();

    assert_eq!(outcome.final_text, "Sorry, the service is down.");
    assert!(!outcome.tool_executions[0].success);
    let turn = tool_turn(orch.history());
    assert!(turn.content.starts_with("Error:"));
    assert!(turn.content.contains("upstream returned 503"));
    assert_eq!(sink.notices.len(), 1);
    assert!(sink.notices[0].contains("flaky"));
    assert!(!sink.executed[0].2);

    let requests = mock.requests().await;
    assert_eq!(requests.len(), 2);
    let reported = requests[1].messages.last().unwrap();
    assert_eq!(reported.role, Role::Tool);
    assert_eq!(reported.tool_call_id.as_deref(), Some("call_x"));
    assert!(reported.content.contains("upstream returned 503"));
}

#[tokio::test]
async fn test_invalid_arguments_become_tool_error() {
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_call_raw("call_bad", "get_weather", r#"{"city": "Ber"#),
            MockStep::text("Let me try again."),
        ],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());

    let outcome = orch.send("weather", &mut NullSink).await.unwrap();

    assert_eq!(outcome.tool_executions.len(), 1);
    let turn = tool_turn(orch.history());
    assert!(turn.content.contains("Invalid tool arguments"));
    assert_eq!(turn.tool_call_id.as_deref(), Some("call_bad"));
}

#[tokio::test]
async fn test_unknown_tool_becomes_tool_error() {
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_call("call_u", "teleport", json!({})),
            MockStep::text("I cannot do that."),
        ],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());

    orch.send("beam me up", &mut NullSink).await.unwrap();

    let turn = tool_turn(orch.history());
    assert_eq!(turn.content, "Error: Tool not found: teleport");
}

#[tokio::test]
async fn test_tool_timeout_becomes_tool_error() {
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_call("call_s", "slow", json!({})),
            MockStep::text("That took too long."),
        ],
    );
    let config = OrchestratorConfig::default().with_tool_timeout(Duration::from_millis(50));
    let mut orch = orchestrator(&mock, config);

    orch.send("go", &mut NullSink).await.unwrap();

    let turn = tool_turn(orch.history());
    assert!(turn.content.contains("timed out"));
}

#[tokio::test]
async fn test_loop_limit() {
    let steps = (0..5)
        .map(|i| MockStep::tool_call(format!("c{i}"), "get_weather", json!({"city": "Paris"})))
        .collect();
    let mock = MockLlmClient::from_steps("mock", steps);
    let config = OrchestratorConfig::default().with_max_turns(3);
    let mut orch = orchestrator(&mock, config);

    let err = orch.send("loop", &mut NullSink).await.unwrap_err();

    assert!(matches!(err, AiError::ConversationLoopLimitExceeded(3)));
    assert_eq!(mock.requests().await.len(), 3);
    assert_eq!(orch.state(), ConversationState::Idle);
}

#[tokio::test]
async fn test_transport_error_is_propagated() {
    let mock = MockLlmClient::from_steps("mock", vec![MockStep::error(401, "bad key")]);
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());

    let err = orch.send("hi", &mut NullSink).await.unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(err, AiError::Transport { status: 401, .. }));
}

#[tokio::test]
async fn test_stream_without_finish_still_runs_tool_calls() {
    let frames = vec![
        json!({"choices": [{"delta": {"tool_calls": [{
            "index": 0, "id": "call_f", "function": {"name": "get_weather", "arguments": "{\"city\":"}
        }]}}]})
        .to_string(),
        json!({"choices": [{"delta": {"tool_calls": [{
            "index": 0, "function": {"arguments": "\"Kyiv\"}"}
        }]}}]})
        .to_string(),
    ];
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![MockStep::frames(frames), MockStep::text("Mild.")],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());

    let outcome = orch.send("Kyiv?", &mut NullSink).await.unwrap();

    assert_eq!(outcome.tool_executions.len(), 1);
    assert!(outcome.tool_executions[0].success);
    assert_eq!(outcome.final_text, "Mild.");
}

#[cfg(unix)]
#[tokio::test]
async fn test_code_block_feedback_loop() {
    let reply = "Let me check.\n```run_bash\necho 6\n```\n";
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![MockStep::text(reply), MockStep::text("The answer is 6.")],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());
    let mut sink = RecordingSink::default();

    let outcome = orch.send("what is 2*3", &mut sink).await.unwrap();

    assert_eq!(outcome.final_text, "The answer is 6.");
    assert_eq!(outcome.code_results.len(), 1);
    assert_eq!(outcome.code_results[0].stdout, "6");
    assert_eq!(sink.code.len(), 1);

    let requests = mock.requests().await;
    let feedback = requests[1].messages.last().unwrap();
    assert_eq!(feedback.role, Role::User);
    assert!(feedback.content.starts_with("Code execution results:"));
    assert!(feedback.content.contains("6"));
}

#[tokio::test]
async fn test_code_execution_can_be_disabled() {
    let reply = "```run_bash\necho 6\n```";
    let mock = MockLlmClient::from_steps("mock", vec![MockStep::text(reply)]);
    let config = OrchestratorConfig::default().with_code_execution(false);
    let mut orch = orchestrator(&mock, config);

    let outcome = orch.send("show me", &mut NullSink).await.unwrap();

    assert_eq!(outcome.final_text, reply);
    assert!(outcome.code_results.is_empty());
    assert_eq!(mock.requests().await.len(), 1);
}

#[tokio::test]
async fn test_cancel_rolls_back_to_user_turn() {
    let mock = MockLlmClient::from_steps("mock", vec![MockStep::hang()]);
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());
    let stop = orch.stop_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.cancel();
    });

    let err = orch.send("long question", &mut NullSink).await.unwrap_err();
    assert!(matches!(err, AiError::Cancelled));
    assert_eq!(orch.history().len(), 2);
    assert_eq!(orch.history()[1].role, Role::User);
    assert!(!orch.stop_handle().is_cancelled());

    // Fresh token: the next message goes through.
    let outcome = orch.send("again", &mut NullSink).await.unwrap();
    assert_eq!(outcome.final_text, "mock-echo: again");
}

#[tokio::test]
async fn test_cancel_during_tool_drops_dangling_calls() {
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![MockStep::tool_call("call_s", "slow", json!({}))],
    );
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());
    let stop = orch.stop_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.cancel();
    });

    let err = orch.send("go", &mut NullSink).await.unwrap_err();
    assert!(matches!(err, AiError::Cancelled));
    assert!(orch.history().iter().all(|m| m.tool_calls.is_none()));
}

#[tokio::test]
async fn test_reset_keeps_system_turn() {
    let mock = MockLlmClient::new("mock");
    let config = OrchestratorConfig::default().with_system_prompt("be brief");
    let mut orch = orchestrator(&mock, config);

    orch.send("one", &mut NullSink).await.unwrap();
    assert_eq!(orch.history().len(), 3);

    orch.reset();
    assert_eq!(orch.history().len(), 1);
    assert_eq!(orch.history()[0].role, Role::System);
    assert_eq!(orch.history()[0].content, "be brief");
}

#[tokio::test]
async fn test_run_conversation_processes_in_order() {
    let mock = MockLlmClient::new("mock");
    let mut orch = orchestrator(&mock, OrchestratorConfig::default());
    let (tx, rx) = mpsc::channel(8);
    let (event_tx, mut event_rx) = mpsc::channel(256);
    let mut sink = ChannelSink::new(event_tx);

    for utterance in ["first", "  ", "second"] {
        tx.send(utterance.to_string()).await.unwrap();
    }
    drop(tx);

    let answered = run_conversation(&mut orch, rx, &mut sink).await;
    drop(sink);

    assert_eq!(answered, 2);
    let mut text = String::new();
    while let Some(event) = event_rx.recv().await {
        if let ConversationEvent::Chunk(chunk) = event {
            text.push_str(&chunk);
        }
    }
    assert_eq!(text, "mock-echo: firstmock-echo: second");
}

struct OneRoute;

#[async_trait]
impl TransitRouteResolver for OneRoute {
    async fn search(
        &self,
        _from: Coordinate,
        _to: Coordinate,
        _results: usize,
    ) -> std::result::Result<RouteSearch, CollaboratorError> {
        let stop = |name: &str| TransitStop {
            id: name.to_lowercase(),
            name: name.to_string(),
            location: None,
            distance: Some(120.0),
        };
        Ok(RouteSearch {
            from_stop: stop("Alexanderplatz"),
            to_stop: stop("Zoo"),
            journeys: vec![Journey {
                legs: vec![Leg {
                    origin: Stop::default(),
                    destination: Stop::default(),
                    departure: Some("2025-09-02T08:00:00+02:00".into()),
                    arrival: Some("2025-09-02T08:20:00+02:00".into()),
                    line: Some(Line {
                        name: Some("S5".into()),
                        mode: Some("train".into()),
                    }),
                    walking: None,
                    distance: None,
                    stopovers: None,
                }],
                departure: None,
                arrival: None,
            }],
        })
    }
}

fn route_args() -> serde_json::Value {
    json!({
        "from_latitude": -999,
        "from_longitude": -999,
        "to_latitude": 52.507,
        "to_longitude": 13.332
    })
}

#[tokio::test]
async fn test_route_tool_presentation_and_summary() {
    let mut registry = ToolRegistry::new();
    registry.register(TransitRouteTool::new(
        Arc::new(FixedLocation(Coordinate::new(52.52, 13.41))),
        Arc::new(OneRoute),
    ));
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_call("call_r", TRANSIT_ROUTE_TOOL, route_args()),
            MockStep::text("Take the S5 at 08:00."),
        ],
    );
    let mut orch = ConversationOrchestrator::new(
        Arc::new(mock.clone()),
        Arc::new(registry),
        Arc::new(CodeRunner::default()),
        OrchestratorConfig::default(),
    );
    let mut sink = RecordingSink::default();

    let outcome = orch.send("how do I get to Zoo?", &mut sink).await.unwrap();

    assert_eq!(sink.executed[0].1, "found 1 routes");
    assert_eq!(outcome.presentations.len(), 1);
    let presentation = orch.last_presentation().unwrap();
    assert_eq!(presentation["from_stop"]["name"], "Alexanderplatz");
    // Only the simplified result enters the history.
    let turn = tool_turn(orch.history());
    assert!(!turn.content.contains("from_stop"));
}

#[tokio::test]
async fn test_route_tool_without_location_reports_failure() {
    let mut registry = ToolRegistry::new();
    registry.register(TransitRouteTool::new(
        Arc::new(UnavailableLocation),
        Arc::new(OneRoute),
    ));
    let mock = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::tool_call("call_r", TRANSIT_ROUTE_TOOL, route_args()),
            MockStep::text("I could not find your location."),
        ],
    );
    let mut orch = ConversationOrchestrator::new(
        Arc::new(mock),
        Arc::new(registry),
        Arc::new(CodeRunner::default()),
        OrchestratorConfig::default(),
    );

    orch.send("route home", &mut NullSink).await.unwrap();

    let turn = tool_turn(orch.history());
    assert!(turn.content.contains("current location"));
    assert!(orch.last_presentation().is_none());
}
