//! End-to-end scenario tests exercising the real `TurnLoop` + `Scheduler` +
//! `EventBus` together, one per literal walkthrough.

use std::sync::Arc;

use orchestra_core::config::{ApprovalMode, ConcurrencyLimits, LoopDetectionThresholds};
use orchestra_core::event_bus::{Event, EventBus, EventBusObserver, SessionState};
use orchestra_core::scheduler::{Outcome, Scheduler};
use orchestra_core::tools::builtin::{BashTool, EditTool, ReadFileTool, ThinkTool};
use orchestra_core::tools::{Capabilities, ToolRegistry};
use orchestra_core::turn::{FinishReason, ReplayModelStream, StreamEvent, TurnLoop, TurnOutcome};
use orchestra_tools::{ToolCall, ToolResult};

fn scheduler_with(
    dir: &std::path::Path,
    mode: ApprovalMode,
    tools: Vec<Arc<dyn orchestra_core::tools::ErasedTool>>,
    bus: Arc<EventBus>,
) -> Arc<Scheduler> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register_builtin(tool);
    }
    Arc::new(Scheduler::new(
        Arc::new(registry),
        dir.to_path_buf(),
        Capabilities::all(),
        mode,
        ConcurrencyLimits::default(),
        Arc::new(EventBusObserver::new(bus)),
    ))
}

fn turn_loop(scheduler: Arc<Scheduler>, bus: Arc<EventBus>) -> TurnLoop {
    TurnLoop::with_default_fallback(scheduler, bus, LoopDetectionThresholds::default(), "test-model")
}

/// Scenario 1: single edit, approved. state-change(working) ->
/// tool-call-confirmation(edit) -> state-change(input-required, final)
/// before approval. `confirm` itself now drives the call straight to
/// Executing (the scheduler's observer publishes every transition in real
/// time, spec §4.2), so those updates land on the bus before `resume` even
/// runs; `resume` then publishes its own working/final bracket once that
/// settles: tool-call-update(Scheduled) -> tool-call-update(Executing) ->
/// state-change(working) -> tool-call-update(Success) -> content ->
/// state-change(input-required, final). File ends up `bar`.
#[tokio::test]
async fn single_edit_approved_matches_the_literal_event_sequence() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "foo").unwrap();

    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe();
    let scheduler = scheduler_with(dir.path(), ApprovalMode::Default, vec![Arc::new(EditTool)], bus.clone());
    let mut turn = turn_loop(scheduler.clone(), bus);

    let call = ToolCall::new("1", "edit_file", serde_json::json!({"path": "a.txt", "old_string": "foo", "new_string": "bar"}));
    let mut stream = ReplayModelStream::new(vec![
        StreamEvent::ToolCallRequest(vec![call]),
        StreamEvent::Content("done".to_string()),
        StreamEvent::Finished(FinishReason::Stop),
    ]);

    let outcome = turn.submit("rename foo to bar in a.txt", &mut stream).await.unwrap();
    assert_eq!(outcome, TurnOutcome::AwaitingApproval);

    assert!(matches!(rx.recv().await, Event::StateChange { state: SessionState::Working, r#final: false, .. }));
    assert!(matches!(rx.recv().await, Event::ToolCallConfirmation { .. }));
    assert!(matches!(rx.recv().await, Event::StateChange { state: SessionState::InputRequired, r#final: true, .. }));

    let call_id = scheduler.snapshot().await[0].call_id.clone();
    scheduler.confirm(call_id, Outcome::ProceedOnce).await.unwrap();

    // `confirm` resolves only after the actor has synchronously moved the
    // call through Scheduled -> Executing and spawned its execution, so both
    // updates are already on the bus before `resume` runs.
    assert!(matches!(rx.recv().await, Event::ToolCallUpdate { .. })); // Scheduled
    assert!(matches!(rx.recv().await, Event::ToolCallUpdate { .. })); // Executing

    let outcome = turn.resume(&mut stream).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);

    assert!(matches!(rx.recv().await, Event::StateChange { state: SessionState::Working, r#final: false, .. }));
    assert!(matches!(rx.recv().await, Event::ToolCallUpdate { .. })); // Success
    assert!(matches!(rx.recv().await, Event::Content { text, .. } if text == "done"));
    assert!(matches!(rx.recv().await, Event::StateChange { state: SessionState::InputRequired, r#final: true, .. }));

    assert_eq!(std::fs::read_to_string(&file).unwrap(), "bar");
}

/// Scenario 3: YOLO mode, two independent reads in one batch run without
/// pausing, and a single quiescence gate sits between scheduling and
/// resubmission.
#[tokio::test]
async fn yolo_mode_runs_a_parallel_read_batch_without_pausing() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("x.txt"), "x-contents").unwrap();
    std::fs::write(dir.path().join("y.txt"), "y-contents").unwrap();

    let bus = Arc::new(EventBus::new());
    let scheduler = scheduler_with(dir.path(), ApprovalMode::Yolo, vec![Arc::new(ReadFileTool)], bus.clone());
    let mut turn = turn_loop(scheduler, bus);

    let calls = vec![
        ToolCall::new("1", "read_file", serde_json::json!({"path": "x.txt"})),
        ToolCall::new("2", "read_file", serde_json::json!({"path": "y.txt"})),
    ];
    let mut stream = ReplayModelStream::new(vec![
        StreamEvent::ToolCallRequest(calls),
        StreamEvent::Finished(FinishReason::Stop),
    ]);

    let outcome = turn.submit("read both files", &mut stream).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(stream.submitted.len(), 1);
    assert_eq!(stream.submitted[0].len(), 2);
    for (_, result) in &stream.submitted[0] {
        assert!(matches!(result, ToolResult::Read(_)));
    }
}

/// Scenario 4: a long-running shell command is cancelled mid-execution.
/// `Scheduler::cancel_all` (what a `UserCancelled` stream event drives) is
/// called directly, concurrently with the batch still `Executing`, and the
/// turn must settle well within the command's own sleep duration rather
/// than waiting it out.
#[tokio::test]
async fn cancellation_mid_execution_stops_the_turn_promptly() {
    let dir = tempfile::TempDir::new().unwrap();
    let bus = Arc::new(EventBus::new());
    let scheduler = scheduler_with(dir.path(), ApprovalMode::Yolo, vec![Arc::new(BashTool)], bus.clone());
    let mut turn = turn_loop(scheduler.clone(), bus);

    let call = ToolCall::new("1", "bash", serde_json::json!({"command": "sleep 30"}));
    let mut stream = ReplayModelStream::new(vec![
        StreamEvent::ToolCallRequest(vec![call]),
        StreamEvent::Content("cancelled that for you".to_string()),
        StreamEvent::Finished(FinishReason::Stop),
    ]);

    let cancel_scheduler = scheduler.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel_scheduler.cancel_all("user cancelled").await;
    });

    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), turn.submit("run a long command", &mut stream))
        .await
        .expect("turn did not settle promptly after cancellation")
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(stream.submitted.len(), 1);
    assert!(matches!(&stream.submitted[0][0].1, ToolResult::Error(_)));
}

/// Scenario 5: six identical tool calls in editing context trip the loop
/// detector well before the model would otherwise exhaust round trips.
#[tokio::test]
async fn repeated_identical_calls_in_editing_context_trip_the_loop_detector() {
    let dir = tempfile::TempDir::new().unwrap();
    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe();
    let scheduler = scheduler_with(dir.path(), ApprovalMode::Yolo, vec![Arc::new(ThinkTool)], bus.clone());
    let mut turn = turn_loop(scheduler, bus);

    let events: Vec<StreamEvent> = (0..6)
        .map(|_| StreamEvent::ToolCallRequest(vec![ToolCall::new("1", "think", serde_json::json!({"thought": "same"}))]))
        .collect();
    let mut stream = ReplayModelStream::new(events);

    let outcome = turn.submit("@a.txt keep trying the same thing", &mut stream).await.unwrap();
    assert_eq!(outcome, TurnOutcome::LoopDetected);

    // The working state and at least one failed-state event should have
    // been published; the last one is final.
    let mut last = rx.recv().await;
    loop {
        match rx.recv().await {
            ev @ Event::StateChange { r#final: true, .. } => {
                last = ev;
                break;
            }
            ev => last = ev,
        }
    }
    assert!(matches!(last, Event::StateChange { state: SessionState::Failed, r#final: true, .. }));
}
