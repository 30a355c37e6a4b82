//! C3: the Turn Loop. Drives one user submission to completion: classify
//! the input, append it to history, pull model stream events, hand tool
//! call batches to [`crate::scheduler::Scheduler`] (itself a command-channel
//! actor), wait for quiescence, resubmit results, and repeat until the
//! model finishes or the turn aborts. Grounded on the teacher's
//! `session_actor.rs` `run_turn` loop; driven here as a plain async method
//! against the scheduler's handle rather than as its own actor, since
//! `TurnLoop` owns no mailbox callers need to reach concurrently — a single
//! `submit()` call already runs to completion before another may start.
//!
//! A batch that needs user approval pauses the turn outright (spec §8
//! scenario 1/2: the turn publishes a final `input-required` state and
//! returns `AwaitingApproval` before the model is ever re-invoked) rather
//! than resubmitting an empty or partial result set. The caller resolves
//! the pending call(s) through the same `Arc<Scheduler>` handle it was
//! constructed with, then calls [`TurnLoop::resume`] to pick the turn back
//! up once quiescence is reached for real.

pub mod classify;
pub mod history;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use orchestra_tools::{ToolCall, ToolResult};
use rand::Rng;

use crate::config::LoopDetectionThresholds;
use crate::error::{OrchestratorError, Result};
use crate::event_bus::{Event, EventBus, SessionState, StateChangeMetadata, Thought as BusThought};
use crate::ids::{PromptId, ToolCallId};
use crate::safety::fallback::{resolve_fallback, FallbackHandler, NeverFallback};
use crate::safety::loop_detect::{fingerprint, LoopDetector, OrchestratorState};
use crate::scheduler::{Scheduler, ToolCallStatus};

pub use classify::{classify, ClassifiedInput};
pub use history::{ConversationHistory, Role};
pub use stream::{FinishReason, ModelStream, ReplayModelStream, StreamError, StreamEvent};

/// Upper bound on model/tool round-trips within a single turn (spec §4.3
/// `MaxSessionTurns`), a backstop against a model that never emits
/// `Finished`.
const MAX_ROUND_TRIPS: usize = 100;

/// Retry/backoff policy for a `Retry` stream event (spec §4.3 ambient
/// addition): exponential backoff with jitter, capped at 3 attempts before
/// surfacing `StreamProtocolError`.
const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;
const RETRY_MULTIPLIER: u32 = 2;

/// Outcome of driving one turn to completion, for callers that need to
/// branch on how it ended without re-deriving it from published events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Cancelled,
    LoopDetected,
    MaxRoundTripsExceeded,
    Failed(String),
    /// A batch is sitting at `AwaitingApproval`/`AwaitingReconfirmation`;
    /// the turn is paused until the caller resolves it (via the shared
    /// `Scheduler` handle) and calls [`TurnLoop::resume`].
    AwaitingApproval,
}

/// A batch whose resolution the turn is waiting on, recorded so
/// [`TurnLoop::resume`] can pick the same round trip back up.
struct PendingBatch {
    prompt_id: PromptId,
    orchestrator_state: OrchestratorState,
    call_ids: Vec<ToolCallId>,
}

/// What came back from polling a scheduled batch to quiescence.
enum BatchCollection {
    /// At least one call in the batch is still `AwaitingApproval`/
    /// `AwaitingReconfirmation`.
    Pending,
    Resolved(Vec<(ToolCallId, ToolResult)>),
}

pub struct TurnLoop {
    scheduler: Arc<Scheduler>,
    bus: Arc<EventBus>,
    history: ConversationHistory,
    loop_detector: LoopDetector,
    fallback_handler: Arc<dyn FallbackHandler>,
    model_fallback: crate::config::ModelFallback,
    primary_model: String,
    pending: Option<PendingBatch>,
}

impl TurnLoop {
    pub fn new(
        scheduler: Arc<Scheduler>,
        bus: Arc<EventBus>,
        loop_thresholds: LoopDetectionThresholds,
        fallback_handler: Arc<dyn FallbackHandler>,
        model_fallback: crate::config::ModelFallback,
        primary_model: impl Into<String>,
    ) -> Self {
        Self {
            scheduler,
            bus,
            history: ConversationHistory::new(),
            loop_detector: LoopDetector::new(loop_thresholds),
            fallback_handler,
            model_fallback,
            primary_model: primary_model.into(),
            pending: None,
        }
    }

    pub fn with_default_fallback(
        scheduler: Arc<Scheduler>,
        bus: Arc<EventBus>,
        loop_thresholds: LoopDetectionThresholds,
        primary_model: impl Into<String>,
    ) -> Self {
        Self::new(
            scheduler,
            bus,
            loop_thresholds,
            Arc::new(NeverFallback),
            crate::config::ModelFallback::default(),
            primary_model,
        )
    }

    fn publish_state(&self, prompt_id: PromptId, state: SessionState, message: Option<String>, r#final: bool) {
        self.bus.publish(Event::StateChange {
            prompt_id,
            state,
            message,
            r#final,
            metadata: StateChangeMetadata { model: Some(self.primary_model.clone()), user_tier: None, error: None },
        });
    }

    /// Drive `raw_input` through one full turn against `stream` (spec
    /// §4.3). Tool calls proposed mid-stream are scheduled and their
    /// results are resubmitted to the stream before the next pull,
    /// repeating until `Finished`, a fatal stream event, a batch pauses on
    /// approval, or `MAX_ROUND_TRIPS` is reached.
    pub async fn submit(&mut self, raw_input: &str, stream: &mut dyn ModelStream) -> Result<TurnOutcome> {
        let prompt_id = PromptId::new();
        self.loop_detector.reset();

        tracing::debug!(target: "turn_loop", prompt_id = %prompt_id, "submitting turn");

        let classified = classify(raw_input);
        let (role_content, orchestrator_state) = match &classified {
            ClassifiedInput::ShellMode { command } => (command.clone(), OrchestratorState::Exploratory),
            ClassifiedInput::SlashCommand { name, rest } => (format!("/{name} {rest}"), OrchestratorState::Exploratory),
            ClassifiedInput::AtMention { path, rest } => (format!("@{path} {rest}"), OrchestratorState::Editing),
            ClassifiedInput::FreeForm(text) => (text.clone(), OrchestratorState::Exploratory),
        };
        self.history.append(Role::User, role_content);
        self.publish_state(prompt_id, SessionState::Working, None, false);

        self.drive(prompt_id, orchestrator_state, stream).await
    }

    /// Pick a turn back up after the caller has resolved a tool call batch
    /// that paused at `AwaitingApproval`/`AwaitingReconfirmation` (spec §8
    /// scenario 1's "After `confirm(call_id, ProceedOnce)`..."). Fails with
    /// [`OrchestratorError::NoPendingToolApproval`] if no batch is waiting.
    pub async fn resume(&mut self, stream: &mut dyn ModelStream) -> Result<TurnOutcome> {
        let pending = self.pending.take().ok_or(OrchestratorError::NoPendingToolApproval)?;
        self.publish_state(pending.prompt_id, SessionState::Working, None, false);

        match self.collect_batch_results(&pending.call_ids).await {
            BatchCollection::Pending => {
                self.publish_state(pending.prompt_id, SessionState::InputRequired, None, true);
                self.pending = Some(pending);
                Ok(TurnOutcome::AwaitingApproval)
            }
            BatchCollection::Resolved(results) => {
                stream.submit_tool_results(results).await;
                self.drive(pending.prompt_id, pending.orchestrator_state, stream).await
            }
        }
    }

    /// The per-round-trip pull/dispatch loop shared by [`Self::submit`] and
    /// [`Self::resume`].
    async fn drive(
        &mut self,
        prompt_id: PromptId,
        orchestrator_state: OrchestratorState,
        stream: &mut dyn ModelStream,
    ) -> Result<TurnOutcome> {
        for _ in 0..MAX_ROUND_TRIPS {
            let Some(event) = stream.next().await else {
                self.history.commit_in_progress();
                self.publish_state(prompt_id, SessionState::InputRequired, None, true);
                return Ok(TurnOutcome::Completed);
            };

            match event {
                StreamEvent::Content(text) => {
                    self.history.push_chunk(Role::Assistant, &text);
                    self.bus.publish(Event::Content { prompt_id, text });
                }
                StreamEvent::Thought { subject, description } => {
                    self.bus.publish(Event::Thought {
                        prompt_id,
                        thought: BusThought { subject, description },
                    });
                }
                StreamEvent::Citation { text, source } => {
                    self.history.push_chunk(Role::Assistant, &format!("{text} [{source}]"));
                }
                StreamEvent::ToolCallRequest(calls) => {
                    if let Some(outcome) = self.detect_loop(&calls, orchestrator_state) {
                        self.scheduler.cancel_all("loop detected").await;
                        self.publish_state(
                            prompt_id,
                            SessionState::Failed,
                            Some("repeated tool call detected".to_string()),
                            true,
                        );
                        return Ok(outcome);
                    }
                    let call_ids: Vec<ToolCallId> = calls.iter().map(|c| ToolCallId::new(c.id.clone())).collect();
                    self.scheduler.schedule(calls).await;
                    match self.collect_batch_results(&call_ids).await {
                        BatchCollection::Pending => {
                            self.pending = Some(PendingBatch { prompt_id, orchestrator_state, call_ids });
                            self.publish_state(prompt_id, SessionState::InputRequired, None, true);
                            return Ok(TurnOutcome::AwaitingApproval);
                        }
                        BatchCollection::Resolved(results) => {
                            stream.submit_tool_results(results).await;
                        }
                    }
                }
                StreamEvent::ToolCallConfirmation { .. } => {
                    // The model is re-asserting an already-tracked call's
                    // need for reconfirmation; the scheduler already owns
                    // that state transition (spec §4.2 AwaitingReconfirmation)
                    // so there is nothing further to drive here.
                }
                StreamEvent::ChatCompressed { original_token_count, new_token_count } => {
                    self.history.replace_with_summary(format!(
                        "[conversation compacted: {original_token_count} -> {new_token_count} tokens]"
                    ));
                }
                StreamEvent::UserCancelled => {
                    self.scheduler.cancel_all("user cancelled").await;
                    self.history.commit_in_progress();
                    self.publish_state(prompt_id, SessionState::Canceled, None, true);
                    return Ok(TurnOutcome::Cancelled);
                }
                StreamEvent::Finished(_reason) => {
                    self.history.commit_in_progress();
                    self.publish_state(prompt_id, SessionState::InputRequired, None, true);
                    return Ok(TurnOutcome::Completed);
                }
                StreamEvent::Error(err) => {
                    if let Some(outcome) = self.handle_stream_error(prompt_id, err).await? {
                        return Ok(outcome);
                    }
                    // A resolved fallback keeps the loop running against
                    // whatever model the caller's stream now points at.
                }
                StreamEvent::LoopDetected => {
                    self.scheduler.cancel_all("loop detected").await;
                    self.publish_state(
                        prompt_id,
                        SessionState::Failed,
                        Some("model-reported loop".to_string()),
                        true,
                    );
                    return Ok(TurnOutcome::LoopDetected);
                }
                StreamEvent::MaxSessionTurns => {
                    self.publish_state(
                        prompt_id,
                        SessionState::Failed,
                        Some("maximum session turns reached".to_string()),
                        true,
                    );
                    return Ok(TurnOutcome::MaxRoundTripsExceeded);
                }
                StreamEvent::ContextWindowWillOverflow { estimated_tokens, remaining_tokens } => {
                    return Err(OrchestratorError::ContextOverflow {
                        estimated: estimated_tokens,
                        remaining: remaining_tokens,
                    });
                }
                StreamEvent::Retry { attempt, reason } => {
                    if attempt > RETRY_MAX_ATTEMPTS {
                        tracing::debug!(target: "turn_loop", attempt, reason, "retry attempts exhausted");
                        return Err(OrchestratorError::StreamProtocolError(reason));
                    }
                    tracing::debug!(target: "turn_loop", attempt, reason, "backing off before retrying stream read");
                    backoff_sleep(attempt).await;
                }
                StreamEvent::InvalidStream(message) => {
                    return Err(OrchestratorError::StreamProtocolError(message));
                }
            }
        }

        self.scheduler.cancel_all("max round trips exceeded").await;
        self.publish_state(prompt_id, SessionState::Failed, Some("max round trips exceeded".to_string()), true);
        Ok(TurnOutcome::MaxRoundTripsExceeded)
    }
}

/// Exponential backoff with jitter for attempt `attempt` (1-based): base
/// delay doubling each attempt, plus up to half that much jitter so
/// concurrent turns retrying the same failure don't all wake in lockstep.
async fn backoff_sleep(attempt: u32) {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = RETRY_BASE_DELAY_MS.saturating_mul(u64::from(RETRY_MULTIPLIER).saturating_pow(exponent));
    let jitter = rand::thread_rng().gen_range(0..=base / 2);
    tokio::time::sleep(Duration::from_millis(base + jitter)).await;
}

impl TurnLoop {
    fn detect_loop(&mut self, calls: &[ToolCall], state: OrchestratorState) -> Option<TurnOutcome> {
        for call in calls {
            let fp = fingerprint(&call.name, &call.parameters);
            if self.loop_detector.record(fp, state).is_some() {
                return Some(TurnOutcome::LoopDetected);
            }
        }
        None
    }

    /// Wait for this specific batch (identified by `call_ids`, not the
    /// scheduler's whole call history — `snapshot()` accumulates every call
    /// ever scheduled) to settle. Every status transition has already reached
    /// the event bus in real time via the scheduler's
    /// [`SchedulerObserver`](crate::scheduler::SchedulerObserver) (spec
    /// §4.2), so this only needs to gather results and detect a still-pending
    /// approval; it publishes nothing itself. Returns `Pending` if any call
    /// in the batch is still awaiting a decision; the caller must not
    /// resubmit partial results.
    async fn collect_batch_results(&mut self, call_ids: &[ToolCallId]) -> BatchCollection {
        self.scheduler.wait_for_quiescence().await;

        let snapshot = self.scheduler.snapshot().await;
        let mut results = Vec::new();
        let mut pending = false;
        for tracked in snapshot.iter().filter(|t| call_ids.contains(&t.call_id)) {
            if tracked.status.is_awaiting_decision() {
                pending = true;
            }
            match &tracked.status {
                ToolCallStatus::Success { result } | ToolCallStatus::Error { result } => {
                    results.push((tracked.call_id.clone(), result.clone()));
                }
                ToolCallStatus::Cancelled { reason } => {
                    results.push((tracked.call_id.clone(), crate::scheduler::denied_response(reason)));
                }
                _ => {}
            }
        }

        if pending {
            BatchCollection::Pending
        } else {
            BatchCollection::Resolved(results)
        }
    }

    async fn handle_stream_error(&mut self, prompt_id: PromptId, err: StreamError) -> Result<Option<TurnOutcome>> {
        match err {
            StreamError::Quota { model } => {
                match resolve_fallback(&self.model_fallback, &model, self.fallback_handler.as_ref()).await {
                    Some(fallback_model) => {
                        tracing::info!(
                            target: "turn_loop",
                            from = %model,
                            to = %fallback_model,
                            "falling back to configured model after quota error"
                        );
                        self.primary_model = fallback_model;
                        Ok(None)
                    }
                    None => {
                        self.publish_state(prompt_id, SessionState::Failed, Some("quota exceeded".to_string()), true);
                        Ok(Some(TurnOutcome::Failed(format!("quota exceeded for {model}"))))
                    }
                }
            }
            StreamError::Unauthorized => Err(OrchestratorError::UnauthorizedLlm),
            StreamError::Other(message) => {
                self.publish_state(prompt_id, SessionState::Failed, Some(message.clone()), true);
                Ok(Some(TurnOutcome::Failed(message)))
            }
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Turn off loop detection for the rest of this session (spec §4.5's
    /// "ask user to disable" flow, invoked once the user declines to treat a
    /// flagged repetition as a real loop).
    pub fn disable_loop_detection(&mut self) {
        self.loop_detector.disable();
    }
}
