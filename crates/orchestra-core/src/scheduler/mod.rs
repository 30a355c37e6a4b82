//! C2: the Tool Call Scheduler. Owns every in-flight tool call's lifecycle
//! (spec §4.2): approval routing, concurrency limits (unbounded for
//! read-shaped tools, serialized for Exec), per-path exclusive locking for
//! file mutation, and cancellation.
//!
//! Modeled as a command-channel actor exactly as spec §9 prescribes
//! ("re-architect as message-passing, not callbacks"), grounded directly on
//! the teacher's `session_actor.rs` (`SessionCmd` + `SessionActorHandle`,
//! oneshot-reply commands processed one at a time by a single task that
//! owns the call map). [`Scheduler`] is the handle every caller holds;
//! [`SchedulerActor`] is the task that actually owns `calls`/`cancellations`
//! and is the only thing that ever mutates them — a spawned tool-call task
//! never touches actor state directly, it reports completion back as a
//! command like any other caller.

pub mod path_lock;
pub mod state;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use orchestra_tools::{ToolCall, ToolError, ToolResult};
use similar::TextDiff;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::{AlwaysAllowSet, ApprovalMode, ConcurrencyLimits};
use crate::ids::{OpId, ToolCallId};
use crate::tools::builtin::apply_replacement;
use crate::tools::{Capabilities, Kind, ToolContext, ToolRegistry};

pub use state::{ConfirmationDetails, Outcome, ToolCallStatus, TrackedCall};

const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Notified whenever a tracked call's status changes, or a running call
/// forwards a chunk of incremental output, so an event bus (or a test) can
/// observe the lifecycle without polling (spec §4.2).
pub trait SchedulerObserver: Send + Sync {
    fn on_status_changed(&self, call: &TrackedCall);

    /// A running call forwarded a chunk of output (spec §4.2 "the worker's
    /// `on_output_chunk` callback is forwarded to C4 as an artifact-update
    /// event"). Default no-op so observers that don't care about streamed
    /// output need not implement it.
    fn on_output_chunk(&self, _op_id: OpId, _chunk: String) {}
}

pub struct NullObserver;
impl SchedulerObserver for NullObserver {
    fn on_status_changed(&self, _call: &TrackedCall) {}
}

enum Permit {
    NonExec(#[allow(dead_code)] tokio::sync::OwnedSemaphorePermit),
    Exec(#[allow(dead_code)] tokio::sync::OwnedSemaphorePermit),
}

/// Messages the actor processes one at a time, in arrival order. Every
/// externally-initiated variant carries a `oneshot` reply except `Cancel`
/// (fire-and-forget, matching `cancel`'s best-effort semantics) and
/// `CallCompleted`, which only the actor's own spawned tasks send.
enum SchedulerCmd {
    Schedule {
        batch: Vec<ToolCall>,
        reply: oneshot::Sender<Vec<OpId>>,
    },
    Confirm {
        call_id: ToolCallId,
        outcome: Outcome,
        reply: oneshot::Sender<Result<(), ToolError>>,
    },
    CancelAll {
        reason: String,
        reply: oneshot::Sender<()>,
    },
    Cancel {
        op_id: OpId,
    },
    WaitForQuiescence {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<TrackedCall>>,
    },
    CallCompleted {
        call_id: ToolCallId,
        op_id: OpId,
        status: ToolCallStatus,
    },
}

/// Handle callers hold. Cheap to clone (an `mpsc::Sender` plus two
/// already-`Arc`/copy-on-write fields); the actual call state lives only in
/// the spawned actor task.
pub struct Scheduler {
    cmd_tx: mpsc::Sender<SchedulerCmd>,
    approval_mode: Arc<std::sync::Mutex<ApprovalMode>>,
    always_allow: AlwaysAllowSet,
}

impl Scheduler {
    pub fn new(
        registry: Arc<ToolRegistry>,
        workspace_root: PathBuf,
        runtime_capabilities: Capabilities,
        approval_mode: ApprovalMode,
        concurrency: ConcurrencyLimits,
        observer: Arc<dyn SchedulerObserver>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let always_allow = AlwaysAllowSet::new();
        let approval_mode = Arc::new(std::sync::Mutex::new(approval_mode));

        let actor = SchedulerActor {
            cmd_tx: cmd_tx.clone(),
            registry,
            workspace_root,
            runtime_capabilities,
            approval_mode: approval_mode.clone(),
            always_allow: always_allow.clone(),
            calls: HashMap::new(),
            cancellations: HashMap::new(),
            non_exec_permits: Arc::new(Semaphore::new(concurrency.non_exec)),
            exec_permits: Arc::new(Semaphore::new(concurrency.exec)),
            observer,
            quiescence_waiters: Vec::new(),
        };
        tokio::spawn(actor.run(cmd_rx));

        Self { cmd_tx, approval_mode, always_allow }
    }

    /// Session-wide policy switch, not part of the call-state map that
    /// needs single-writer serialization — both the handle and the actor
    /// share the same `Arc<Mutex<ApprovalMode>>` and read/write it directly.
    pub fn set_approval_mode(&self, mode: ApprovalMode) {
        *self.approval_mode.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = mode;
    }

    /// Insert a batch of model-proposed tool calls (spec §4.2 `schedule`).
    pub async fn schedule(&self, batch: Vec<ToolCall>) -> Vec<OpId> {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(SchedulerCmd::Schedule { batch, reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Apply an [`Outcome`] to a call currently `AwaitingApproval` or
    /// `AwaitingReconfirmation` (spec §4.2 `confirm`).
    pub async fn confirm(&self, call_id: ToolCallId, outcome: Outcome) -> Result<(), ToolError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SchedulerCmd::Confirm { call_id, outcome, reply })
            .await
            .map_err(|_| ToolError::InternalError("scheduler actor is no longer running".to_string()))?;
        rx.await.map_err(|_| ToolError::InternalError("scheduler actor is no longer running".to_string()))?
    }

    /// Transition every non-terminal ToolCall to Cancelled (spec §4.2
    /// `cancel_all`).
    pub async fn cancel_all(&self, reason: &str) {
        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SchedulerCmd::CancelAll { reason: reason.to_string(), reply })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub async fn cancel(&self, op_id: OpId) {
        let _ = self.cmd_tx.send(SchedulerCmd::Cancel { op_id }).await;
    }

    /// Wait until the set of non-terminal ToolCalls is empty (spec §4.2
    /// `wait_for_quiescence` / Glossary "Quiescence").
    pub async fn wait_for_quiescence(&self) {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(SchedulerCmd::WaitForQuiescence { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn snapshot(&self) -> Vec<TrackedCall> {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(SchedulerCmd::Snapshot { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}

/// The actor task: sole owner of `calls`/`cancellations`, processing one
/// [`SchedulerCmd`] at a time from its mailbox.
struct SchedulerActor {
    cmd_tx: mpsc::Sender<SchedulerCmd>,
    registry: Arc<ToolRegistry>,
    workspace_root: PathBuf,
    runtime_capabilities: Capabilities,
    approval_mode: Arc<std::sync::Mutex<ApprovalMode>>,
    always_allow: AlwaysAllowSet,
    calls: HashMap<ToolCallId, TrackedCall>,
    cancellations: HashMap<OpId, CancellationToken>,
    non_exec_permits: Arc<Semaphore>,
    exec_permits: Arc<Semaphore>,
    observer: Arc<dyn SchedulerObserver>,
    quiescence_waiters: Vec<oneshot::Sender<()>>,
}

impl SchedulerActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SchedulerCmd>) {
        while let Some(cmd) = cmd_rx.recv().await {
            self.handle(cmd).await;
        }
    }

    async fn handle(&mut self, cmd: SchedulerCmd) {
        match cmd {
            SchedulerCmd::Schedule { batch, reply } => {
                let mut op_ids = Vec::with_capacity(batch.len());
                for call in batch {
                    op_ids.push(self.schedule_one(call).await);
                }
                let _ = reply.send(op_ids);
            }
            SchedulerCmd::Confirm { call_id, outcome, reply } => {
                let _ = reply.send(self.confirm_one(call_id, outcome).await);
            }
            SchedulerCmd::CancelAll { reason, reply } => {
                self.cancel_all_inner(&reason);
                let _ = reply.send(());
            }
            SchedulerCmd::Cancel { op_id } => {
                if let Some(token) = self.cancellations.get(&op_id) {
                    token.cancel();
                }
            }
            SchedulerCmd::WaitForQuiescence { reply } => {
                if self.is_quiescent() {
                    let _ = reply.send(());
                } else {
                    self.quiescence_waiters.push(reply);
                }
            }
            SchedulerCmd::Snapshot { reply } => {
                let _ = reply.send(self.calls.values().cloned().collect());
            }
            SchedulerCmd::CallCompleted { call_id, op_id, status } => {
                self.set_status(&call_id, status);
                self.cancellations.remove(&op_id);
                self.notify_if_quiescent();
            }
        }
    }

    fn is_quiescent(&self) -> bool {
        self.calls.values().all(|c| c.status.is_terminal() || c.status.is_awaiting_decision())
    }

    fn notify_if_quiescent(&mut self) {
        if self.is_quiescent() {
            for waiter in self.quiescence_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    fn set_status(&mut self, call_id: &ToolCallId, status: ToolCallStatus) {
        if let Some(tracked) = self.calls.get_mut(call_id) {
            if tracked.status == status {
                return;
            }
            tracked.transition(status);
            tracing::debug!(
                target: "scheduler",
                call_id = %tracked.call_id,
                tool = %tracked.call.name,
                status = ?tracked.status,
                revision = tracked.revision,
                "tool call status changed"
            );
            self.observer.on_status_changed(tracked);
        }
    }

    /// Approval-mode interpretation (spec §4.2, "before emitting
    /// AwaitingApproval"): Yolo auto-confirms everything; AutoEditOnly
    /// auto-confirms Edit-kind calls; Default always asks.
    fn auto_confirms(&self, call: &ToolCall, approval_mode: ApprovalMode) -> bool {
        if self.always_allow.is_allowed(&call.name, None) {
            return true;
        }
        match approval_mode {
            ApprovalMode::Yolo => true,
            ApprovalMode::AutoEditOnly => matches!(self.registry.kind(&call.name), Some(Kind::Edit)),
            ApprovalMode::Default => false,
        }
    }

    /// Build the human-readable proposal for a call that requires approval.
    /// Spec §4.2: a failure here promotes the call straight to `Error`
    /// rather than soliciting approval.
    async fn build_confirmation_details(&self, call: &ToolCall) -> Result<ConfirmationDetails, ToolError> {
        match self.registry.kind(&call.name) {
            Some(Kind::Exec) => {
                let command = call
                    .parameters
                    .get("command")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Ok(ConfirmationDetails::ExecCommand { command })
            }
            Some(Kind::Edit) => {
                let path = call
                    .parameters
                    .get("path")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ToolError::invalid_params(call.name.clone(), "missing path"))?
                    .to_string();
                let resolution = crate::safety::resolve_path(&path, &self.workspace_root)?;
                let original = tokio::fs::read_to_string(&resolution.absolute)
                    .await
                    .map_err(|e| ToolError::Io {
                        tool_name: call.name.clone(),
                        message: e.to_string(),
                    })?;
                let old_string = call.parameters.get("old_string").and_then(|v| v.as_str()).unwrap_or_default();
                let new_string = call.parameters.get("new_string").and_then(|v| v.as_str()).unwrap_or_default();
                let (updated, _) = apply_replacement(
                    &original,
                    old_string,
                    new_string,
                    crate::tools::builtin::MatchMode::ExactlyOne,
                    None,
                )?;
                let diff = TextDiff::from_lines(&original, &updated)
                    .unified_diff()
                    .context_radius(3)
                    .header(&path, &path)
                    .to_string();
                Ok(ConfirmationDetails::Edit { path, diff })
            }
            _ => Ok(ConfirmationDetails::Info {
                summary: format!("call {}", call.name),
            }),
        }
    }

    async fn schedule_one(&mut self, call: ToolCall) -> OpId {
        let tracked = TrackedCall::new(call.clone());
        let op_id = tracked.op_id;
        let call_id = tracked.call_id.clone();
        let token = CancellationToken::new();

        self.calls.insert(call_id.clone(), tracked);
        self.cancellations.insert(op_id, token.clone());

        if !self.registry.is_known(&call.name) {
            self.set_status(
                &call_id,
                ToolCallStatus::Error { result: ToolResult::Error(ToolError::UnknownTool(call.name.clone())) },
            );
            return op_id;
        }

        if let Some(required) = self.registry.required_capabilities(&call.name) {
            if !self.runtime_capabilities.satisfies(required) {
                self.set_status(
                    &call_id,
                    ToolCallStatus::Error {
                        result: ToolResult::Error(ToolError::execution(
                            call.name.clone(),
                            format!("missing required capabilities: {}", self.runtime_capabilities.missing(required)),
                        )),
                    },
                );
                return op_id;
            }
        }

        let requires_approval = self.registry.requires_approval(&call.name).unwrap_or(false);
        let approval_mode = self.current_approval_mode();
        if requires_approval && !self.auto_confirms(&call, approval_mode) {
            match self.build_confirmation_details(&call).await {
                Ok(details) => self.set_status(&call_id, ToolCallStatus::AwaitingApproval { details }),
                Err(e) => self.set_status(&call_id, ToolCallStatus::Error { result: ToolResult::Error(e) }),
            }
            return op_id;
        }

        self.dispatch(call_id, op_id, call, token);
        op_id
    }

    async fn confirm_one(&mut self, call_id: ToolCallId, outcome: Outcome) -> Result<(), ToolError> {
        let Some(tracked) = self.calls.get(&call_id) else {
            return Err(ToolError::InternalError(format!("no such call: {call_id}")));
        };
        if !tracked.status.is_awaiting_decision() {
            return Err(ToolError::InternalError(format!(
                "call {call_id} is not awaiting a decision (status: {:?})",
                tracked.status
            )));
        }
        let tool_name = tracked.call.name.clone();

        match outcome {
            Outcome::Cancel => {
                self.set_status(&call_id, ToolCallStatus::Cancelled { reason: "Tool call denied by user".to_string() });
                self.notify_if_quiescent();
                Ok(())
            }
            Outcome::ModifyWithEditor { revised_call } => {
                // Re-enter the confirmation-details factory with the edited
                // call and re-emit as AwaitingReconfirmation so a second
                // explicit approval is always required (spec §9).
                if let Some(tracked) = self.calls.get_mut(&call_id) {
                    tracked.call = revised_call.clone();
                }
                match self.build_confirmation_details(&revised_call).await {
                    Ok(details) => {
                        self.set_status(&call_id, ToolCallStatus::AwaitingReconfirmation { revised_call, details });
                    }
                    Err(e) => self.set_status(&call_id, ToolCallStatus::Error { result: ToolResult::Error(e) }),
                }
                Ok(())
            }
            Outcome::ProceedAlwaysForThisTool | Outcome::ProceedAlwaysSession => {
                self.always_allow.allow_tool(&tool_name);
                self.run_now(call_id);
                Ok(())
            }
            Outcome::ProceedAlwaysForThisServer { server_name } => {
                self.always_allow.allow_server(&tool_name, &server_name);
                self.run_now(call_id);
                Ok(())
            }
            Outcome::ProceedOnce => {
                self.run_now(call_id);
                Ok(())
            }
        }
    }

    fn run_now(&mut self, call_id: ToolCallId) {
        let Some(tracked) = self.calls.get(&call_id) else { return };
        let op_id = tracked.op_id;
        let call = tracked.call.clone();
        let Some(token) = self.cancellations.get(&op_id).cloned() else {
            tracing::error!(
                target: "scheduler",
                call_id = %call_id,
                "no cancellation token registered for a call about to run; dropping it"
            );
            self.set_status(
                &call_id,
                ToolCallStatus::Error {
                    result: ToolResult::Error(ToolError::InternalError(
                        "cancellation token missing at dispatch time".to_string(),
                    )),
                },
            );
            self.notify_if_quiescent();
            return;
        };
        self.set_status(&call_id, ToolCallStatus::Scheduled);
        self.dispatch(call_id, op_id, call, token);
    }

    /// Mark a call Executing and spawn the task that actually invokes it.
    /// The spawned task never touches actor state; it reports back via
    /// `CallCompleted` like any other command.
    fn dispatch(&mut self, call_id: ToolCallId, op_id: OpId, call: ToolCall, token: CancellationToken) {
        self.set_status(&call_id, ToolCallStatus::Scheduled);
        self.set_status(&call_id, ToolCallStatus::Executing);

        let kind = self.registry.kind(&call.name);
        let locked_path = (kind == Some(Kind::Edit))
            .then(|| call.parameters.get("path").and_then(|v| v.as_str()))
            .flatten()
            .map(|p| self.workspace_root.join(p));

        tokio::spawn(run_call(
            self.registry.clone(),
            self.workspace_root.clone(),
            self.non_exec_permits.clone(),
            self.exec_permits.clone(),
            kind,
            locked_path,
            call_id,
            op_id,
            call,
            token,
            self.cmd_tx.clone(),
            self.observer.clone(),
        ));
    }

    fn cancel_all_inner(&mut self, reason: &str) {
        tracing::debug!(target: "scheduler", reason, "cancelling all non-terminal tool calls");
        let targets: Vec<(ToolCallId, OpId)> = self
            .calls
            .values()
            .filter(|c| !c.status.is_terminal())
            .map(|c| (c.call_id.clone(), c.op_id))
            .collect();
        for (call_id, op_id) in targets {
            if let Some(token) = self.cancellations.get(&op_id) {
                token.cancel();
            }
            self.set_status(&call_id, ToolCallStatus::Cancelled { reason: reason.to_string() });
        }
        self.notify_if_quiescent();
    }

    fn current_approval_mode(&self) -> ApprovalMode {
        *self.approval_mode.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Executes one call outside the actor, then reports completion back
/// through the same mailbox. Acquires the kind-appropriate concurrency
/// permit and, for Edit calls, the per-path exclusive lock, before invoking.
#[allow(clippy::too_many_arguments)]
async fn run_call(
    registry: Arc<ToolRegistry>,
    workspace_root: PathBuf,
    non_exec_permits: Arc<Semaphore>,
    exec_permits: Arc<Semaphore>,
    kind: Option<Kind>,
    locked_path: Option<PathBuf>,
    call_id: ToolCallId,
    op_id: OpId,
    call: ToolCall,
    token: CancellationToken,
    cmd_tx: mpsc::Sender<SchedulerCmd>,
    observer: Arc<dyn SchedulerObserver>,
) {
    let permit = match kind {
        Some(Kind::Exec) => exec_permits.acquire_owned().await.map(Permit::Exec),
        _ => non_exec_permits.acquire_owned().await.map(Permit::NonExec),
    };
    let _permit = match permit {
        Ok(permit) => permit,
        Err(_) => {
            // The semaphore is only ever closed if its owner is dropped, which
            // doesn't happen while the actor holding it is alive.
            let status = ToolCallStatus::Error {
                result: ToolResult::Error(ToolError::InternalError(
                    "concurrency semaphore closed".to_string(),
                )),
            };
            let _ = cmd_tx.send(SchedulerCmd::CallCompleted { call_id, op_id, status }).await;
            return;
        }
    };

    let _path_guard = match &locked_path {
        Some(path) => Some(path_lock::lock_path(path).await),
        None => None,
    };

    let chunk_observer = observer.clone();
    let ctx = ToolContext::new(workspace_root, token).with_output_chunk(Arc::new(move |chunk: String| {
        chunk_observer.on_output_chunk(op_id, chunk);
    }));
    let result: Result<ToolResult, ToolError> = registry.invoke(&call, &ctx).await;
    let status = match result {
        Ok(result) if result.is_error() => ToolCallStatus::Error { result },
        Ok(result) => ToolCallStatus::Success { result },
        Err(ToolError::Cancelled(_)) => ToolCallStatus::Cancelled { reason: "cancelled".to_string() },
        Err(e) => ToolCallStatus::Error { result: ToolResult::Error(e) },
    };

    let _ = cmd_tx.send(SchedulerCmd::CallCompleted { call_id, op_id, status }).await;
}

/// Build the synthetic `functionResponse` for a user-denied call (spec §8,
/// "response.error is non-empty").
pub fn denied_response(reason: &str) -> ToolResult {
    ToolResult::Error(ToolError::execution("tool_call", reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::{EditTool, ThinkTool};

    fn scheduler(mode: ApprovalMode) -> Arc<Scheduler> {
        let mut registry = ToolRegistry::new();
        registry.register_builtin(Arc::new(ThinkTool));
        Arc::new(Scheduler::new(
            Arc::new(registry),
            std::env::temp_dir(),
            Capabilities::all(),
            mode,
            ConcurrencyLimits::default(),
            Arc::new(NullObserver),
        ))
    }

    #[tokio::test]
    async fn non_approval_tool_executes_immediately() {
        let scheduler = scheduler(ApprovalMode::Default);
        let call = ToolCall::new("1", "think", serde_json::json!({"thought": "hi"}));
        scheduler.schedule(vec![call]).await;
        scheduler.wait_for_quiescence().await;
        let snapshot = scheduler.snapshot().await;
        assert!(matches!(snapshot[0].status, ToolCallStatus::Success { .. }));
    }

    #[tokio::test]
    async fn deny_terminates_without_executing() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "x").unwrap();
        let mut registry = ToolRegistry::new();
        registry.register_builtin(Arc::new(EditTool));
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(registry),
            dir.path().to_path_buf(),
            Capabilities::all(),
            ApprovalMode::Default,
            ConcurrencyLimits::default(),
            Arc::new(NullObserver),
        ));
        let call = ToolCall::new(
            "1",
            "edit_file",
            serde_json::json!({"path": "a.rs", "old_string": "x", "new_string": "y"}),
        );
        scheduler.schedule(vec![call]).await;
        let snapshot = scheduler.snapshot().await;
        let call_id = snapshot[0].call_id.clone();
        assert!(matches!(snapshot[0].status, ToolCallStatus::AwaitingApproval { .. }));
        scheduler.confirm(call_id, Outcome::Cancel).await.unwrap();
        let snapshot = scheduler.snapshot().await;
        assert!(matches!(snapshot[0].status, ToolCallStatus::Cancelled { .. }));
    }

    #[tokio::test]
    async fn yolo_mode_auto_confirms() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "x").unwrap();
        let mut registry = ToolRegistry::new();
        registry.register_builtin(Arc::new(EditTool));
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(registry),
            dir.path().to_path_buf(),
            Capabilities::all(),
            ApprovalMode::Yolo,
            ConcurrencyLimits::default(),
            Arc::new(NullObserver),
        ));
        let call = ToolCall::new(
            "1",
            "edit_file",
            serde_json::json!({"path": "a.rs", "old_string": "x", "new_string": "y"}),
        );
        scheduler.schedule(vec![call]).await;
        scheduler.wait_for_quiescence().await;
        let snapshot = scheduler.snapshot().await;
        assert!(matches!(snapshot[0].status, ToolCallStatus::Success { .. }));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.rs")).unwrap(), "y");
    }
}
