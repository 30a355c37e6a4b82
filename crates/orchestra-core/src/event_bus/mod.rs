//! C4: the Event Bus. A synchronous, ordered, non-blocking publish surface
//! (spec §4.4) to zero or more subscribers, each backed by its own bounded
//! queue so one slow subscriber never blocks the publisher or another
//! subscriber. Under backpressure, intermediate events are dropped first;
//! a `final` `StateChange` is never dropped (spec §5). Grounded on the
//! teacher's `event_broadcast` hookup in `session_actor.rs`, generalized
//! from a single broadcast channel to the per-subscriber bounded-queue
//! shape the expanded backpressure policy requires.

pub mod wire;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::ids::{OpId, PromptId, SessionId};
use crate::scheduler::TrackedCall;

/// `state-change` metadata (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateChangeMetadata {
    pub model: Option<String>,
    pub user_tier: Option<String>,
    pub error: Option<String>,
}

/// Coarse session state surfaced at the A2A wire boundary (spec §6); a
/// superset drives the interactive terminal too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

/// A short structured reasoning summary (spec §4.4 `thought`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thought {
    pub subject: String,
    pub description: String,
}

/// One published event. Immutable value type (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    StateChange {
        prompt_id: PromptId,
        state: SessionState,
        message: Option<String>,
        /// Emitted at most once per turn, and always last (spec §4.4/§8).
        r#final: bool,
        metadata: StateChangeMetadata,
    },
    Content {
        prompt_id: PromptId,
        text: String,
    },
    Thought {
        prompt_id: PromptId,
        thought: Thought,
    },
    ToolCallUpdate {
        call: ToolCallSnapshot,
    },
    ToolCallConfirmation {
        call: ToolCallSnapshot,
    },
    ArtifactUpdate {
        op_id: OpId,
        chunk: String,
        append: bool,
        last_chunk: bool,
    },
}

/// A revision-stamped snapshot of a `TrackedCall`, decoupled from the
/// scheduler's internal type so subscribers hold an immutable copy (spec
/// §4.4 "ToolCall snapshot at current revision").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallSnapshot {
    pub call_id: String,
    pub revision: u64,
    pub status_label: String,
}

impl From<&TrackedCall> for ToolCallSnapshot {
    fn from(call: &TrackedCall) -> Self {
        Self {
            call_id: call.call_id.to_string(),
            revision: call.revision,
            status_label: format!("{:?}", call.status),
        }
    }
}

impl Event {
    /// True for the one event per turn that must be last, and that
    /// backpressure must never drop (spec §4.4/§5/§8).
    pub fn is_final(&self) -> bool {
        matches!(self, Event::StateChange { r#final: true, .. })
    }
}

/// Bound on one subscriber's buffered, not-yet-delivered events before
/// backpressure starts dropping intermediates (spec §5).
const SUBSCRIBER_CAPACITY: usize = 256;

struct Subscriber {
    queue: Mutex<VecDeque<Event>>,
    notify: Notify,
}

impl Subscriber {
    fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::with_capacity(SUBSCRIBER_CAPACITY)), notify: Notify::new() }
    }

    /// Enqueue synchronously. If at capacity, evict the oldest
    /// non-final event to make room; a final event is always admitted even
    /// if every buffered event happens to be final (an unbounded-growth
    /// edge case only a permanently-stalled subscriber would ever hit).
    fn push(&self, event: Event) {
        let mut queue = self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if queue.len() >= SUBSCRIBER_CAPACITY {
            if let Some(pos) = queue.iter().position(|e| !e.is_final()) {
                queue.remove(pos);
                tracing::debug!(target: "event_bus", "dropped an intermediate event under backpressure");
            } else if !event.is_final() {
                // Queue is full of finals (a stalled subscriber with many
                // completed turns) and this event isn't one — drop it
                // rather than grow unboundedly.
                tracing::debug!(target: "event_bus", "dropped an event into an all-final, full queue");
                return;
            }
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }
}

/// A subscriber's receiving end.
pub struct EventReceiver {
    subscriber: Arc<Subscriber>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Event {
        loop {
            {
                let mut queue = self.subscriber.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                if let Some(event) = queue.pop_front() {
                    return event;
                }
            }
            self.subscriber.notify.notified().await;
        }
    }
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish is synchronous and infallible from the publisher's
    /// perspective: it never awaits, even with a lagging subscriber (spec
    /// §4.4, §5 "publication itself must not suspend").
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            subscriber.push(event.clone());
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        let subscriber = Arc::new(Subscriber::new());
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(subscriber.clone());
        EventReceiver { subscriber }
    }
}

/// Bridges the scheduler's [`SchedulerObserver`](crate::scheduler::SchedulerObserver)
/// callbacks to bus publication, so every tool-call status transition and
/// streamed output chunk reaches subscribers as it happens rather than only
/// at quiescence (spec §4.2, "the worker's `on_output_chunk` callback is
/// forwarded to C4 as an artifact-update event"). Grounded on the teacher's
/// `event_broadcast` hookup in `session_actor.rs`, generalized from a direct
/// broadcast call to an observer trait impl so C2 stays decoupled from C4.
pub struct EventBusObserver {
    bus: Arc<EventBus>,
}

impl EventBusObserver {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl crate::scheduler::SchedulerObserver for EventBusObserver {
    fn on_status_changed(&self, call: &TrackedCall) {
        let snapshot = ToolCallSnapshot::from(call);
        let event = if call.status.is_awaiting_decision() {
            Event::ToolCallConfirmation { call: snapshot }
        } else {
            Event::ToolCallUpdate { call: snapshot }
        };
        self.bus.publish(event);
    }

    fn on_output_chunk(&self, op_id: OpId, chunk: String) {
        self.bus.publish(Event::ArtifactUpdate { op_id, chunk, append: true, last_chunk: false });
    }
}

/// A no-op session id placeholder used by callers that publish before a
/// session has been assigned one (e.g. unit tests).
pub fn anonymous_session() -> SessionId {
    SessionId::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_publication_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let prompt_id = PromptId::new();
        bus.publish(Event::Content { prompt_id, text: "a".into() });
        bus.publish(Event::Content { prompt_id, text: "b".into() });
        bus.publish(Event::StateChange {
            prompt_id,
            state: SessionState::InputRequired,
            message: None,
            r#final: true,
            metadata: StateChangeMetadata { model: None, user_tier: None, error: None },
        });

        assert!(matches!(rx.recv().await, Event::Content { text, .. } if text == "a"));
        assert!(matches!(rx.recv().await, Event::Content { text, .. } if text == "b"));
        assert!(rx.recv().await.is_final());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(Event::Content { prompt_id: PromptId::new(), text: "x".into() });
    }

    #[test]
    fn backpressure_drops_intermediates_but_keeps_the_final() {
        let bus = EventBus::new();
        let _rx = bus.subscribe();
        let prompt_id = PromptId::new();
        for i in 0..SUBSCRIBER_CAPACITY + 10 {
            bus.publish(Event::ArtifactUpdate {
                op_id: OpId::new(),
                chunk: format!("chunk-{i}"),
                append: true,
                last_chunk: false,
            });
        }
        bus.publish(Event::StateChange {
            prompt_id,
            state: SessionState::Completed,
            message: None,
            r#final: true,
            metadata: StateChangeMetadata { model: None, user_tier: None, error: None },
        });

        let subscribers = bus.subscribers.lock().unwrap();
        let queue = subscribers[0].queue.lock().unwrap();
        assert!(queue.len() <= SUBSCRIBER_CAPACITY);
        assert!(queue.back().unwrap().is_final());
    }
}
