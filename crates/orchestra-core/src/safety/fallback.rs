//! Model-fallback consent flow (spec §4.3, "quota fallback"): when the
//! primary model reports a quota/rate-limit failure mid-turn, the turn loop
//! asks a registered handler whether to retry against a fallback model.
//! Grounded on the teacher's flash-fallback handler hook in
//! `api/provider.rs` (observed as a callback invoked from the streaming
//! loop on a quota error), reshaped here as an `async_trait` so the decision
//! can come from a UI prompt without blocking the scheduler thread.

use async_trait::async_trait;

use crate::config::ModelFallback;

/// The user's (or an automated policy's) decision on whether to continue a
/// turn against the fallback model after the primary model reports quota
/// exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackDecision {
    UseFallback,
    Abort,
}

/// Invoked by the turn loop when the primary model's stream reports a
/// quota/rate-limit error and a fallback model is configured.
#[async_trait]
pub trait FallbackHandler: Send + Sync {
    async fn on_quota_exceeded(&self, primary_model: &str, fallback_model: &str) -> FallbackDecision;
}

/// A handler that always declines — used when no fallback model is
/// configured or no interactive sink is attached.
pub struct NeverFallback;

#[async_trait]
impl FallbackHandler for NeverFallback {
    async fn on_quota_exceeded(&self, _primary_model: &str, _fallback_model: &str) -> FallbackDecision {
        FallbackDecision::Abort
    }
}

/// Resolve which model name a turn should retry against, given the
/// configured fallback pair and a handler's decision. Returns `None` when
/// there is no fallback model configured at all, short-circuiting the
/// handler call entirely.
pub async fn resolve_fallback(
    config: &ModelFallback,
    primary_model: &str,
    handler: &dyn FallbackHandler,
) -> Option<String> {
    let fallback_model = config.fallback_model.as_ref()?;
    match handler.on_quota_exceeded(primary_model, fallback_model).await {
        FallbackDecision::UseFallback => Some(fallback_model.clone()),
        FallbackDecision::Abort => None,
    }
}
