//! Retry and fallback loop
//!
//! Candidates are tried strictly in order. Each attempt races the caller's cancel
//! handle and the global deadline; losing either race drops the attempt future, which
//! closes whatever connection it held.

use async_stream::stream;
use futures::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::debug;

use super::Dispatcher;
use super::execution::next_step;
use super::outcome::DispatchOutcome;
use super::policy::DispatchPolicy;
use super::selection::select_candidates;
use super::state::DispatchRun;
use crate::core::observability::RetryDecision;
use crate::core::providers::RegistryEntry;
use crate::core::streaming::{CancelHandle, ResponseStream};
use crate::core::traits::provider::ChunkStream;
use crate::core::types::{
    common::{ProviderKey, RequestContext},
    errors::NormalizedError,
    requests::NormalizedRequest,
    responses::{NormalizedResponse, ResponseChunk},
};

type AttemptFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, NormalizedError>> + Send + 'a>>;

/// Cancel handle and deadline shared by every attempt of one call
struct CallBudget {
    cancel: CancelHandle,
    deadline: Instant,
    budget: Duration,
}

impl CallBudget {
    fn new(policy: &DispatchPolicy) -> Self {
        Self {
            cancel: policy
                .cancel
                .as_ref()
                .map(CancelHandle::child)
                .unwrap_or_default(),
            deadline: Instant::now() + policy.deadline,
            budget: policy.deadline,
        }
    }
}

impl Dispatcher {
    /// Validate inputs and pick candidates, failing the run on error
    fn prepare<'a>(
        &'a self,
        run: &mut DispatchRun<'_>,
        request: &NormalizedRequest,
        policy: &DispatchPolicy,
        streaming: bool,
    ) -> Result<Vec<&'a RegistryEntry>, NormalizedError> {
        request
            .validate()
            .and_then(|_| policy.validate())
            .and_then(|_| select_candidates(&self.registry, request, policy, streaming))
            .map_err(|error| run.fail(error))
    }

    pub(super) async fn execute_impl(
        &self,
        request: &NormalizedRequest,
        policy: &DispatchPolicy,
    ) -> Result<DispatchOutcome<NormalizedResponse>, NormalizedError> {
        let mut run = DispatchRun::new(&self.observers, false);
        let call = CallBudget::new(policy);
        let candidates = self.prepare(&mut run, request, policy, false)?;

        debug!(
            request_id = run.request_id(),
            candidates = ?candidates.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
            deadline_ms = policy.deadline.as_millis() as u64,
            "dispatching request"
        );

        self.run_attempts(&mut run, &candidates, policy, &call, |entry, ctx| {
            Box::pin(async move {
                let mut response = entry.adapter.execute(request, &ctx).await?;
                response.provider = entry.key.clone();
                Ok(response)
            })
        })
        .await
    }

    pub(super) async fn execute_stream_impl(
        &self,
        request: &NormalizedRequest,
        policy: &DispatchPolicy,
    ) -> Result<DispatchOutcome<ResponseStream>, NormalizedError> {
        let mut run = DispatchRun::new(&self.observers, true);
        let call = CallBudget::new(policy);
        let candidates = self.prepare(&mut run, request, policy, true)?;

        debug!(
            request_id = run.request_id(),
            candidates = ?candidates.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
            deadline_ms = policy.deadline.as_millis() as u64,
            "dispatching stream"
        );

        // An attempt only succeeds once the first chunk arrived; until then the
        // stream can still fall back to another provider.
        let outcome = self
            .run_attempts(&mut run, &candidates, policy, &call, |entry, ctx| {
                Box::pin(async move {
                    let mut stream = entry.adapter.execute_stream(request, &ctx).await?;
                    match stream.next().await {
                        Some(Ok(mut chunk)) => {
                            chunk.provider = entry.key.clone();
                            Ok((chunk, stream))
                        }
                        Some(Err(error)) => Err(error),
                        None => Err(NormalizedError::protocol("stream ended before the first chunk")),
                    }
                })
            })
            .await?;

        let provider = outcome.provider.clone();
        let cancel = call.cancel.clone();
        Ok(outcome.map(|(first, inner)| {
            let body = relay_stream(first, inner, provider.clone(), &call);
            ResponseStream::new(body, provider, cancel)
        }))
    }

    async fn run_attempts<'a, T, F>(
        &'a self,
        run: &mut DispatchRun<'_>,
        candidates: &[&'a RegistryEntry],
        policy: &DispatchPolicy,
        call: &CallBudget,
        mut attempt_fn: F,
    ) -> Result<DispatchOutcome<T>, NormalizedError>
    where
        F: FnMut(&'a RegistryEntry, RequestContext) -> AttemptFuture<'a, T>,
    {
        let max_attempts = policy.max_attempts();
        let mut causes: Vec<NormalizedError> = Vec::new();
        let mut total_attempts = 0u32;

        for (index, &entry) in candidates.iter().enumerate() {
            let more_candidates = index + 1 < candidates.len();
            // Latest retryable failure on this candidate, recorded if the call ends mid-retry
            let mut pending: Option<NormalizedError> = None;
            let mut attempt = 1u32;

            loop {
                if call.cancel.is_cancelled() {
                    causes.extend(pending.take());
                    return Err(run.fail(NormalizedError::cancelled().with_causes(causes)));
                }
                if Instant::now() >= call.deadline {
                    causes.extend(pending.take());
                    return Err(run.fail(NormalizedError::deadline_exceeded(call.budget, causes)));
                }

                total_attempts += 1;
                run.attempt_started(&entry.key, index, attempt);
                let ctx = RequestContext::new(run.request_id())
                    .with_attempt(attempt)
                    .with_deadline(call.deadline);

                let result = tokio::select! {
                    biased;
                    _ = call.cancel.cancelled() => None,
                    result = timeout_at(call.deadline, attempt_fn(entry, ctx)) => Some(result),
                };

                let error = match result {
                    None => {
                        causes.extend(pending.take());
                        return Err(run.fail(NormalizedError::cancelled().with_causes(causes)));
                    }
                    Some(Err(_elapsed)) => {
                        causes.extend(pending.take());
                        return Err(run.fail(NormalizedError::deadline_exceeded(call.budget, causes)));
                    }
                    Some(Ok(Ok(value))) => {
                        run.succeeded(&entry.key, index, attempt);
                        return Ok(DispatchOutcome {
                            value,
                            provider: entry.key.clone(),
                            attempts: total_attempts,
                            used_fallback: index > 0,
                            elapsed: run.elapsed(),
                        });
                    }
                    Some(Ok(Err(error))) => error.with_provider(entry.key.clone()),
                };

                let decision = next_step(
                    &error,
                    attempt,
                    max_attempts,
                    more_candidates,
                    &policy.backoff,
                );
                run.attempt_failed(&entry.key, index, attempt, &error, decision);

                match decision {
                    RetryDecision::Retry { delay } => {
                        pending = Some(error);
                        let wake = (Instant::now() + delay).min(call.deadline);
                        let cancelled = tokio::select! {
                            biased;
                            _ = call.cancel.cancelled() => true,
                            _ = sleep_until(wake) => false,
                        };
                        if cancelled {
                            causes.extend(pending.take());
                            return Err(run.fail(NormalizedError::cancelled().with_causes(causes)));
                        }
                        attempt += 1;
                    }
                    RetryDecision::Fallback | RetryDecision::GiveUp => {
                        causes.push(error);
                        break;
                    }
                }
            }
        }

        Err(run.fail(NormalizedError::all_providers_exhausted(causes)))
    }
}

/// Forward the rest of an established stream under the call's cancel handle and deadline
fn relay_stream(
    first: ResponseChunk,
    mut inner: ChunkStream,
    provider: ProviderKey,
    call: &CallBudget,
) -> ChunkStream {
    let cancel = call.cancel.clone();
    let deadline = call.deadline;
    let budget = call.budget;

    Box::pin(stream! {
        yield Ok(first);
        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(NormalizedError::cancelled()),
                item = timeout_at(deadline, inner.next()) => {
                    item.map_err(|_| NormalizedError::deadline_exceeded(budget, Vec::new()))
                }
            };
            match step {
                Ok(Some(Ok(mut chunk))) => {
                    chunk.provider = provider.clone();
                    yield Ok(chunk);
                }
                Ok(None) => break,
                Ok(Some(Err(error))) | Err(error) => {
                    // Release the connection before reporting
                    drop(inner);
                    yield Err(error.with_provider(provider.clone()));
                    break;
                }
            }
        }
    })
}
