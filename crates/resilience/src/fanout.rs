//! Parallel calls to several dependencies with graceful degradation.
//!
//! Each dependency gets its own worker task, calling through its own breaker.
//! Workers report into a single channel; the collector waits until every
//! worker has reported or the bounded wait expires, whichever comes first.
//! Workers still running at the deadline are aborted and reported as timed
//! out, so one slow dependency cannot hold the whole response hostage. A
//! worker that panics is reported as panicked, not as timed out.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::breaker::CircuitBreaker;
use crate::classifier::FaultClassifier;
use crate::error::BreakerError;

type PendingCall<T, E> = Pin<Box<dyn Future<Output = Result<T, BreakerError<E>>> + Send>>;

enum WorkerReport<T, E> {
    Answered(Result<T, BreakerError<E>>),
    Panicked,
}

/// One dependency's answer.
#[derive(Debug)]
pub struct FanOutResponse<T, E> {
    pub dependency: String,
    pub result: Result<T, BreakerError<E>>,
}

/// Everything that came back before the deadline, plus who did not.
#[derive(Debug)]
pub struct FanOutReport<T, E> {
    /// Responses in arrival order.
    pub responses: Vec<FanOutResponse<T, E>>,
    /// Dependencies whose workers were aborted at the deadline.
    pub timed_out: Vec<String>,
    /// Dependencies whose workers panicked before answering.
    pub panicked: Vec<String>,
}

impl<T, E> FanOutReport<T, E> {
    /// True if every dependency answered successfully in time.
    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty()
            && self.panicked.is_empty()
            && self.responses.iter().all(|r| r.result.is_ok())
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.responses
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|v| (r.dependency.as_str(), v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &BreakerError<E>)> {
        self.responses
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.dependency.as_str(), e)))
    }
}

/// Builder for a fan-out over several breaker-protected dependencies.
///
/// Dependencies may use different classifiers; they only need to agree on
/// the value and error types.
pub struct FanOut<T, E> {
    wait: Duration,
    calls: Vec<(String, PendingCall<T, E>)>,
}

impl<T, E> FanOut<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Starts a fan-out that waits at most `wait` for answers.
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            calls: Vec::new(),
        }
    }

    /// Adds a dependency, reported under its breaker's name.
    pub fn dependency<C, F, Fut>(mut self, breaker: Arc<CircuitBreaker<C>>, operation: F) -> Self
    where
        C: FaultClassifier<E> + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let name = breaker.name().to_string();
        let call = async move { breaker.call(operation).await };
        self.calls.push((name, Box::pin(call)));
        self
    }

    /// Runs every dependency concurrently and collects what arrives in time.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn collect(self) -> FanOutReport<T, E> {
        let deadline = Instant::now() + self.wait;
        let mut pending: Vec<Option<String>> = Vec::with_capacity(self.calls.len());
        let (tx, mut rx) = mpsc::channel(self.calls.len().max(1));
        let mut workers = JoinSet::new();

        for (index, (name, call)) in self.calls.into_iter().enumerate() {
            pending.push(Some(name));
            let tx = tx.clone();
            workers.spawn(async move {
                let report = match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(result) => WorkerReport::Answered(result),
                    Err(_) => WorkerReport::Panicked,
                };
                // The collector may already have given up on us.
                let _ = tx.send((index, report)).await;
            });
        }
        drop(tx);

        let mut responses = Vec::with_capacity(pending.len());
        let mut panicked = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some((index, report))) => {
                    let Some(dependency) = pending.get_mut(index).and_then(Option::take) else {
                        continue;
                    };
                    match report {
                        WorkerReport::Answered(result) => {
                            responses.push(FanOutResponse { dependency, result });
                        }
                        WorkerReport::Panicked => {
                            tracing::error!(dependency = %dependency, "fan-out worker panicked");
                            panicked.push(dependency);
                        }
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
        workers.abort_all();

        let timed_out: Vec<String> = pending.into_iter().flatten().collect();
        for dependency in &timed_out {
            metrics::counter!("fanout_timeouts_total", "dependency" => dependency.clone())
                .increment(1);
            tracing::warn!(
                dependency = %dependency,
                wait_ms = self.wait.as_millis() as u64,
                "dependency did not answer before fan-out deadline"
            );
        }

        FanOutReport {
            responses,
            timed_out,
            panicked,
        }
    }
}
