use crate::config::RetryOptions;
use crate::errors::ParleyError;
use crate::resilience::circuit_breaker::{Admission, AdmissionGuard, CircuitRegistry};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay before retry `n` (0-based): `min(base * 2^n, max)` when exponential,
/// else `base`. Jitter adds up to 25% and is still capped at `max`.
pub fn backoff_delay(options: &RetryOptions, n: u32) -> Duration {
    let base = options.base_delay_ms;
    let max = options.max_delay_ms.max(base);
    let delay = if options.exponential_backoff {
        base.saturating_mul(2u64.saturating_pow(n)).min(max)
    } else {
        base
    };
    let total = if options.jitter {
        let jitter = (delay as f64 * 0.25 * fastrand::f64()) as u64;
        delay.saturating_add(jitter).min(max)
    } else {
        delay
    };
    Duration::from_millis(total)
}

/// Runs downstream calls with bounded retries, per-attempt timeouts and a
/// per-dependency circuit breaker.
///
/// Circuit bookkeeping is per call: a call that exhausts its attempts records
/// one failure, a successful call records one success. A call admitted as a
/// Half-Open probe gets exactly one attempt. Non-retryable errors end the call
/// without touching the circuit, and so does dropping the call mid-flight or
/// a panicking operation.
#[derive(Clone)]
pub struct RetryExecutor {
    circuits: Arc<CircuitRegistry>,
}

impl RetryExecutor {
    pub fn new(circuits: Arc<CircuitRegistry>) -> Self {
        Self { circuits }
    }

    pub fn circuits(&self) -> &Arc<CircuitRegistry> {
        &self.circuits
    }

    pub async fn execute<T, F, Fut>(
        &self,
        dependency: &str,
        options: &RetryOptions,
        mut operation: F,
    ) -> Result<T, ParleyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ParleyError>>,
    {
        let breaker = self.circuits.breaker(dependency);
        let guard = match AdmissionGuard::acquire(breaker.clone()) {
            Ok(guard) => guard,
            Err(e) => {
                warn!("circuit open for '{}', failing fast", dependency);
                metrics::counter!(
                    "parley_circuit_rejections_total",
                    "dependency" => dependency.to_string()
                )
                .increment(1);
                return Err(e);
            }
        };

        let max_attempts = match guard.admission() {
            Admission::Probe => 1,
            Admission::Normal => options.max_retries.saturating_add(1),
        };

        let mut attempt: u32 = 0;
        loop {
            let err = match run_attempt(dependency, options, operation()).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("'{}' succeeded on attempt {}", dependency, attempt + 1);
                    }
                    guard.succeed();
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                debug!("'{}' failed with non-retryable {} error", dependency, err.kind());
                guard.release();
                return Err(err);
            }

            attempt += 1;
            warn!(
                "'{}' attempt {}/{} failed: {}",
                dependency, attempt, max_attempts, err
            );
            if attempt >= max_attempts {
                guard.fail();
                return Err(err);
            }

            // Another caller may have opened the circuit while this one was failing
            if breaker.is_rejecting() {
                guard.fail();
                metrics::counter!(
                    "parley_circuit_rejections_total",
                    "dependency" => dependency.to_string()
                )
                .increment(1);
                return Err(ParleyError::CircuitOpen {
                    dependency: dependency.to_string(),
                });
            }

            let delay = backoff_delay(options, attempt - 1);
            debug!("'{}' retrying in {}ms", dependency, delay.as_millis());
            metrics::counter!(
                "parley_retry_attempts_total",
                "dependency" => dependency.to_string()
            )
            .increment(1);
            tokio::time::sleep(delay).await;
        }
    }
}

/// One attempt under the per-attempt timeout. Dropping the future on timeout
/// cancels it; anything it spawned must be tied to its lifetime.
async fn run_attempt<T, Fut>(
    dependency: &str,
    options: &RetryOptions,
    fut: Fut,
) -> Result<T, ParleyError>
where
    Fut: Future<Output = Result<T, ParleyError>>,
{
    if options.timeout_ms == 0 {
        return fut.await;
    }
    match tokio::time::timeout(Duration::from_millis(options.timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(ParleyError::Timeout {
            dependency: dependency.to_string(),
            after_ms: options.timeout_ms,
        }),
    }
}
