use crate::config::ResilienceConfig;
use crate::errors::ParleyError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Thresholds shared by every breaker in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub success_threshold: u32,
}

impl From<&ResilienceConfig> for BreakerSettings {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout: Duration::from_millis(config.recovery_timeout_ms),
            success_threshold: config.success_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CircuitState {
    Closed,
    Open { since: Instant },
    HalfOpen { successes: u32 },
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open { .. } => write!(f, "Open"),
            Self::HalfOpen { successes } => write!(f, "HalfOpen({})", successes),
        }
    }
}

/// How a call was let through. Probe outcomes drive Half-Open transitions;
/// normal outcomes only move the failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Normal,
    Probe,
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    /// In-flight probes while Half-Open; bounded by `success_threshold`.
    active_probes: u32,
}

/// Public view of a breaker's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Read-only snapshot for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub dependency: String,
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
    pub successes_since_half_open: u32,
    pub since_last_failure: Option<Duration>,
}

/// Three-state breaker for one downstream dependency.
pub struct CircuitBreaker {
    dependency: String,
    settings: BreakerSettings,
    breaker: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(dependency: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            dependency: dependency.into(),
            settings,
            breaker: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                active_probes: 0,
            }),
        }
    }

    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit or reject a call. Open circuits move to Half-Open once the
    /// recovery timeout has elapsed since the last failure.
    pub fn should_allow(&self) -> Result<Admission, ParleyError> {
        let mut breaker = self.lock();
        match breaker.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::HalfOpen { successes } => {
                if breaker.active_probes + successes >= self.settings.success_threshold {
                    debug!(
                        "circuit '{}' half-open with {} probe(s) in flight, rejecting",
                        self.dependency, breaker.active_probes
                    );
                    Err(self.open_error())
                } else {
                    breaker.active_probes += 1;
                    Ok(Admission::Probe)
                }
            }
            CircuitState::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.settings.recovery_timeout {
                    info!(
                        "circuit '{}' transitioning Open -> HalfOpen after {}ms",
                        self.dependency,
                        elapsed.as_millis()
                    );
                    breaker.state = CircuitState::HalfOpen { successes: 0 };
                    breaker.active_probes = 1;
                    Ok(Admission::Probe)
                } else {
                    Err(self.open_error())
                }
            }
        }
    }

    pub fn record_success(&self, admission: Admission) {
        let mut breaker = self.lock();
        breaker.consecutive_failures = 0;
        if admission != Admission::Probe {
            return;
        }
        if let CircuitState::HalfOpen { successes } = breaker.state {
            breaker.active_probes = breaker.active_probes.saturating_sub(1);
            let successes = successes + 1;
            if successes >= self.settings.success_threshold {
                info!(
                    "circuit '{}' transitioning HalfOpen -> Closed after {} successful probes",
                    self.dependency, successes
                );
                breaker.state = CircuitState::Closed;
                breaker.active_probes = 0;
            } else {
                breaker.state = CircuitState::HalfOpen { successes };
            }
        }
    }

    pub fn record_failure(&self, admission: Admission) {
        let mut breaker = self.lock();
        breaker.consecutive_failures += 1;
        let now = Instant::now();
        breaker.last_failure = Some(now);
        let failures = breaker.consecutive_failures;

        match breaker.state {
            CircuitState::Closed => {
                if failures >= self.settings.failure_threshold {
                    warn!(
                        "circuit '{}' tripped after {} consecutive failures: Closed -> Open",
                        self.dependency, failures
                    );
                    breaker.state = CircuitState::Open { since: now };
                }
            }
            CircuitState::HalfOpen { .. } => {
                if admission == Admission::Probe {
                    warn!("circuit '{}' probe failed: HalfOpen -> Open", self.dependency);
                } else {
                    warn!(
                        "circuit '{}' failed while half-open: HalfOpen -> Open",
                        self.dependency
                    );
                }
                breaker.state = CircuitState::Open { since: now };
                breaker.active_probes = 0;
            }
            CircuitState::Open { .. } => {}
        }
    }

    /// Return a probe slot without recording an outcome. Used when a call
    /// ends with an error that says nothing about the dependency's health.
    pub fn release(&self, admission: Admission) {
        if admission != Admission::Probe {
            return;
        }
        let mut breaker = self.lock();
        if matches!(breaker.state, CircuitState::HalfOpen { .. }) {
            breaker.active_probes = breaker.active_probes.saturating_sub(1);
        }
    }

    /// Whether a new call would be rejected right now. Does not transition.
    pub fn is_rejecting(&self) -> bool {
        let breaker = self.lock();
        match breaker.state {
            CircuitState::Closed => false,
            CircuitState::Open { since } => since.elapsed() < self.settings.recovery_timeout,
            CircuitState::HalfOpen { successes } => {
                breaker.active_probes + successes >= self.settings.success_threshold
            }
        }
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let breaker = self.lock();
        let (status, successes) = match breaker.state {
            CircuitState::Closed => (CircuitStatus::Closed, 0),
            CircuitState::Open { .. } => (CircuitStatus::Open, 0),
            CircuitState::HalfOpen { successes } => (CircuitStatus::HalfOpen, successes),
        };
        CircuitSnapshot {
            dependency: self.dependency.clone(),
            status,
            consecutive_failures: breaker.consecutive_failures,
            successes_since_half_open: successes,
            since_last_failure: breaker.last_failure.map(|t| t.elapsed()),
        }
    }

    fn open_error(&self) -> ParleyError {
        ParleyError::CircuitOpen {
            dependency: self.dependency.clone(),
        }
    }
}

/// An admitted call that has not reported its outcome yet. Dropping it
/// unsettled (cancelled caller, panicking operation) hands a Half-Open probe
/// slot back to the breaker.
pub struct AdmissionGuard {
    breaker: Arc<CircuitBreaker>,
    admission: Admission,
    settled: bool,
}

impl AdmissionGuard {
    /// Admit a call through `breaker`, or fail fast when it is open.
    pub fn acquire(breaker: Arc<CircuitBreaker>) -> Result<Self, ParleyError> {
        let admission = breaker.should_allow()?;
        Ok(Self {
            breaker,
            admission,
            settled: false,
        })
    }

    pub fn admission(&self) -> Admission {
        self.admission
    }

    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(self.admission);
    }

    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure(self.admission);
    }

    /// Settle without recording an outcome.
    pub fn release(mut self) {
        self.settled = true;
        self.breaker.release(self.admission);
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        if !self.settled {
            if self.admission == Admission::Probe {
                debug!(
                    "circuit '{}' probe dropped before completing, releasing slot",
                    self.breaker.dependency()
                );
            }
            self.breaker.release(self.admission);
        }
    }
}

/// Lazily creates one breaker per dependency name.
pub struct CircuitRegistry {
    settings: BreakerSettings,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    pub fn breaker(&self, dependency: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self
            .breakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                debug!("creating circuit breaker for '{}'", dependency);
                Arc::new(CircuitBreaker::new(dependency, self.settings))
            })
            .clone()
    }

    /// Snapshot of one dependency, if a call has ever been made through it.
    pub fn snapshot(&self, dependency: &str) -> Option<CircuitSnapshot> {
        let breaker = self
            .breakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dependency)
            .cloned();
        breaker.map(|b| b.snapshot())
    }

    /// Snapshots of every known dependency, sorted by name.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> = self
            .breakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut out: Vec<CircuitSnapshot> = breakers.iter().map(|b| b.snapshot()).collect();
        out.sort_by(|a, b| a.dependency.cmp(&b.dependency));
        out
    }
}
