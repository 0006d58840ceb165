pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{
    Admission, AdmissionGuard, BreakerSettings, CircuitBreaker, CircuitRegistry, CircuitSnapshot,
    CircuitStatus,
};
pub use retry::{RetryExecutor, backoff_delay};
