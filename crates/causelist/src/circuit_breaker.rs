use std::sync::atomic::{AtomicU32, Ordering};

/// Consecutive-failure counter guarding the upstream site.
///
/// Opens once `failure_threshold` invocations in a row have failed and stays
/// open until a success or an explicit [`reset`](Self::reset). There is no
/// timed half-open state.
#[derive(Debug)]
pub struct CircuitBreaker {
    failures: AtomicU32,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            failures: AtomicU32::new(0),
            failure_threshold,
        }
    }

    pub fn is_open(&self) -> bool {
        self.failures() >= self.failure_threshold
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Returns the new consecutive failure count.
    pub fn record_failure(&self) -> u32 {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if failures == self.failure_threshold {
            log::error!(
                "Circuit breaker tripped after {} consecutive failures",
                failures
            );
        } else if failures < self.failure_threshold {
            log::warn!(
                "Failure recorded, {}/{} before circuit trips",
                failures,
                self.failure_threshold
            );
        }
        failures
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.failures.store(0, Ordering::SeqCst);
        log::info!("Circuit breaker reset");
    }
}
