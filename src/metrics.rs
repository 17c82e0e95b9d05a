//! Solver metrics for profiling.
//!
//! When the `tracing` feature is enabled the counters are real atomics
//! updated by the fixpoint driver. When disabled, every operation is a
//! no-op and `report()` returns zeros.
//!
//! # Usage
//!
//! ```rust,ignore
//! use scopecheck::metrics::SolverMetrics;
//!
//! let metrics = SolverMetrics::new();
//! // ... run the solver with these metrics ...
//! println!("{}", metrics.report());
//! ```

#[cfg(feature = "tracing")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters collected while solving.
///
/// Relaxed ordering throughout; the report taken after solving is exact.
#[cfg(feature = "tracing")]
pub struct SolverMetrics {
    /// Constraints taken from the active queue
    pub steps: AtomicU64,
    /// Steps that succeeded
    pub reductions: AtomicU64,
    /// Steps that delayed
    pub delays: AtomicU64,
    /// Delayed constraints moved back to the active queue
    pub activations: AtomicU64,
    /// Steps that failed
    pub failures: AtomicU64,
    /// Successful unifications
    pub unifications: AtomicU64,
    /// Failed unifications, including occurs failures
    pub unification_failures: AtomicU64,
    /// Rule overlap errors
    pub overlaps: AtomicU64,
    /// Nested solves for guards, entailment and data predicates
    pub nested_solves: AtomicU64,
    /// Largest number of delayed constraints observed
    pub max_delayed: AtomicU64,
}

#[cfg(feature = "tracing")]
impl SolverMetrics {
    pub fn new() -> Self {
        Self {
            steps: AtomicU64::new(0),
            reductions: AtomicU64::new(0),
            delays: AtomicU64::new(0),
            activations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            unifications: AtomicU64::new(0),
            unification_failures: AtomicU64::new(0),
            overlaps: AtomicU64::new(0),
            nested_solves: AtomicU64::new(0),
            max_delayed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reduction(&self) {
        self.reductions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delay(&self) {
        self.delays.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_activations(&self, count: u64) {
        self.activations.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unification(&self) {
        self.unifications.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unification_failure(&self) {
        self.unification_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_overlap(&self) {
        self.overlaps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_nested_solve(&self) {
        self.nested_solves.fetch_add(1, Ordering::Relaxed);
    }

    /// Raise the delayed high-water mark if `delayed` exceeds it.
    #[inline]
    pub fn update_max_delayed(&self, delayed: u64) {
        let mut current = self.max_delayed.load(Ordering::Relaxed);
        while delayed > current {
            match self.max_delayed.compare_exchange_weak(
                current,
                delayed,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            steps: self.steps.load(Ordering::Relaxed),
            reductions: self.reductions.load(Ordering::Relaxed),
            delays: self.delays.load(Ordering::Relaxed),
            activations: self.activations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unifications: self.unifications.load(Ordering::Relaxed),
            unification_failures: self.unification_failures.load(Ordering::Relaxed),
            overlaps: self.overlaps.load(Ordering::Relaxed),
            nested_solves: self.nested_solves.load(Ordering::Relaxed),
            max_delayed: self.max_delayed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.steps.store(0, Ordering::Relaxed);
        self.reductions.store(0, Ordering::Relaxed);
        self.delays.store(0, Ordering::Relaxed);
        self.activations.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.unifications.store(0, Ordering::Relaxed);
        self.unification_failures.store(0, Ordering::Relaxed);
        self.overlaps.store(0, Ordering::Relaxed);
        self.nested_solves.store(0, Ordering::Relaxed);
        self.max_delayed.store(0, Ordering::Relaxed);
    }
}

#[cfg(feature = "tracing")]
impl Default for SolverMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub steps: u64,
    pub reductions: u64,
    pub delays: u64,
    pub activations: u64,
    pub failures: u64,
    pub unifications: u64,
    pub unification_failures: u64,
    pub overlaps: u64,
    pub nested_solves: u64,
    pub max_delayed: u64,
}

impl MetricsReport {
    /// Fraction of steps that made progress.
    pub fn reduction_rate(&self) -> f64 {
        if self.steps == 0 {
            1.0
        } else {
            self.reductions as f64 / self.steps as f64
        }
    }

    pub fn unification_success_rate(&self) -> f64 {
        let total = self.unifications + self.unification_failures;
        if total == 0 {
            1.0
        } else {
            self.unifications as f64 / total as f64
        }
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Solver Metrics ===")?;
        writeln!(
            f,
            "Steps:              {} ({} reductions, {:.1}% progress)",
            self.steps,
            self.reductions,
            self.reduction_rate() * 100.0
        )?;
        writeln!(
            f,
            "Delays:             {} ({} activations, max {} delayed)",
            self.delays, self.activations, self.max_delayed
        )?;
        writeln!(f, "Failures:           {}", self.failures)?;
        writeln!(
            f,
            "Unifications:       {} ({} failures, {:.1}% success)",
            self.unifications,
            self.unification_failures,
            self.unification_success_rate() * 100.0
        )?;
        writeln!(f, "Rule overlaps:      {}", self.overlaps)?;
        writeln!(f, "Nested solves:      {}", self.nested_solves)?;
        Ok(())
    }
}

#[cfg(not(feature = "tracing"))]
pub struct SolverMetrics;

#[cfg(not(feature = "tracing"))]
impl SolverMetrics {
    #[inline]
    pub fn new() -> Self {
        SolverMetrics
    }
    #[inline]
    pub fn record_step(&self) {}
    #[inline]
    pub fn record_reduction(&self) {}
    #[inline]
    pub fn record_delay(&self) {}
    #[inline]
    pub fn record_activations(&self, _count: u64) {}
    #[inline]
    pub fn record_failure(&self) {}
    #[inline]
    pub fn record_unification(&self) {}
    #[inline]
    pub fn record_unification_failure(&self) {}
    #[inline]
    pub fn record_overlap(&self) {}
    #[inline]
    pub fn record_nested_solve(&self) {}
    #[inline]
    pub fn update_max_delayed(&self, _delayed: u64) {}
    #[inline]
    pub fn report(&self) -> MetricsReport {
        MetricsReport::default()
    }
    #[inline]
    pub fn reset(&self) {}
}

#[cfg(not(feature = "tracing"))]
impl Default for SolverMetrics {
    fn default() -> Self {
        Self::new()
    }
}
