//! Configuration for montepi.
//!
//! This module centralizes the tunable parameters and magic numbers, plus
//! the [`EngineConfig`] handed to the [`Coordinator`](crate::Coordinator).

use crate::error::{Error, Result};

// ============================================================================
// Sizing
// ============================================================================

/// Number of worker threads a default coordinator fans out to.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Upper bound on configurable workers. Each one owns an OS thread and an arena.
pub const MAX_WORKER_COUNT: usize = 1024;

/// Per-worker arena size in bytes.
/// A run only places one hit counter per worker, so 64 KB leaves ample slack.
pub const DEFAULT_ARENA_CAPACITY: usize = 64 * 1024; // 64 KB

/// Trial count a harness uses when none is given.
pub const DEFAULT_TRIALS: u64 = 100_000_000;

// ============================================================================
// Alignment Constants
// ============================================================================

/// Cache line size on most modern architectures.
/// Arena buffers and worker contexts start on this boundary.
pub const CACHE_LINE_ALIGN: usize = 64;

/// What the coordinator does when a worker's arena cannot hold its counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExhaustionPolicy {
    /// Fail the whole run with an allocation error.
    #[default]
    Abort,
    /// Rerun the affected worker's share on the heap-backed strategy.
    HeapFallback,
}

/// Coordinator configuration.
///
/// Worker count and arena capacity are fixed at construction; nothing is
/// derived from the hardware.
///
/// # Examples
///
/// ```rust
/// use montepi::{EngineConfig, ExhaustionPolicy};
///
/// let config = EngineConfig::new(8, 16 * 1024)
///     .with_seed(42)
///     .with_exhaustion_policy(ExhaustionPolicy::HeapFallback);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.worker_count(), 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    worker_count: usize,
    arena_capacity: usize,
    seed: Option<u64>,
    exhaustion_policy: ExhaustionPolicy,
}

impl EngineConfig {
    /// Create a configuration with entropy seeding and the `Abort` policy.
    pub fn new(worker_count: usize, arena_capacity: usize) -> Self {
        Self {
            worker_count,
            arena_capacity,
            seed: None,
            exhaustion_policy: ExhaustionPolicy::default(),
        }
    }

    /// Seed worker `i` with `seed.wrapping_add(i)` instead of OS entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion_policy = policy;
        self
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    #[inline]
    pub fn arena_capacity(&self) -> usize {
        self.arena_capacity
    }

    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[inline]
    pub fn exhaustion_policy(&self) -> ExhaustionPolicy {
        self.exhaustion_policy
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if:
    /// - `worker_count` is 0 or greater than [`MAX_WORKER_COUNT`]
    /// - `arena_capacity` is 0
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKER_COUNT {
            return Err(Error::InvalidConfig {
                name: "worker_count",
                reason: format!(
                    "{} is outside [1, {}]",
                    self.worker_count, MAX_WORKER_COUNT
                ),
            });
        }
        if self.arena_capacity == 0 {
            return Err(Error::InvalidConfig {
                name: "arena_capacity",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_COUNT, DEFAULT_ARENA_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count(), DEFAULT_WORKER_COUNT);
        assert_eq!(config.arena_capacity(), DEFAULT_ARENA_CAPACITY);
        assert_eq!(config.seed(), None);
        assert_eq!(config.exhaustion_policy(), ExhaustionPolicy::Abort);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let err = EngineConfig::new(0, 1024).validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                name: "worker_count",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_too_many_workers() {
        let err = EngineConfig::new(MAX_WORKER_COUNT + 1, 1024)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("worker_count"));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = EngineConfig::new(4, 0).validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                name: "arena_capacity",
                ..
            }
        ));
    }
}
