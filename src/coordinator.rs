//! Thread coordinator: partition, fan-out, join, fan-in.
//!
//! A threaded run moves through `Idle -> Running -> Joined -> Aggregated -> Idle`;
//! the scalar baseline stays on the calling thread and skips the join.
//! Workers are plain OS threads spawned fresh for every run; the join is
//! the only synchronization point, and each worker touches nothing but its
//! own [`WorkerContext`].

use std::thread;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::strategy::Strategy;
use crate::worker::WorkerContext;

/// Split `total` trials across `workers` as evenly as possible.
///
/// The first `total % workers` workers take one extra trial each, so the
/// shares always sum to `total` and differ by at most one.
pub fn partition(total: u64, workers: usize) -> Vec<u64> {
    if workers == 0 {
        return Vec::new();
    }
    let n = workers as u64;
    let base = total / n;
    let extra = total % n;
    (0..n).map(|i| base + u64::from(i < extra)).collect()
}

/// Coordinator lifecycle stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Joined,
    Aggregated,
}

/// Aggregate outcome of one coordinator run. Immutable once produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    strategy: Strategy,
    trials: u64,
    hits: u64,
    workers: usize,
}

impl ExecutionResult {
    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    #[inline]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// `4 * hits / trials`.
    pub fn estimate(&self) -> f64 {
        4.0 * self.hits as f64 / self.trials as f64
    }
}

/// Owns one [`WorkerContext`] per worker and drives runs across them.
///
/// # Examples
///
/// ```rust
/// use montepi::{Coordinator, EngineConfig, Strategy};
///
/// let mut coordinator = Coordinator::new(EngineConfig::new(2, 4096)).unwrap();
/// let result = coordinator.run(Strategy::Vectorized, 10_001).unwrap();
/// assert!(result.hits() <= 10_001);
/// assert_eq!(result.workers(), 2);
/// ```
pub struct Coordinator {
    config: EngineConfig,
    workers: Vec<WorkerContext>,
    phase: Phase,
}

impl Coordinator {
    /// Validate `config` and build every worker's context up front.
    ///
    /// # Errors
    /// `InvalidConfig` for out-of-range settings, `Allocation` if an arena
    /// cannot be reserved.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let workers = (0..config.worker_count())
            .map(|index| WorkerContext::new(index, config.arena_capacity(), config.seed()))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            workers = workers.len(),
            arena_capacity = config.arena_capacity(),
            kernel = crate::kernel::BACKEND,
            "coordinator ready"
        );

        Ok(Self {
            config,
            workers,
            phase: Phase::Idle,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Parse `name` as a [`Strategy`] and run it.
    pub fn run_named(&mut self, name: &str, trials: u64) -> Result<ExecutionResult> {
        let strategy = name.parse::<Strategy>()?;
        self.run(strategy, trials)
    }

    /// Run `trials` samples of `strategy` and sum the hits.
    ///
    /// Threaded strategies are split across all workers. `Scalar` is the
    /// sequential baseline: it runs every trial on worker 0 in the calling
    /// thread and reports a single worker.
    ///
    /// # Errors
    /// `InvalidTrialCount` for zero trials; otherwise the first worker
    /// error in worker order (allocation failure or a panic).
    pub fn run(&mut self, strategy: Strategy, trials: u64) -> Result<ExecutionResult> {
        if trials == 0 {
            return Err(Error::InvalidTrialCount(trials));
        }

        let workers = if strategy.is_threaded() {
            self.workers.len()
        } else {
            1
        };
        let span = tracing::info_span!("run", %strategy, trials, workers);
        let _guard = span.enter();

        let outcome = if strategy.is_threaded() {
            self.fan_out(strategy, trials, &span)
        } else {
            self.run_sequential(strategy, trials)
        };
        self.transition(Phase::Idle);
        outcome
    }

    fn run_sequential(&mut self, strategy: Strategy, trials: u64) -> Result<ExecutionResult> {
        let policy = self.config.exhaustion_policy();
        self.transition(Phase::Running);
        // `validate()` guarantees at least one worker.
        let hits = self.workers[0].run(strategy, trials, policy)?;
        self.transition(Phase::Aggregated);

        tracing::info!(hits, "run complete");
        Ok(ExecutionResult {
            strategy,
            trials,
            hits,
            workers: 1,
        })
    }

    fn fan_out(
        &mut self,
        strategy: Strategy,
        trials: u64,
        span: &tracing::Span,
    ) -> Result<ExecutionResult> {
        let shares = partition(trials, self.workers.len());
        tracing::debug!(?shares, "partitioned trials");

        let policy = self.config.exhaustion_policy();
        self.transition(Phase::Running);

        let outcomes: Vec<Result<u64>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .workers
                .iter_mut()
                .zip(shares.iter().copied())
                .map(|(ctx, share)| {
                    let span = span.clone();
                    scope.spawn(move || -> Result<u64> {
                        let _guard = span.enter();
                        let hits = ctx.run(strategy, share, policy)?;
                        tracing::debug!(worker = ctx.index(), share, hits, "worker finished");
                        Ok(hits)
                    })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(worker, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(Error::WorkerPanicked { worker }))
                })
                .collect()
        });
        self.transition(Phase::Joined);

        let hits = outcomes
            .into_iter()
            .try_fold(0u64, |total, outcome| outcome.map(|hits| total + hits))?;
        self.transition(Phase::Aggregated);

        tracing::info!(hits, "run complete");
        Ok(ExecutionResult {
            strategy,
            trials,
            hits,
            workers: self.workers.len(),
        })
    }

    fn transition(&mut self, next: Phase) {
        tracing::trace!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleSource;
    use crate::strategy::run_scalar;
    use proptest::prelude::*;
    use crate::strategy::Strategy;

    #[test]
    fn test_partition_even() {
        assert_eq!(partition(100, 4), vec![25, 25, 25, 25]);
    }

    #[test]
    fn test_partition_remainder_goes_to_first_workers() {
        assert_eq!(partition(10, 4), vec![3, 3, 2, 2]);
        assert_eq!(partition(3, 4), vec![1, 1, 1, 0]);
    }

    #[test]
    fn test_partition_no_workers() {
        assert!(partition(10, 0).is_empty());
    }

    #[test]
    fn test_rejects_zero_trials() {
        let mut coordinator = Coordinator::new(EngineConfig::new(2, 1024)).unwrap();
        for strategy in Strategy::ALL {
            assert_eq!(
                coordinator.run(strategy, 0).unwrap_err(),
                Error::InvalidTrialCount(0)
            );
        }
        assert_eq!(coordinator.phase(), Phase::Idle);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            Coordinator::new(EngineConfig::new(0, 1024)),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_run_named() {
        let mut coordinator = Coordinator::new(EngineConfig::new(2, 1024)).unwrap();
        let result = coordinator.run_named("SIMD", 1000).unwrap();
        assert_eq!(result.strategy(), Strategy::Vectorized);
        assert!(matches!(
            coordinator.run_named("Turbo", 1000),
            Err(Error::InvalidStrategy(_))
        ));
    }

    #[test]
    fn test_more_workers_than_trials() {
        let mut coordinator = Coordinator::new(EngineConfig::new(8, 1024)).unwrap();
        for strategy in Strategy::ALL {
            let result = coordinator.run(strategy, 3).unwrap();
            assert!(result.hits() <= 3);
            assert_eq!(result.trials(), 3);
        }
    }

    #[test]
    fn test_scalar_runs_on_one_worker() {
        let seed = 17;
        let trials = 10_001;
        let mut coordinator =
            Coordinator::new(EngineConfig::new(4, 4096).with_seed(seed)).unwrap();
        let result = coordinator.run(Strategy::Scalar, trials).unwrap();
        assert_eq!(result.workers(), 1);
        assert_eq!(
            result.hits(),
            run_scalar(trials, &mut SampleSource::from_seed(seed))
        );
        assert_eq!(coordinator.phase(), Phase::Idle);
    }

    #[test]
    fn test_threaded_strategies_use_every_worker() {
        let mut coordinator = Coordinator::new(EngineConfig::new(4, 4096)).unwrap();
        for strategy in [Strategy::Heap, Strategy::Arena, Strategy::Vectorized] {
            assert_eq!(coordinator.run(strategy, 1000).unwrap().workers(), 4);
        }
    }

    #[test]
    fn test_estimate() {
        let result = ExecutionResult {
            strategy: Strategy::Scalar,
            trials: 100,
            hits: 75,
            workers: 1,
        };
        assert_eq!(result.estimate(), 3.0);
    }

    proptest! {
        #[test]
        fn prop_partition_is_exact(total in 0u64..1_000_000_000, workers in 1usize..64) {
            let shares = partition(total, workers);
            prop_assert_eq!(shares.len(), workers);
            prop_assert_eq!(shares.iter().sum::<u64>(), total);
            let max = *shares.iter().max().unwrap();
            let min = *shares.iter().min().unwrap();
            prop_assert!(max - min <= 1);
        }
    }
}
