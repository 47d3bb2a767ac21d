//! Per-worker execution context.

use crate::arena::{Arena, ArenaError};
use crate::config::ExhaustionPolicy;
use crate::error::Result;
use crate::sample::SampleSource;
use crate::strategy::{self, Strategy};

/// Everything one worker mutates during a run: its sample source and arena.
///
/// Contexts are created once by the [`Coordinator`](crate::Coordinator)
/// and lent to exactly one thread per run, so nothing in here is shared.
/// The alignment keeps neighbouring contexts off each other's cache lines.
#[repr(C, align(64))]
pub struct WorkerContext {
    index: usize,
    source: SampleSource,
    arena: Arena,
}

impl WorkerContext {
    /// Build a context with its own arena of `arena_capacity` bytes.
    pub fn new(index: usize, arena_capacity: usize, seed: Option<u64>) -> Result<Self> {
        let source = match seed {
            Some(seed) => SampleSource::from_seed(seed.wrapping_add(index as u64)),
            None => SampleSource::from_entropy(),
        };
        Ok(Self {
            index,
            source,
            arena: Arena::with_capacity(arena_capacity)?,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Run `trials` samples with `strategy` and read back the hit count.
    ///
    /// Arena-backed strategies start from a freshly reset arena, so the
    /// previous run's counter is reclaimed here and nowhere else.
    pub fn run(
        &mut self,
        strategy: Strategy,
        trials: u64,
        policy: ExhaustionPolicy,
    ) -> Result<u64> {
        let source = &mut self.source;
        let arena = &mut self.arena;

        if strategy.uses_arena() {
            arena.reset();
        }
        let outcome = match strategy {
            Strategy::Scalar => Ok(strategy::run_scalar(trials, source)),
            Strategy::Heap => Ok(*strategy::run_heap(trials, source)),
            Strategy::Arena => {
                strategy::run_arena(trials, source, arena).and_then(|h| arena.get(h).copied())
            }
            Strategy::Vectorized => strategy::run_vectorized(trials, source, arena)
                .and_then(|h| arena.get(h).copied()),
        };

        match (outcome, policy) {
            (Ok(hits), _) => Ok(hits),
            (Err(err @ ArenaError::Exhausted { .. }), ExhaustionPolicy::HeapFallback) => {
                tracing::warn!(
                    worker = self.index,
                    %strategy,
                    error = %err,
                    "arena exhausted, falling back to heap"
                );
                Ok(*strategy::run_heap(trials, source))
            }
            (Err(err), _) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_context_is_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<WorkerContext>(), 64);
        let ctx = WorkerContext::new(0, 1024, None).unwrap();
        assert_eq!(&ctx as *const WorkerContext as usize % 64, 0);
    }

    #[test]
    fn test_arena_reused_across_runs() {
        let mut ctx = WorkerContext::new(0, 1024, Some(1)).unwrap();
        for _ in 0..5 {
            let hits = ctx
                .run(Strategy::Vectorized, 100, ExhaustionPolicy::Abort)
                .unwrap();
            assert!(hits <= 100);
            assert_eq!(ctx.arena().used(), 8);
        }
        assert_eq!(ctx.arena().generation(), 5);
    }

    #[test]
    fn test_exhaustion_aborts() {
        let mut ctx = WorkerContext::new(0, 4, None).unwrap();
        let err = ctx
            .run(Strategy::Arena, 10, ExhaustionPolicy::Abort)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Allocation(ArenaError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_exhaustion_falls_back_to_heap() {
        let mut ctx = WorkerContext::new(0, 4, Some(5)).unwrap();
        let hits = ctx
            .run(Strategy::Vectorized, 1000, ExhaustionPolicy::HeapFallback)
            .unwrap();
        let expected = strategy::run_scalar(1000, &mut SampleSource::from_seed(5));
        assert_eq!(hits, expected);
    }

    #[test]
    fn test_seed_offset_by_index() {
        let mut a = WorkerContext::new(2, 64, Some(10)).unwrap();
        let mut b = WorkerContext::new(0, 64, Some(12)).unwrap();
        let ha = a.run(Strategy::Scalar, 500, ExhaustionPolicy::Abort).unwrap();
        let hb = b.run(Strategy::Scalar, 500, ExhaustionPolicy::Abort).unwrap();
        assert_eq!(ha, hb);
    }
}
