//! montepi: Monte Carlo π estimation across four execution strategies.
//!
//! This crate estimates π by throwing uniform darts at the unit square and
//! counting how many land inside the unit circle. The interesting part is
//! not the estimate but how the work is executed:
//!
//! # Features
//!
//! - **Bump arena**: per-worker, 64-byte-aligned, O(1) bulk reset, typed handles
//! - **Branchless predicate**: `x*x + y*y <= 1.0`, no square root
//! - **SIMD batches**: AVX / SSE2 / NEON compare + movemask + popcount
//! - **Lock-free fan-out**: one OS thread per worker, no shared mutable state
//!   (the `Scalar` baseline stays on the calling thread)
//!
//! # Strategies
//!
//! | Strategy     | Threaded | Counter storage | SIMD |
//! |--------------|----------|-----------------|------|
//! | `Scalar`     | no       | stack           | no   |
//! | `Heap`       | yes      | `Box<u64>`      | no   |
//! | `Arena`      | yes      | worker arena    | no   |
//! | `Vectorized` | yes      | worker arena    | yes  |
//!
//! # Usage
//!
//! One-shot, with the default configuration:
//! ```rust
//! use montepi::Strategy;
//!
//! let hits = montepi::run(Strategy::Vectorized, 100_000).unwrap();
//! let estimate = 4.0 * hits as f64 / 100_000.0;
//! assert!(estimate > 2.5 && estimate < 3.8);
//! ```
//!
//! Reusing worker arenas across runs:
//! ```rust
//! use montepi::{Coordinator, EngineConfig, Strategy};
//!
//! let mut coordinator = Coordinator::new(EngineConfig::default()).unwrap();
//! for strategy in Strategy::ALL {
//!     let result = coordinator.run(strategy, 40_000).unwrap();
//!     assert!(result.hits() <= 40_000);
//! }
//! ```

pub mod arena;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod kernel;
pub mod platform;
pub mod sample;
pub mod strategy;
pub mod worker;

pub use arena::{Arena, ArenaError, ArenaStats, Handle};
pub use config::*;
pub use coordinator::{partition, Coordinator, ExecutionResult, Phase};
pub use error::{Error, Result};
pub use kernel::{BatchSplit, LANES};
pub use platform::sys;
pub use sample::SampleSource;
pub use strategy::Strategy;
pub use worker::WorkerContext;

/// Run one strategy for `trials` samples on a default coordinator and
/// return the total hit count.
///
/// Builds fresh worker arenas every call; hold a [`Coordinator`] to reuse
/// them.
pub fn run(strategy: Strategy, trials: u64) -> Result<u64> {
    let mut coordinator = Coordinator::new(EngineConfig::default())?;
    Ok(coordinator.run(strategy, trials)?.hits())
}
