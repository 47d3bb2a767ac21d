//! The four trial strategies.
//!
//! Each strategy performs exactly `trials` independent samples and returns
//! a hit count in `[0, trials]`. They differ only in where the hit counter
//! lives and whether samples are tested one at a time or in batches:
//!
//! | Strategy     | Counter storage      | Predicate         |
//! |--------------|----------------------|-------------------|
//! | `Scalar`     | local variable       | scalar            |
//! | `Heap`       | `Box<u64>`           | scalar            |
//! | `Arena`      | worker [`Arena`]     | scalar            |
//! | `Vectorized` | worker [`Arena`]     | batch + scalar tail |

use std::fmt;
use std::str::FromStr;

use crate::arena::{Arena, ArenaError, Handle};
use crate::config::CACHE_LINE_ALIGN;
use crate::error::Error;
use crate::kernel::{count_inside, is_inside, BatchSplit, Lanes};
use crate::sample::SampleSource;

/// Execution strategy selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Single loop, counter on the stack.
    Scalar,
    /// Counter allocated from the general-purpose heap.
    Heap,
    /// Counter allocated from the worker's arena.
    Arena,
    /// Arena counter plus the batched SIMD kernel.
    Vectorized,
}

impl Strategy {
    /// Every strategy, in benchmark order.
    pub const ALL: [Strategy; 4] = [
        Strategy::Scalar,
        Strategy::Heap,
        Strategy::Arena,
        Strategy::Vectorized,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Heap => "heap",
            Self::Arena => "arena",
            Self::Vectorized => "vectorized",
        }
    }

    /// Whether the coordinator fans the strategy out across workers.
    /// `Scalar` is the single-threaded baseline.
    #[inline]
    pub fn is_threaded(self) -> bool {
        !matches!(self, Self::Scalar)
    }

    /// Whether the strategy places its counter in the worker arena.
    #[inline]
    pub fn uses_arena(self) -> bool {
        matches!(self, Self::Arena | Self::Vectorized)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    /// Accepts the canonical names and the legacy launcher names
    /// (`Sequential`, `Pool`, `SIMD`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" | "sequential" => Ok(Self::Scalar),
            "heap" => Ok(Self::Heap),
            "arena" | "pool" => Ok(Self::Arena),
            "vectorized" | "simd" => Ok(Self::Vectorized),
            _ => Err(Error::InvalidStrategy(s.to_string())),
        }
    }
}

/// Scalar baseline: hit count returned by value.
pub fn run_scalar(trials: u64, source: &mut SampleSource) -> u64 {
    let mut hits = 0u64;
    for _ in 0..trials {
        let (x, y) = source.next_pair();
        hits += u64::from(is_inside(x, y));
    }
    hits
}

/// Heap-backed: the counter is boxed at call start and handed to the caller.
/// Dropping the box releases it.
pub fn run_heap(trials: u64, source: &mut SampleSource) -> Box<u64> {
    let mut hits = Box::new(0u64);
    for _ in 0..trials {
        let (x, y) = source.next_pair();
        *hits += u64::from(is_inside(x, y));
    }
    hits
}

/// Arena-backed: the counter lives in `arena` until its next reset.
///
/// # Errors
/// `ArenaError::Exhausted` when the arena has no cache line left for the
/// counter. No samples are drawn in that case.
pub fn run_arena(
    trials: u64,
    source: &mut SampleSource,
    arena: &mut Arena,
) -> Result<Handle<u64>, ArenaError> {
    let handle = arena.alloc_aligned(0u64, CACHE_LINE_ALIGN)?;
    let hits = arena.get_mut(handle)?;
    for _ in 0..trials {
        let (x, y) = source.next_pair();
        *hits += u64::from(is_inside(x, y));
    }
    Ok(handle)
}

/// Vectorized + arena-backed: full batches go through the SIMD kernel, the
/// `trials % LANES` tail through the scalar predicate.
///
/// # Errors
/// As [`run_arena`].
pub fn run_vectorized(
    trials: u64,
    source: &mut SampleSource,
    arena: &mut Arena,
) -> Result<Handle<u64>, ArenaError> {
    let handle = arena.alloc_aligned(0u64, CACHE_LINE_ALIGN)?;
    let hits = arena.get_mut(handle)?;

    let split = BatchSplit::for_build(trials);
    let mut xs = Lanes::default();
    let mut ys = Lanes::default();
    for _ in 0..split.batches {
        source.fill_lanes(&mut xs, &mut ys);
        *hits += u64::from(count_inside(&xs, &ys));
    }
    for _ in 0..split.remainder {
        let (x, y) = source.next_pair();
        *hits += u64::from(is_inside(x, y));
    }
    Ok(handle)
}
