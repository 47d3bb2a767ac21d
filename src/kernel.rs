//! Containment predicate and its batched (SIMD) evaluation.
//!
//! A sample is a hit when it lies in the unit circle: `x*x + y*y <= 1.0`.
//! The square root is never taken, which keeps the test cheap and lets it
//! map directly onto vector multiply/add/compare.
//!
//! # Backends
//!
//! The lane count is fixed when the crate is compiled:
//!
//! | Target                         | Backend | `LANES` |
//! |--------------------------------|---------|---------|
//! | x86_64 with `avx` enabled      | AVX     | 4       |
//! | x86_64 baseline                | SSE2    | 2       |
//! | aarch64 with `neon`            | NEON    | 2       |
//! | anything else / `scalar-kernel`| scalar  | 1       |
//!
//! Every backend compares all lanes at once, packs the per-lane result into
//! a bitmask and counts it with a single popcount instead of `LANES`
//! conditional branches.

/// Whether `(x, y)` lies inside the unit circle. The boundary counts as inside.
#[inline(always)]
pub fn is_inside(x: f64, y: f64) -> bool {
    (x * x + y * y) <= 1.0
}

/// Reference hit count: one scalar predicate per pair.
pub fn count_inside_scalar(xs: &[f64], ys: &[f64]) -> u32 {
    debug_assert_eq!(xs.len(), ys.len());
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| u32::from(is_inside(x, y)))
        .sum()
}

/// One batch worth of coordinates, aligned for full-width vector loads.
#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Lanes(pub [f64; LANES]);

pub use backend::{count_inside, BACKEND, LANES};

#[cfg(all(
    not(feature = "scalar-kernel"),
    target_arch = "x86_64",
    target_feature = "avx"
))]
mod backend {
    use super::Lanes;
    use std::arch::x86_64::*;

    pub const LANES: usize = 4;
    pub const BACKEND: &str = "avx";

    /// Hits among the four lanes, in `[0, 4]`.
    #[inline(always)]
    pub fn count_inside(xs: &Lanes, ys: &Lanes) -> u32 {
        // Safety: AVX is enabled for this build and `Lanes` is 32-byte aligned.
        unsafe {
            let x = _mm256_load_pd(xs.0.as_ptr());
            let y = _mm256_load_pd(ys.0.as_ptr());
            let dist2 = _mm256_add_pd(_mm256_mul_pd(x, x), _mm256_mul_pd(y, y));
            let inside = _mm256_cmp_pd::<_CMP_LE_OQ>(dist2, _mm256_set1_pd(1.0));
            (_mm256_movemask_pd(inside) as u32).count_ones()
        }
    }
}

#[cfg(all(
    not(feature = "scalar-kernel"),
    target_arch = "x86_64",
    not(target_feature = "avx")
))]
mod backend {
    use super::Lanes;
    use std::arch::x86_64::*;

    pub const LANES: usize = 2;
    pub const BACKEND: &str = "sse2";

    /// Hits among the two lanes, in `[0, 2]`.
    #[inline(always)]
    pub fn count_inside(xs: &Lanes, ys: &Lanes) -> u32 {
        // Safety: SSE2 is part of the x86_64 baseline and `Lanes` is aligned.
        unsafe {
            let x = _mm_load_pd(xs.0.as_ptr());
            let y = _mm_load_pd(ys.0.as_ptr());
            let dist2 = _mm_add_pd(_mm_mul_pd(x, x), _mm_mul_pd(y, y));
            let inside = _mm_cmple_pd(dist2, _mm_set1_pd(1.0));
            (_mm_movemask_pd(inside) as u32).count_ones()
        }
    }
}

#[cfg(all(
    not(feature = "scalar-kernel"),
    target_arch = "aarch64",
    target_feature = "neon"
))]
mod backend {
    use super::Lanes;
    use std::arch::aarch64::*;

    pub const LANES: usize = 2;
    pub const BACKEND: &str = "neon";

    /// Hits among the two lanes, in `[0, 2]`.
    #[inline(always)]
    pub fn count_inside(xs: &Lanes, ys: &Lanes) -> u32 {
        // Safety: NEON is enabled for this build and both loads read two f64s.
        unsafe {
            let x = vld1q_f64(xs.0.as_ptr());
            let y = vld1q_f64(ys.0.as_ptr());
            let dist2 = vaddq_f64(vmulq_f64(x, x), vmulq_f64(y, y));
            let inside = vcleq_f64(dist2, vdupq_n_f64(1.0));
            // Lanes are all-ones or all-zeros; keep one bit per lane.
            let mask =
                (vgetq_lane_u64::<0>(inside) & 1) | ((vgetq_lane_u64::<1>(inside) & 1) << 1);
            (mask as u32).count_ones()
        }
    }
}

#[cfg(any(
    feature = "scalar-kernel",
    not(any(
        target_arch = "x86_64",
        all(target_arch = "aarch64", target_feature = "neon")
    ))
))]
mod backend {
    use super::Lanes;

    pub const LANES: usize = 1;
    pub const BACKEND: &str = "scalar";

    #[inline(always)]
    pub fn count_inside(xs: &Lanes, ys: &Lanes) -> u32 {
        super::count_inside_scalar(&xs.0, &ys.0)
    }
}

/// How a trial count divides into full batches and a scalar tail.
///
/// `batches * width + remainder == trials` always holds; the tail is
/// never padded or masked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSplit {
    pub batches: u64,
    pub remainder: u64,
}

impl BatchSplit {
    pub fn new(trials: u64, width: usize) -> Self {
        debug_assert!(width > 0);
        let width = width.max(1) as u64;
        Self {
            batches: trials / width,
            remainder: trials % width,
        }
    }

    /// Split for this build's [`LANES`].
    #[inline]
    pub fn for_build(trials: u64) -> Self {
        Self::new(trials, LANES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundary_is_inside() {
        assert!(is_inside(1.0, 0.0));
        assert!(is_inside(0.0, 1.0));
        assert!(is_inside(0.0, 0.0));
        assert!(is_inside(0.7071, 0.7071));
        assert!(!is_inside(0.99, 0.99));
        assert!(!is_inside(1.0, 0.5));
    }

    #[test]
    fn test_backend_lane_count() {
        assert!(matches!(LANES, 1 | 2 | 4));
        match BACKEND {
            "avx" => assert_eq!(LANES, 4),
            "sse2" | "neon" => assert_eq!(LANES, 2),
            "scalar" => assert_eq!(LANES, 1),
            other => panic!("unexpected backend {other}"),
        }
    }

    #[test]
    fn test_lanes_alignment() {
        let lanes = Lanes::default();
        assert_eq!(&lanes as *const Lanes as usize % 32, 0);
    }

    #[test]
    fn test_all_inside_and_all_outside() {
        let zeros = Lanes([0.0; LANES]);
        assert_eq!(count_inside(&zeros, &zeros), LANES as u32);

        let ones = Lanes([1.0; LANES]);
        assert_eq!(count_inside(&ones, &ones), 0);

        // Exactly on the circle in every lane.
        assert_eq!(count_inside(&ones, &zeros), LANES as u32);
    }

    #[test]
    fn test_split_scenarios() {
        assert_eq!(
            BatchSplit::new(4, 4),
            BatchSplit {
                batches: 1,
                remainder: 0
            }
        );
        assert_eq!(
            BatchSplit::new(5, 4),
            BatchSplit {
                batches: 1,
                remainder: 1
            }
        );
        assert_eq!(
            BatchSplit::new(0, 4),
            BatchSplit {
                batches: 0,
                remainder: 0
            }
        );
        assert_eq!(
            BatchSplit::new(7, 1),
            BatchSplit {
                batches: 7,
                remainder: 0
            }
        );
    }

    fn coordinate() -> impl Strategy<Value = f64> {
        prop_oneof![
            0.0f64..1.0,
            Just(0.0),
            Just(1.0),
            Just(std::f64::consts::FRAC_1_SQRT_2),
        ]
    }

    proptest! {
        #[test]
        fn prop_batch_matches_scalar(
            xs in prop::array::uniform4(coordinate()),
            ys in prop::array::uniform4(coordinate()),
        ) {
            let mut bx = Lanes::default();
            let mut by = Lanes::default();
            bx.0.copy_from_slice(&xs[..LANES]);
            by.0.copy_from_slice(&ys[..LANES]);
            prop_assert_eq!(
                count_inside(&bx, &by),
                count_inside_scalar(&xs[..LANES], &ys[..LANES])
            );
        }

        #[test]
        fn prop_split_is_exact(trials in 0u64..10_000_000, width in 1usize..16) {
            let split = BatchSplit::new(trials, width);
            prop_assert!(split.remainder < width as u64);
            prop_assert_eq!(split.batches * width as u64 + split.remainder, trials);
        }
    }
}
