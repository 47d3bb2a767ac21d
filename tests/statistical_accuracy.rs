//! Statistical accuracy of every strategy.
//!
//! With 10M trials the standard error of `4 * hits / trials` is about
//! 5e-4, so a ±0.01 band fails with negligible probability.

use approx::assert_abs_diff_eq;
use montepi::{Coordinator, EngineConfig, Strategy};
use std::f64::consts::PI;
use tracing_subscriber::EnvFilter;

const TRIALS: u64 = 10_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_every_strategy_approximates_pi() {
    init_tracing();
    let mut coordinator = Coordinator::new(EngineConfig::default()).unwrap();

    for strategy in Strategy::ALL {
        let result = coordinator.run(strategy, TRIALS).unwrap();
        assert_eq!(result.trials(), TRIALS);
        assert!(result.hits() <= TRIALS);
        assert_abs_diff_eq!(result.estimate(), PI, epsilon = 0.01);
        println!("{:>10}: estimate {:.6}", strategy, result.estimate());
    }
}

#[test]
fn test_repeated_vectorized_runs_stay_accurate() {
    init_tracing();
    let mut coordinator = Coordinator::new(EngineConfig::new(4, 4096)).unwrap();

    for _ in 0..3 {
        let result = coordinator.run(Strategy::Vectorized, TRIALS).unwrap();
        assert_abs_diff_eq!(result.estimate(), PI, epsilon = 0.01);
    }
}

#[test]
fn test_uneven_partition_counts_every_trial() {
    init_tracing();
    // 10M + 3 does not divide across 4 workers; the odd trials still run.
    let trials = TRIALS + 3;
    let mut coordinator = Coordinator::new(EngineConfig::new(4, 4096)).unwrap();
    let result = coordinator.run(Strategy::Arena, trials).unwrap();
    assert_eq!(result.trials(), trials);
    assert_abs_diff_eq!(result.estimate(), PI, epsilon = 0.01);
}
