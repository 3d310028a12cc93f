//! End-to-end tests for the swarm optimizer

use super::*;
use crate::config::{DegeneratePolicy, OptimizerConfig};
use crate::types::{
    Asset, ConstraintViolation, HistoricalData, MarketRegime, OptimizationConstraints,
    OptimizationContext, RiskBudget,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal_macros::dec;

fn config(particles: usize, iterations: usize, convergence_threshold: f64) -> OptimizerConfig {
    OptimizerConfig {
        particles,
        iterations,
        convergence_threshold,
        ..Default::default()
    }
}

fn context(
    returns: Vec<Vec<f64>>,
    volatility: Vec<f64>,
    correlation: Vec<Vec<f64>>,
    risk_budget: RiskBudget,
) -> OptimizationContext {
    let assets = volatility
        .iter()
        .enumerate()
        .map(|(i, v)| Asset::new(format!("ASSET{}", i), dec!(100), dec!(25000), *v))
        .collect();
    OptimizationContext {
        assets,
        constraints: OptimizationConstraints {
            risk_budget,
            ..Default::default()
        },
        market_regime: MarketRegime::Ranging,
        historical_data: HistoricalData {
            returns,
            volatility,
            correlation,
        },
    }
}

fn loose_budget() -> RiskBudget {
    RiskBudget {
        max_volatility: 1.0,
        max_drawdown: 1.0,
        min_sharpe_ratio: -10.0,
    }
}

/// Two assets, uncorrelated
fn two_asset_context() -> OptimizationContext {
    context(
        vec![vec![0.01, 0.02], vec![0.03, 0.01]],
        vec![0.1, 0.2],
        vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        loose_budget(),
    )
}

fn four_asset_context() -> OptimizationContext {
    context(
        vec![
            vec![0.030, 0.020, 0.025, 0.040, 0.035, 0.022],
            vec![0.010, 0.015, 0.012, 0.018, 0.011, 0.016],
            vec![0.050, 0.045, 0.060, 0.030, 0.055, 0.040],
            vec![0.020, 0.025, 0.018, 0.022, 0.030, 0.021],
        ],
        vec![0.15, 0.05, 0.30, 0.10],
        vec![
            vec![1.0, 0.2, 0.4, -0.1],
            vec![0.2, 1.0, 0.1, 0.3],
            vec![0.4, 0.1, 1.0, 0.0],
            vec![-0.1, 0.3, 0.0, 1.0],
        ],
        RiskBudget {
            max_volatility: 0.2,
            max_drawdown: 1.0,
            min_sharpe_ratio: 0.0,
        },
    )
}

fn assert_valid_allocation(allocation: &[f64]) {
    let sum: f64 = allocation.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9, "allocation sums to {}", sum);
    for w in allocation {
        assert!((0.0..=1.0).contains(w), "weight {} out of range", w);
    }
}

#[test]
fn test_two_asset_scenario_beats_corner() {
    let ctx = two_asset_context();
    let optimizer = QuantumSwarmOptimizer::new(config(10, 50, 1e-8)).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);

    let result = optimizer.optimize_with_rng(&ctx, &mut rng).unwrap();

    assert_eq!(result.allocation.len(), 2);
    assert_valid_allocation(&result.allocation);
    assert!(result.iterations <= 50);

    let corner = FitnessEvaluator::new(&ctx).evaluate(&[1.0, 0.0]).unwrap();
    assert!(
        result.metrics.sharpe_ratio >= corner.sharpe_ratio,
        "{} < {}",
        result.metrics.sharpe_ratio,
        corner.sharpe_ratio
    );
}

#[test]
fn test_allocation_valid_across_seeds() {
    let ctx = four_asset_context();
    let optimizer = QuantumSwarmOptimizer::new(config(20, 60, 1e-6)).unwrap();

    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let result = optimizer.optimize_with_rng(&ctx, &mut rng).unwrap();
        assert_eq!(result.allocation.len(), 4);
        assert_valid_allocation(&result.allocation);
        assert!((0.0..=1.0).contains(&result.confidence));
        assert_eq!(result.symbols[2], "ASSET2");
    }
}

#[test]
fn test_same_seed_is_deterministic() {
    let ctx = four_asset_context();
    let optimizer = QuantumSwarmOptimizer::new(config(25, 40, 1e-6)).unwrap();

    let a = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(99))
        .unwrap();
    let b = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(99))
        .unwrap();

    assert_eq!(a.allocation, b.allocation);
    assert_eq!(a.fitness_history, b.fitness_history);
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.confidence, b.confidence);
    assert_eq!(a.iterations, b.iterations);
}

#[test]
fn test_configured_seed_is_deterministic() {
    let ctx = two_asset_context();
    let optimizer = QuantumSwarmOptimizer::new(OptimizerConfig {
        seed: Some(7),
        ..config(15, 30, 1e-8)
    })
    .unwrap();

    let a = optimizer.optimize(&ctx).unwrap();
    let b = optimizer.optimize(&ctx).unwrap();

    assert_eq!(a.allocation, b.allocation);
    assert_eq!(a.fitness_history, b.fitness_history);
    assert_ne!(a.run_id, b.run_id);
}

#[test]
fn test_parallel_matches_sequential() {
    let ctx = four_asset_context();
    let parallel = QuantumSwarmOptimizer::new(OptimizerConfig {
        parallel: true,
        ..config(30, 40, 1e-6)
    })
    .unwrap();
    let sequential = QuantumSwarmOptimizer::new(OptimizerConfig {
        parallel: false,
        ..config(30, 40, 1e-6)
    })
    .unwrap();

    let a = parallel
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(5))
        .unwrap();
    let b = sequential
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(5))
        .unwrap();

    assert_eq!(a.allocation, b.allocation);
    assert_eq!(a.fitness_history, b.fitness_history);
    assert_eq!(a.confidence, b.confidence);
}

#[test]
fn test_infinite_threshold_runs_full_cap() {
    let ctx = two_asset_context();
    let optimizer = QuantumSwarmOptimizer::new(config(8, 37, f64::INFINITY)).unwrap();

    let result = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(1))
        .unwrap();

    assert_eq!(result.iterations, 37);
    assert_eq!(result.fitness_history.len(), 37);
    assert!(!result.converged);
}

#[test]
fn test_global_best_is_monotonic() {
    let ctx = four_asset_context();
    let optimizer = QuantumSwarmOptimizer::new(config(20, 80, f64::INFINITY)).unwrap();

    let result = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(31))
        .unwrap();

    for pair in result.fitness_history.windows(2) {
        assert!(pair[1] >= pair[0], "fitness fell from {} to {}", pair[0], pair[1]);
    }
    assert_eq!(result.metrics.sharpe_ratio, *result.fitness_history.last().unwrap());
}

#[test]
fn test_convergence_stops_early() {
    // A single asset pins every particle to [1.0], so the best never moves
    let ctx = context(
        vec![vec![0.04, 0.05]],
        vec![0.1],
        vec![vec![1.0]],
        loose_budget(),
    );
    let optimizer = QuantumSwarmOptimizer::new(config(5, 100, 1e-6)).unwrap();

    let result = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(3))
        .unwrap();

    assert!(result.converged);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.allocation, vec![1.0]);
}

#[test]
fn test_huge_iteration_cap_still_converges_early() {
    let ctx = context(
        vec![vec![0.04, 0.05]],
        vec![0.1],
        vec![vec![1.0]],
        loose_budget(),
    );
    let optimizer = QuantumSwarmOptimizer::new(config(5, usize::MAX, 1e-6)).unwrap();

    let result = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(3))
        .unwrap();

    assert!(result.converged);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.fitness_history.len(), 2);
}

#[test]
fn test_result_metrics_match_allocation() {
    let ctx = four_asset_context();
    let optimizer = QuantumSwarmOptimizer::new(config(20, 50, 1e-6)).unwrap();

    let result = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(8))
        .unwrap();

    let evaluator = FitnessEvaluator::new(&ctx);
    assert_eq!(result.expected_return, evaluator.expected_return(&result.allocation));
    assert_eq!(result.metrics.volatility, evaluator.volatility(&result.allocation));
    assert_eq!(
        result.metrics.max_drawdown,
        max_drawdown(&ctx.historical_data, &result.allocation).unwrap()
    );
    assert_eq!(result.weight_of("ASSET1"), Some(result.allocation[1]));
}

#[test]
fn test_penalty_dominated_budget_terminates() {
    let mut ctx = four_asset_context();
    ctx.constraints.risk_budget = RiskBudget {
        max_volatility: 0.0,
        max_drawdown: 1.0,
        min_sharpe_ratio: f64::INFINITY,
    };
    let optimizer = QuantumSwarmOptimizer::new(config(15, 40, 1e-6)).unwrap();

    let result = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(12))
        .unwrap();

    assert!(result.iterations <= 40);
    assert!(result.metrics.sharpe_ratio.is_finite());
    assert!(result.metrics.sharpe_ratio < -1e6);
    assert_valid_allocation(&result.allocation);
    assert!(result
        .constraints
        .violations
        .iter()
        .any(|v| matches!(v, ConstraintViolation::VolatilityBudget { .. })));
    assert!(result
        .constraints
        .violations
        .iter()
        .any(|v| matches!(v, ConstraintViolation::SharpeBudget { .. })));
}

#[test]
fn test_malformed_returns_rejected() {
    let mut ctx = two_asset_context();
    ctx.historical_data.returns.pop();
    let optimizer = QuantumSwarmOptimizer::new(config(10, 10, 1e-6)).unwrap();

    let err = optimizer
        .optimize_with_rng(&ctx, &mut StdRng::seed_from_u64(0))
        .unwrap_err();
    assert!(matches!(err, OptimizerError::InvalidInput(_)));
}

#[test]
fn test_invalid_config_rejected() {
    for bad in [
        config(0, 10, 1e-6),
        config(10, 0, 1e-6),
        config(10, 10, -1.0),
        config(10, 10, f64::NAN),
    ] {
        let err = QuantumSwarmOptimizer::new(bad).unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidConfig(_)));
    }
}

/// Single-asset swarm where the raw position is 1 + |amp|·cos(phase): particles with
/// |amp| > 1 regularly clamp to zero.
fn collapsing_context() -> OptimizationContext {
    context(
        vec![vec![0.04, 0.05]],
        vec![0.1],
        vec![vec![1.0]],
        loose_budget(),
    )
}

#[test]
fn test_degenerate_abort_policy() {
    let optimizer = QuantumSwarmOptimizer::new(OptimizerConfig {
        degenerate_policy: DegeneratePolicy::Abort,
        ..config(50, 200, f64::INFINITY)
    })
    .unwrap();

    let err = optimizer
        .optimize_with_rng(&collapsing_context(), &mut StdRng::seed_from_u64(17))
        .unwrap_err();
    assert!(matches!(err, OptimizerError::DegenerateState(_)));
}

#[test]
fn test_degenerate_retain_policy() {
    let optimizer = QuantumSwarmOptimizer::new(config(50, 200, f64::INFINITY)).unwrap();

    let result = optimizer
        .optimize_with_rng(&collapsing_context(), &mut StdRng::seed_from_u64(17))
        .unwrap();
    assert_eq!(result.allocation, vec![1.0]);
    assert_eq!(result.iterations, 200);
}
