//! Result construction and post-hoc risk metrics

use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::fitness::FitnessEvaluator;
use super::quantum::QuantumGrid;
use crate::error::OptimizerError;
use crate::types::{
    ConstraintReport, ConstraintViolation, HistoricalData, OptimizationContext, OptimizationResult,
    RiskMetrics,
};

/// Weights at or below this count as not held
pub const HOLDING_EPSILON: f64 = 1e-6;

/// Per-period weighted return of the portfolio
pub fn portfolio_returns(data: &HistoricalData, weights: &[f64]) -> Vec<f64> {
    (0..data.periods())
        .map(|t| {
            weights
                .iter()
                .zip(&data.returns)
                .map(|(w, series)| w * series[t])
                .sum()
        })
        .collect()
}

/// Largest relative fall from a running peak of the per-period return series
///
/// Works on raw period returns, not a compounded equity curve, so the peak
/// must stay positive for the ratio to be defined.
pub fn max_drawdown(data: &HistoricalData, weights: &[f64]) -> Result<f64, OptimizerError> {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for (t, value) in portfolio_returns(data, weights).into_iter().enumerate() {
        if value > peak {
            peak = value;
        }
        if peak <= 0.0 {
            return Err(OptimizerError::UndefinedMetric(format!(
                "drawdown undefined for non-positive peak {} at period {}",
                peak, t
            )));
        }
        worst = worst.max((peak - value) / peak);
    }

    Ok(worst)
}

/// Check the final allocation against the declared constraints
pub fn constraint_report(
    context: &OptimizationContext,
    weights: &[f64],
    volatility: f64,
    sharpe_ratio: f64,
    drawdown: f64,
) -> ConstraintReport {
    let constraints = &context.constraints;
    let mut violations = Vec::new();

    for (asset, &w) in context.assets.iter().zip(weights) {
        if w < constraints.min_allocation {
            violations.push(ConstraintViolation::AssetBelowMin {
                symbol: asset.symbol.clone(),
                weight: w,
                min: constraints.min_allocation,
            });
        }
        if w > constraints.max_allocation {
            violations.push(ConstraintViolation::AssetAboveMax {
                symbol: asset.symbol.clone(),
                weight: w,
                max: constraints.max_allocation,
            });
        }
    }

    let positions = weights.iter().filter(|w| **w > HOLDING_EPSILON).count();
    if positions < constraints.min_positions {
        violations.push(ConstraintViolation::TooFewPositions {
            count: positions,
            min: constraints.min_positions,
        });
    }
    if constraints.max_positions > 0 && positions > constraints.max_positions {
        violations.push(ConstraintViolation::TooManyPositions {
            count: positions,
            max: constraints.max_positions,
        });
    }

    let mut sector_weights: BTreeMap<String, f64> = BTreeMap::new();
    for (asset, &w) in context.assets.iter().zip(weights) {
        if let Some(sector) = &asset.sector {
            *sector_weights.entry(sector.clone()).or_insert(0.0) += w;
        }
    }
    for (sector, bounds) in &constraints.sector_limits {
        let total = sector_weights.get(sector).copied().unwrap_or(0.0);
        if total < bounds.min_allocation {
            violations.push(ConstraintViolation::SectorBelowMin {
                sector: sector.clone(),
                weight: total,
                min: bounds.min_allocation,
            });
        }
        if total > bounds.max_allocation {
            violations.push(ConstraintViolation::SectorAboveMax {
                sector: sector.clone(),
                weight: total,
                max: bounds.max_allocation,
            });
        }
    }

    let budget = &constraints.risk_budget;
    if volatility > budget.max_volatility {
        violations.push(ConstraintViolation::VolatilityBudget {
            volatility,
            max: budget.max_volatility,
        });
    }
    if sharpe_ratio < budget.min_sharpe_ratio {
        violations.push(ConstraintViolation::SharpeBudget {
            sharpe_ratio,
            min: budget.min_sharpe_ratio,
        });
    }
    if drawdown > budget.max_drawdown {
        violations.push(ConstraintViolation::DrawdownBudget {
            drawdown,
            max: budget.max_drawdown,
        });
    }

    ConstraintReport {
        positions,
        sector_weights,
        violations,
    }
}

/// Final search state handed to the result builder
#[derive(Debug)]
pub struct SearchOutcome {
    pub run_id: Uuid,
    pub best_position: Vec<f64>,
    pub best_fitness: f64,
    pub grid: QuantumGrid,
    pub iterations: usize,
    pub converged: bool,
    pub fitness_history: Vec<f64>,
}

/// Packages the global best into an [`OptimizationResult`]
pub struct ResultBuilder<'a> {
    context: &'a OptimizationContext,
    evaluator: &'a FitnessEvaluator<'a>,
}

impl<'a> ResultBuilder<'a> {
    pub fn new(context: &'a OptimizationContext, evaluator: &'a FitnessEvaluator<'a>) -> Self {
        Self { context, evaluator }
    }

    pub fn build(&self, outcome: SearchOutcome) -> Result<OptimizationResult, OptimizerError> {
        let allocation = outcome.best_position;
        let evaluation = self.evaluator.evaluate(&allocation)?;
        let drawdown = max_drawdown(&self.context.historical_data, &allocation)?;
        let confidence = outcome.grid.average_coherence().clamp(0.0, 1.0);

        let constraints = constraint_report(
            self.context,
            &allocation,
            evaluation.volatility,
            evaluation.sharpe_ratio,
            drawdown,
        );

        Ok(OptimizationResult {
            run_id: outcome.run_id,
            symbols: self.context.symbols(),
            expected_return: evaluation.expected_return,
            confidence,
            metrics: RiskMetrics {
                sharpe_ratio: outcome.best_fitness,
                volatility: evaluation.volatility,
                max_drawdown: drawdown,
            },
            allocation,
            iterations: outcome.iterations,
            converged: outcome.converged,
            fitness_history: outcome.fitness_history,
            constraints,
            completed_at: Utc::now(),
        })
    }
}
