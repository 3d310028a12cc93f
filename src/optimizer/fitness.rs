//! Fitness evaluation: penalized Sharpe ratio of an allocation

use crate::error::OptimizerError;
use crate::types::{HistoricalData, OptimizationContext, RiskBudget};

/// Risk-free rate used in the Sharpe ratio
pub const RISK_FREE_RATE: f64 = 0.02;

/// Penalty per unit of budget breach
pub const PENALTY_WEIGHT: f64 = 100.0;

/// Upper bound on each penalty term, keeps fitness finite for infinite budgets
pub const PENALTY_CAP: f64 = 1e12;

/// Breakdown of one fitness evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub penalty: f64,
    pub fitness: f64,
}

/// Scores allocations against one context's history and risk budget
#[derive(Debug, Clone)]
pub struct FitnessEvaluator<'a> {
    data: &'a HistoricalData,
    mean_returns: Vec<f64>,
    budget: RiskBudget,
}

impl<'a> FitnessEvaluator<'a> {
    /// The context must already be validated
    pub fn new(context: &'a OptimizationContext) -> Self {
        Self {
            data: &context.historical_data,
            mean_returns: context.historical_data.mean_returns(),
            budget: context.constraints.risk_budget,
        }
    }

    pub fn mean_returns(&self) -> &[f64] {
        &self.mean_returns
    }

    /// Σ w_i · mean(r_i)
    pub fn expected_return(&self, weights: &[f64]) -> f64 {
        weights
            .iter()
            .zip(&self.mean_returns)
            .map(|(w, mu)| w * mu)
            .sum()
    }

    /// sqrt(Σ_i Σ_j w_i w_j σ_i σ_j ρ_ij)
    pub fn volatility(&self, weights: &[f64]) -> f64 {
        let vol = &self.data.volatility;
        let corr = &self.data.correlation;
        let n = weights.len();
        let mut variance = 0.0;
        for i in 0..n {
            for j in 0..n {
                variance += weights[i] * weights[j] * vol[i] * vol[j] * corr[i][j];
            }
        }
        variance.max(0.0).sqrt()
    }

    pub fn sharpe_ratio(expected_return: f64, volatility: f64) -> Result<f64, OptimizerError> {
        if volatility <= 0.0 {
            return Err(OptimizerError::UndefinedMetric(
                "Sharpe ratio undefined for zero portfolio volatility".to_string(),
            ));
        }
        Ok((expected_return - RISK_FREE_RATE) / volatility)
    }

    pub fn evaluate(&self, weights: &[f64]) -> Result<Evaluation, OptimizerError> {
        let expected_return = self.expected_return(weights);
        let volatility = self.volatility(weights);
        let sharpe_ratio = Self::sharpe_ratio(expected_return, volatility)?;

        let mut penalty = 0.0;
        if volatility > self.budget.max_volatility {
            penalty += penalty_term(volatility - self.budget.max_volatility);
        }
        if sharpe_ratio < self.budget.min_sharpe_ratio {
            penalty += penalty_term(self.budget.min_sharpe_ratio - sharpe_ratio);
        }

        Ok(Evaluation {
            expected_return,
            volatility,
            sharpe_ratio,
            penalty,
            fitness: sharpe_ratio - penalty,
        })
    }

    pub fn fitness(&self, weights: &[f64]) -> Result<f64, OptimizerError> {
        self.evaluate(weights).map(|e| e.fitness)
    }
}

fn penalty_term(shortfall: f64) -> f64 {
    (shortfall * PENALTY_WEIGHT).min(PENALTY_CAP)
}
