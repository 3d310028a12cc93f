//! Core data types for portfolio optimization

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::OptimizerError;

/// Asset available for allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    /// Last traded price (informational)
    pub price: Decimal,
    /// Recent traded volume (informational)
    pub volume: Decimal,
    /// Historical volatility scalar
    pub volatility: f64,
    /// Sector tag used by the constraint report
    #[serde(default)]
    pub sector: Option<String>,
}

impl Asset {
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        volume: Decimal,
        volatility: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            volatility,
            sector: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// Market regime classification. Carried through for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MarketRegime {
    /// Strong upward trend
    BullishTrend,
    /// Strong downward trend
    BearishTrend,
    /// Sideways consolidation
    Ranging,
    /// High volatility, no clear direction
    Volatile,
    /// Extreme market stress
    Crisis,
    /// Insufficient data to determine
    #[default]
    Unknown,
}

/// Allocation bounds for one sector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorBounds {
    #[serde(default)]
    pub min_allocation: f64,
    #[serde(default = "default_max_allocation")]
    pub max_allocation: f64,
}

/// Risk budget. Only `max_volatility` and `min_sharpe_ratio` feed the fitness penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBudget {
    #[serde(default = "default_max_volatility")]
    pub max_volatility: f64,
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: f64,
    #[serde(default)]
    pub min_sharpe_ratio: f64,
}

impl Default for RiskBudget {
    fn default() -> Self {
        Self {
            max_volatility: default_max_volatility(),
            max_drawdown: default_max_drawdown(),
            min_sharpe_ratio: 0.0,
        }
    }
}

/// Portfolio constraints
///
/// Per-asset bounds, position counts and sector bounds are not enforced by the
/// search; they are checked after the fact by the constraint report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConstraints {
    /// Risk tolerance (0-1)
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: f64,
    /// Minimum weight per asset
    #[serde(default)]
    pub min_allocation: f64,
    /// Maximum weight per asset
    #[serde(default = "default_max_allocation")]
    pub max_allocation: f64,
    /// Minimum number of held assets
    #[serde(default = "default_min_positions")]
    pub min_positions: usize,
    /// Maximum number of held assets (0 = unlimited)
    #[serde(default)]
    pub max_positions: usize,
    /// Sector name -> allocation bounds
    #[serde(default)]
    pub sector_limits: BTreeMap<String, SectorBounds>,
    #[serde(default)]
    pub risk_budget: RiskBudget,
}

impl Default for OptimizationConstraints {
    fn default() -> Self {
        Self {
            risk_tolerance: default_risk_tolerance(),
            min_allocation: 0.0,
            max_allocation: default_max_allocation(),
            min_positions: default_min_positions(),
            max_positions: 0,
            sector_limits: BTreeMap::new(),
            risk_budget: RiskBudget::default(),
        }
    }
}

fn default_risk_tolerance() -> f64 {
    0.5
}

fn default_max_allocation() -> f64 {
    1.0
}

fn default_min_positions() -> usize {
    1
}

fn default_max_volatility() -> f64 {
    1.0
}

fn default_max_drawdown() -> f64 {
    1.0
}

/// Historical market data, index-aligned with the asset list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    /// Return series per asset [asset][time]
    pub returns: Vec<Vec<f64>>,
    /// Volatility per asset
    pub volatility: Vec<f64>,
    /// Correlation matrix [asset][asset]
    pub correlation: Vec<Vec<f64>>,
}

impl HistoricalData {
    /// Number of observations per asset (0 when empty)
    pub fn periods(&self) -> usize {
        self.returns.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Arithmetic mean of each asset's return series
    pub fn mean_returns(&self) -> Vec<f64> {
        self.returns
            .iter()
            .map(|series| series.iter().sum::<f64>() / series.len() as f64)
            .collect()
    }
}

/// Everything one optimization run consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationContext {
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub constraints: OptimizationConstraints,
    #[serde(default)]
    pub market_regime: MarketRegime,
    pub historical_data: HistoricalData,
}

impl OptimizationContext {
    /// Number of assets (search dimensionality)
    pub fn dimensions(&self) -> usize {
        self.assets.len()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.symbol.clone()).collect()
    }

    /// Check that every array is shaped to the asset list and holds usable numbers
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let n = self.assets.len();
        if n == 0 {
            return Err(OptimizerError::InvalidInput("no assets supplied".to_string()));
        }

        let data = &self.historical_data;
        if data.returns.len() != n {
            return Err(OptimizerError::InvalidInput(format!(
                "returns matrix has {} rows, expected {}",
                data.returns.len(),
                n
            )));
        }

        let periods = data.periods();
        if periods == 0 {
            return Err(OptimizerError::InvalidInput(
                "return series must contain at least one observation".to_string(),
            ));
        }
        for (i, series) in data.returns.iter().enumerate() {
            if series.len() != periods {
                return Err(OptimizerError::InvalidInput(format!(
                    "return series for {} has {} observations, expected {}",
                    self.assets[i].symbol,
                    series.len(),
                    periods
                )));
            }
            if series.iter().any(|r| !r.is_finite()) {
                return Err(OptimizerError::InvalidInput(format!(
                    "return series for {} contains non-finite values",
                    self.assets[i].symbol
                )));
            }
        }

        if data.volatility.len() != n {
            return Err(OptimizerError::InvalidInput(format!(
                "volatility vector has {} entries, expected {}",
                data.volatility.len(),
                n
            )));
        }
        if let Some(i) = data.volatility.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(OptimizerError::InvalidInput(format!(
                "volatility for {} must be finite and non-negative",
                self.assets[i].symbol
            )));
        }

        if data.correlation.len() != n {
            return Err(OptimizerError::InvalidInput(format!(
                "correlation matrix has {} rows, expected {}",
                data.correlation.len(),
                n
            )));
        }
        for row in &data.correlation {
            if row.len() != n {
                return Err(OptimizerError::InvalidInput(format!(
                    "correlation matrix row has {} columns, expected {}",
                    row.len(),
                    n
                )));
            }
            if row.iter().any(|c| !c.is_finite() || c.abs() > 1.0) {
                return Err(OptimizerError::InvalidInput(
                    "correlation values must lie in [-1, 1]".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Risk metrics of the returned allocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Global best fitness, including any residual penalty
    pub sharpe_ratio: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
}

/// A constraint the final allocation does not meet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    AssetBelowMin { symbol: String, weight: f64, min: f64 },
    AssetAboveMax { symbol: String, weight: f64, max: f64 },
    TooFewPositions { count: usize, min: usize },
    TooManyPositions { count: usize, max: usize },
    SectorBelowMin { sector: String, weight: f64, min: f64 },
    SectorAboveMax { sector: String, weight: f64, max: f64 },
    VolatilityBudget { volatility: f64, max: f64 },
    SharpeBudget { sharpe_ratio: f64, min: f64 },
    DrawdownBudget { drawdown: f64, max: f64 },
}

/// Post-hoc constraint check of the final allocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    /// Number of assets with a non-negligible weight
    pub positions: usize,
    /// Total weight per declared sector
    pub sector_weights: BTreeMap<String, f64>,
    pub violations: Vec<ConstraintViolation>,
}

impl ConstraintReport {
    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Output of one optimization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub run_id: Uuid,
    /// Asset symbols, in allocation order
    pub symbols: Vec<String>,
    pub allocation: Vec<f64>,
    pub expected_return: f64,
    /// Average quantum coherence, clamped to [0, 1]. Not a statistical confidence.
    pub confidence: f64,
    pub metrics: RiskMetrics,
    /// Iterations executed
    pub iterations: usize,
    /// True when the fitness delta test stopped the loop before the cap
    pub converged: bool,
    /// Global best fitness after each iteration
    pub fitness_history: Vec<f64>,
    pub constraints: ConstraintReport,
    pub completed_at: DateTime<Utc>,
}

impl OptimizationResult {
    /// Weight assigned to a symbol
    pub fn weight_of(&self, symbol: &str) -> Option<f64> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.allocation[i])
    }

    pub fn weights_by_symbol(&self) -> BTreeMap<String, f64> {
        self.symbols
            .iter()
            .cloned()
            .zip(self.allocation.iter().copied())
            .collect()
    }
}
