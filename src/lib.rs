//! Quantum-Perturbed Swarm Portfolio Optimizer
//!
//! Searches long-only allocation vectors that maximize a penalized Sharpe ratio
//! under a volatility/Sharpe risk budget.
//!
//! ## Architecture
//!
//! ```text
//! OptimizationContext → Optimizer Core (quantum grid + swarm) → Fitness Evaluator
//!                                    ↓
//!                             Result Builder → OptimizationResult
//! ```

pub mod config;
pub mod error;
pub mod optimizer;
pub mod runner;
pub mod types;

pub use config::{Config, DegeneratePolicy, OptimizerConfig};
pub use error::{Error, OptimizerError, Result};
pub use optimizer::QuantumSwarmOptimizer;
pub use types::{
    Asset, ConstraintReport, ConstraintViolation, HistoricalData, MarketRegime,
    OptimizationConstraints, OptimizationContext, OptimizationResult, RiskBudget, RiskMetrics,
    SectorBounds,
};
