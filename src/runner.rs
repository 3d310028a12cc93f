//! Context loading and concurrent batch runs

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::optimizer::QuantumSwarmOptimizer;
use crate::types::{OptimizationContext, OptimizationResult};

/// Read a JSON optimization context from disk
pub fn load_context(path: impl AsRef<Path>) -> Result<OptimizationContext> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let context: OptimizationContext = serde_json::from_str(&raw)?;
    Ok(context)
}

/// Outcome of one context in a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub label: String,
    pub result: Result<OptimizationResult>,
}

/// Run each context on the blocking pool. Outcomes come back in input order.
pub async fn run_batch(
    optimizer: Arc<QuantumSwarmOptimizer>,
    contexts: Vec<(String, OptimizationContext)>,
) -> Vec<BatchOutcome> {
    let mut tasks = JoinSet::new();
    let labels: Vec<String> = contexts.iter().map(|(label, _)| label.clone()).collect();

    for (index, (label, context)) in contexts.into_iter().enumerate() {
        let optimizer = optimizer.clone();
        tasks.spawn_blocking(move || {
            tracing::debug!("Optimizing {}", label);
            (index, optimizer.optimize(&context).map_err(Error::from))
        });
    }

    let mut slots: Vec<Option<Result<OptimizationResult>>> = labels.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => tracing::error!("Batch task failed: {}", e),
        }
    }

    labels
        .into_iter()
        .zip(slots)
        .map(|(label, slot)| BatchOutcome {
            label,
            result: slot.unwrap_or_else(|| {
                Err(Error::Task("optimization task panicked".to_string()))
            }),
        })
        .collect()
}
