//! Privacy budget allocation across columns
//!
//! The total epsilon of a release is split across columns by a fixed weight
//! table: `column_epsilon = total_epsilon * weight`. The weight table is a
//! policy decision supplied as configuration, never derived from data.
//! Columns without a weight are not privatized.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validate a weight table: every weight finite and in (0, 1]
pub fn validate_weights(weights: &BTreeMap<String, f64>) -> Result<()> {
    for (name, &weight) in weights {
        if !weight.is_finite() || weight <= 0.0 || weight > 1.0 {
            return Err(Error::Config(format!(
                "Epsilon weight for '{}' must be in (0, 1], got {}",
                name, weight
            )));
        }
    }
    Ok(())
}

/// Validate a total privacy budget
pub fn validate_epsilon(total_epsilon: f64) -> Result<()> {
    if !total_epsilon.is_finite() || total_epsilon <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "Total epsilon must be finite and strictly positive, got {}",
            total_epsilon
        )));
    }
    Ok(())
}

/// Per-column epsilon for one release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsilonAllocation {
    /// Total budget that was split
    pub total_epsilon: f64,
    /// Column name → allocated epsilon
    pub per_column: BTreeMap<String, f64>,
}

impl EpsilonAllocation {
    /// Allocated epsilon, or `None` when the column is pass-through
    pub fn epsilon_for(&self, column: &str) -> Option<f64> {
        self.per_column.get(column).copied()
    }

    /// Whether the column receives noise
    pub fn is_privatized(&self, column: &str) -> bool {
        self.per_column.contains_key(column)
    }

    /// Sum of the allocated epsilons (basic sequential composition)
    pub fn spent(&self) -> f64 {
        self.per_column.values().sum()
    }
}

/// Splits a total privacy budget by a fixed weight table
#[derive(Debug, Clone)]
pub struct BudgetAllocator {
    weights: BTreeMap<String, f64>,
}

impl BudgetAllocator {
    /// Create an allocator, rejecting invalid weight tables
    pub fn new(weights: BTreeMap<String, f64>) -> Result<Self> {
        validate_weights(&weights)?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Split `total_epsilon` across the weight table
    pub fn allocate(&self, total_epsilon: f64) -> Result<EpsilonAllocation> {
        validate_epsilon(total_epsilon)?;

        let mut per_column = BTreeMap::new();
        for (name, &weight) in &self.weights {
            let epsilon = total_epsilon * weight;
            if epsilon <= 0.0 || !epsilon.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "Epsilon for '{}' is {} (total {} x weight {})",
                    name, epsilon, total_epsilon, weight
                )));
            }
            per_column.insert(name.clone(), epsilon);
        }

        Ok(EpsilonAllocation {
            total_epsilon,
            per_column,
        })
    }
}

/// One-shot allocation: `column_epsilon[name] = total_epsilon * weights[name]`
pub fn allocate(
    total_epsilon: f64,
    weights: &BTreeMap<String, f64>,
) -> Result<EpsilonAllocation> {
    BudgetAllocator::new(weights.clone())?.allocate(total_epsilon)
}
