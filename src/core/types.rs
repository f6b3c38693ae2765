use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub initial_investment: f64,
    pub years: u32,
    /// Mean annual log-return.
    pub mu: f64,
    /// Standard deviation of the annual log-return.
    pub sigma: f64,
    pub simulation_count: u32,
}

impl SimulationParameters {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.initial_investment.is_finite() || self.initial_investment <= 0.0 {
            return Err(SimulationError::invalid(
                "initial_investment",
                "must be a finite value > 0",
            ));
        }
        if self.years == 0 {
            return Err(SimulationError::invalid("years", "must be >= 1"));
        }
        if self.simulation_count == 0 {
            return Err(SimulationError::invalid("simulation_count", "must be >= 1"));
        }
        if !self.mu.is_finite() {
            return Err(SimulationError::invalid("mu", "must be finite"));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(SimulationError::invalid(
                "sigma",
                "must be a finite value >= 0",
            ));
        }
        Ok(())
    }

    pub fn columns(&self) -> usize {
        self.years as usize + 1
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("cannot summarize an empty series")]
    EmptyInput,
    #[error("simulation cancelled")]
    Cancelled,
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Row-major matrix of simulated values: one row per path, one column per
/// year including the starting value at column 0.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryTable {
    values: Vec<f64>,
    rows: usize,
    columns: usize,
}

impl TrajectoryTable {
    pub(crate) fn from_raw(values: Vec<f64>, rows: usize, columns: usize) -> Self {
        debug_assert_eq!(values.len(), rows * columns);
        Self {
            values,
            rows,
            columns,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn years(&self) -> u32 {
        (self.columns - 1) as u32
    }

    /// Path `index`, or `None` past the last row.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.values.chunks_exact(self.columns).nth(index)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.columns)
    }

    /// Values of every path at `year`, or `None` past the horizon.
    pub fn column(&self, year: usize) -> Option<Vec<f64>> {
        (year < self.columns).then(|| self.iter_rows().map(|row| row[year]).collect())
    }

    pub fn terminal_values(&self) -> Vec<f64> {
        self.iter_rows().map(|row| row[self.columns - 1]).collect()
    }

    /// First `count` paths, for line charts.
    pub fn select_paths(&self, count: usize) -> Vec<Vec<f64>> {
        self.iter_rows()
            .take(count)
            .map(|row| row.to_vec())
            .collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBand {
    pub year: u32,
    pub p10: f64,
    pub median: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Lower edge of bin `index`.
    pub fn bin_start(&self, index: usize) -> f64 {
        self.min + self.bin_width * index as f64
    }
}
