use serde::Serialize;
use thiserror::Error;

/// Immutable model parameters shared by every simulation run.
///
/// Rates are annualized fractions (0.05 = 5%), `dt` is the fraction of a
/// trading year covered by one step. By convention `dt * horizon_steps`
/// spans one trading year; this is assumed by the model, not enforced.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub initial_price: f64,
    pub annual_drift: f64,
    pub annual_volatility: f64,
    pub horizon_steps: usize,
    pub dt: f64,
    pub stress_threshold: f64,
    pub stress_multiplier: f64,
    pub stress_duration: u32,
    pub position_size: f64,
    pub simulations: usize,
    pub workers: usize,
    pub seed: u64,
}

impl SimulationConfig {
    /// Rejects any parameter that violates the documented constraints.
    /// Runs before any simulation starts so a bad configuration can never
    /// produce a partial matrix.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_price.is_finite() || self.initial_price <= 0.0 {
            return Err(EngineError::Config(
                "initial price must be a positive finite number".to_string(),
            ));
        }
        if self.horizon_steps == 0 {
            return Err(EngineError::Config(
                "horizon must be at least one step".to_string(),
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(EngineError::Config("step size must be > 0".to_string()));
        }
        if !self.annual_drift.is_finite() {
            return Err(EngineError::Config("drift must be finite".to_string()));
        }
        if !self.annual_volatility.is_finite() || self.annual_volatility < 0.0 {
            return Err(EngineError::Config(
                "volatility must be finite and >= 0".to_string(),
            ));
        }
        if !self.stress_threshold.is_finite() || self.stress_threshold >= 0.0 {
            return Err(EngineError::Config(
                "stress threshold must be a negative return rate".to_string(),
            ));
        }
        if !self.stress_multiplier.is_finite() || self.stress_multiplier <= 1.0 {
            return Err(EngineError::Config(
                "stress multiplier must be > 1".to_string(),
            ));
        }
        if self.stress_duration == 0 {
            return Err(EngineError::Config(
                "stress duration must be at least one step".to_string(),
            ));
        }
        if !self.position_size.is_finite() {
            return Err(EngineError::Config(
                "position size must be finite".to_string(),
            ));
        }
        if self.simulations == 0 {
            return Err(EngineError::Config(
                "simulation count must be > 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(EngineError::Config("worker count must be > 0".to_string()));
        }
        Ok(())
    }
}

/// One completed simulation run: OTE per step, indexed by step number.
pub type Path = Vec<f64>;

/// The full rectangular collection of runs, run-major. Row order carries no
/// meaning downstream; aggregation reduces per column.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatrix {
    pub paths: Vec<Path>,
    pub steps: usize,
}

impl PathMatrix {
    pub fn runs(&self) -> usize {
        self.paths.len()
    }
}

/// Per-step distribution statistics across all runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub day: usize,
    pub mean_ote: f64,
    pub min_ote: f64,
    pub max_ote: f64,
    pub p5_ote: f64,
    pub p95_ote: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("execution failure: {0}")]
    Execution(String),
    #[error("non-finite price produced at step {step}")]
    NonFinitePrice { step: usize },
}
