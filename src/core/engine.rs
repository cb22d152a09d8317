use std::f64::consts::PI;

use super::types::{EngineError, Path, SimulationConfig};

/// Per-path mutable state: lives from the first step to the last, then is
/// discarded. A countdown of zero means the normal volatility regime.
#[derive(Debug)]
struct RegimeState {
    price: f64,
    stress_countdown: u32,
}

/// Generates one complete OTE path of length `config.horizon_steps`,
/// consuming one standard-normal draw per step.
pub fn simulate_path(config: &SimulationConfig, rng: &mut Rng) -> Result<Path, EngineError> {
    let mut state = RegimeState {
        price: config.initial_price,
        stress_countdown: 0,
    };
    let mut ote_values = Vec::with_capacity(config.horizon_steps);

    for step in 0..config.horizon_steps {
        let z = rng.standard_normal();
        let ote = advance(config, &mut state, z);
        if !state.price.is_finite() {
            return Err(EngineError::NonFinitePrice { step });
        }
        ote_values.push(ote);
    }

    Ok(ote_values)
}

/// One step of the discretized GBM recurrence with the volatility-regime
/// rule. Returns the OTE recorded for this step.
///
/// An active countdown elevates this step's volatility and decrements. The
/// trigger check happens after the price update: a realized return strictly
/// below the threshold arms a new episode only when the countdown is zero at
/// that point, so an episode ending this step can re-arm on this same return.
/// The elevation always begins on the following step.
fn advance(config: &SimulationConfig, state: &mut RegimeState, z: f64) -> f64 {
    let sigma = if state.stress_countdown > 0 {
        state.stress_countdown -= 1;
        config.annual_volatility * config.stress_multiplier
    } else {
        config.annual_volatility
    };

    let drift_term = (config.annual_drift - 0.5 * sigma * sigma) * config.dt;
    let shock_term = sigma * config.dt.sqrt() * z;
    let new_price = state.price * (drift_term + shock_term).exp();

    let return_rate = (new_price - state.price) / state.price;
    if return_rate < config.stress_threshold && state.stress_countdown == 0 {
        state.stress_countdown = config.stress_duration;
    }

    state.price = new_price;
    (new_price - config.initial_price) * config.position_size
}

/// Stable per-run seed so that sequential and parallel execution draw
/// identical streams for the same run index.
pub(crate) fn derive_seed(base_seed: u64, run: u64) -> u64 {
    splitmix64(base_seed ^ run)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// xorshift64* generator with Box-Muller normals. Each run owns its own
/// instance; instances are never shared across workers.
pub(crate) struct Rng {
    state: u64,
    cached_normal: Option<f64>,
}

impl Rng {
    pub(crate) fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Self {
            state,
            cached_normal: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    pub(crate) fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        let z0 = r * theta.cos();
        let z1 = r * theta.sin();
        self.cached_normal = Some(z1);
        z0
    }
}
