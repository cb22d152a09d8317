use rayon::prelude::*;

use super::engine::{Rng, derive_seed, simulate_path};
use super::partition::{chunk_offsets, chunk_sizes};
use super::types::{EngineError, Path, PathMatrix, SimulationConfig};

/// Runs every simulation on the calling thread, one after another. Baseline
/// for the speedup report; produces the same matrix as `run_parallel`.
pub fn run_sequential(config: &SimulationConfig) -> Result<PathMatrix, EngineError> {
    config.validate()?;

    let mut paths = Vec::with_capacity(config.simulations);
    for run in 0..config.simulations {
        let mut rng = Rng::new(derive_seed(config.seed, run as u64));
        paths.push(simulate_path(config, &mut rng)?);
    }

    Ok(PathMatrix {
        paths,
        steps: config.horizon_steps,
    })
}

/// Fans chunks of runs out across a bounded pool of `config.workers`
/// threads and merges results into a preallocated matrix.
///
/// The matrix rows are split into one mutable slice per chunk at the
/// cumulative offsets before dispatch, so workers write disjoint regions and
/// row `i` always holds run `i` regardless of completion order. Each run
/// seeds its own private generator. Any failed path aborts the whole run;
/// a panicking worker propagates out of the pool rather than yielding a
/// truncated matrix.
pub fn run_parallel(config: &SimulationConfig) -> Result<PathMatrix, EngineError> {
    config.validate()?;

    let sizes = chunk_sizes(config.simulations, config.workers);
    let offsets = chunk_offsets(&sizes);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| EngineError::Execution(format!("failed to build worker pool: {e}")))?;

    let mut paths: Vec<Path> = vec![Vec::new(); config.simulations];
    let mut tasks: Vec<(usize, &mut [Path])> = Vec::with_capacity(sizes.len());
    let mut rest = paths.as_mut_slice();
    for (&size, &offset) in sizes.iter().zip(&offsets) {
        let taken = std::mem::take(&mut rest);
        let (rows, tail) = taken.split_at_mut(size);
        tasks.push((offset, rows));
        rest = tail;
    }

    pool.install(|| {
        tasks.into_par_iter().try_for_each(|(offset, rows)| {
            for (i, row) in rows.iter_mut().enumerate() {
                let run = offset + i;
                let mut rng = Rng::new(derive_seed(config.seed, run as u64));
                *row = simulate_path(config, &mut rng)?;
            }
            Ok(())
        })
    })?;

    Ok(PathMatrix {
        paths,
        steps: config.horizon_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            initial_price: 100.0,
            annual_drift: 0.05,
            annual_volatility: 0.2,
            horizon_steps: 16,
            dt: 1.0 / 16.0,
            stress_threshold: -0.02,
            stress_multiplier: 3.0,
            stress_duration: 4,
            position_size: 1000.0,
            simulations: 13,
            workers: 3,
            seed: 42,
        }
    }

    #[test]
    fn parallel_matches_sequential_exactly() {
        let config = small_config();
        let sequential = run_sequential(&config).expect("sequential run");
        let parallel = run_parallel(&config).expect("parallel run");
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn matrix_is_rectangular_with_one_row_per_run() {
        let config = small_config();
        let matrix = run_parallel(&config).expect("parallel run");
        assert_eq!(matrix.runs(), config.simulations);
        assert_eq!(matrix.steps, config.horizon_steps);
        for path in &matrix.paths {
            assert_eq!(path.len(), config.horizon_steps);
        }
    }

    #[test]
    fn zero_sized_chunks_execute_cleanly() {
        let mut config = small_config();
        config.simulations = 2;
        config.workers = 5;
        let matrix = run_parallel(&config).expect("parallel run");
        assert_eq!(matrix.runs(), 2);
    }

    #[test]
    fn worker_count_beyond_runs_preserves_determinism() {
        let mut config = small_config();
        config.simulations = 3;
        config.workers = 8;
        let sequential = run_sequential(&config).expect("sequential run");
        let parallel = run_parallel(&config).expect("parallel run");
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn invalid_configuration_fails_before_any_simulation() {
        let mut config = small_config();
        config.workers = 0;
        assert!(matches!(
            run_parallel(&config),
            Err(EngineError::Config(_))
        ));

        let mut config = small_config();
        config.simulations = 0;
        assert!(matches!(
            run_sequential(&config),
            Err(EngineError::Config(_))
        ));

        let mut config = small_config();
        config.initial_price = -1.0;
        assert!(matches!(
            run_parallel(&config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn non_finite_price_aborts_the_whole_run() {
        let mut config = small_config();
        // A drift this large overflows exp() on the very first step.
        config.annual_drift = 1e300;
        assert_eq!(
            run_sequential(&config),
            Err(EngineError::NonFinitePrice { step: 0 })
        );
        assert_eq!(
            run_parallel(&config),
            Err(EngineError::NonFinitePrice { step: 0 })
        );
    }
}
