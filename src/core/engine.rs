use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;

use super::rng::{Rng, derive_seed, entropy_seed};
use super::types::{SimulationError, SimulationParameters, TrajectoryTable};

/// Observer for long runs. Both methods are called from worker threads.
pub trait SimulationHook: Sync {
    fn on_progress(&self, _completed: usize, _total: usize) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

impl SimulationHook for () {}

#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl SimulationHook for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Simulate `simulation_count` independent paths of `years` annual
/// log-normal returns. With `seed` set the table is bit-identical across
/// runs; without it a fresh seed is drawn.
pub fn generate(
    params: &SimulationParameters,
    seed: Option<u64>,
) -> Result<TrajectoryTable, SimulationError> {
    generate_with_hook(params, seed, &())
}

pub fn generate_with_hook<H>(
    params: &SimulationParameters,
    seed: Option<u64>,
    hook: &H,
) -> Result<TrajectoryTable, SimulationError>
where
    H: SimulationHook + ?Sized,
{
    params.validate()?;

    let rows = params.simulation_count as usize;
    let columns = params.columns();
    let cells = rows
        .checked_mul(columns)
        .ok_or_else(|| SimulationError::invalid("simulation_count", "table size overflows"))?;
    let base_seed = seed.unwrap_or_else(entropy_seed);

    let _span = tracing::debug_span!("generate", rows, columns, seed = base_seed).entered();

    let mut values = vec![0.0; cells];
    let completed = AtomicUsize::new(0);

    values
        .par_chunks_mut(columns)
        .enumerate()
        .try_for_each(|(index, row)| {
            if hook.is_cancelled() {
                return Err(SimulationError::Cancelled);
            }
            let mut rng = Rng::new(derive_seed(base_seed, index as u64));
            simulate_path(params, &mut rng, row);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            hook.on_progress(done, rows);
            Ok(())
        })
        .inspect_err(|err| tracing::debug!(%err, "generation aborted"))?;

    tracing::debug!("generation finished");
    Ok(TrajectoryTable::from_raw(values, rows, columns))
}

fn simulate_path(params: &SimulationParameters, rng: &mut Rng, row: &mut [f64]) {
    let mut value = params.initial_investment;
    row[0] = value;
    for slot in &mut row[1..] {
        let log_return = rng.normal(params.mu, params.sigma);
        value *= log_return.exp();
        *slot = value;
    }
}
