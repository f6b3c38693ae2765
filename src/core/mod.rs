mod engine;
mod rng;
mod stats;
mod types;

pub use engine::{CancelFlag, SimulationHook, generate, generate_with_hook};
pub use rng::entropy_seed;
pub use stats::{
    DEFAULT_HISTOGRAM_BINS, histogram, median, percentile, summarize, summarize_by_year,
};
pub use types::{
    Histogram, SimulationError, SimulationParameters, SummaryStatistics, TrajectoryTable,
    YearBand,
};
