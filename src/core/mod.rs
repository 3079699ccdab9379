mod engine;
mod error;
mod rng;
mod runner;
mod summary;
mod sweep;
mod types;
mod wealth;

pub use engine::{
    DRIFT_TOLERANCE, advance_round, apply_flat_tax, apply_growth, eliminate_below_limit,
    renormalize,
};
pub use error::SimError;
pub use rng::{RandomSource, Rng, derive_seed};
pub use runner::{RunState, SimulationRunner, run_simulation};
pub use summary::{DEFAULT_TOP_PERCENT, Summary, gini, summary_line, top_share_percent};
pub use sweep::{DEFAULT_TAX_FRACTIONS, DEFAULT_VOLATILITIES, SweepPoint, run_sweep};
pub use types::{MAX_AGENTS, MAX_HISTORY_CELLS, RoundReport, SimulationConfig, SimulationOutcome};
pub use wealth::WealthState;
