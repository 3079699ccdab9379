use serde::Serialize;
use tracing::info;

use super::error::SimError;
use super::rng::derive_seed;
use super::runner::SimulationRunner;
use super::summary::Summary;
use super::types::SimulationConfig;

pub const DEFAULT_VOLATILITIES: [f64; 4] = [0.1, 0.2, 0.3, 0.4];
pub const DEFAULT_TAX_FRACTIONS: [f64; 5] = [0.01, 0.05, 0.1, 0.2, 0.4];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepPoint {
    pub volatility: f64,
    pub tax_fraction: f64,
    pub seed: u64,
    pub summary: Summary,
    pub wealth: Vec<f64>,
}

/// Runs one simulation per (volatility, tax fraction) pair, volatility-major.
///
/// Every grid config is validated before the first run starts. Each point is
/// seeded from `base.seed` and its grid position, so points are independent of
/// each other and of grid order.
pub fn run_sweep(
    base: &SimulationConfig,
    volatilities: &[f64],
    tax_fractions: &[f64],
    top_percent: f64,
) -> Result<Vec<SweepPoint>, SimError> {
    let mut configs = Vec::with_capacity(volatilities.len() * tax_fractions.len());
    for (row, &volatility) in volatilities.iter().enumerate() {
        for (column, &tax_fraction) in tax_fractions.iter().enumerate() {
            let config = SimulationConfig {
                volatility,
                tax_fraction,
                seed: derive_seed(base.seed, row as u32, column as u32),
                sort_final: true,
                record_history: false,
                ..base.clone()
            };
            config.validate()?;
            configs.push(config);
        }
    }

    info!(
        points = configs.len(),
        volatilities = volatilities.len(),
        tax_fractions = tax_fractions.len(),
        "starting parameter sweep"
    );

    configs
        .into_iter()
        .map(|config| -> Result<SweepPoint, SimError> {
            let (volatility, tax_fraction, seed) =
                (config.volatility, config.tax_fraction, config.seed);
            let mut runner = SimulationRunner::new(config)?;
            let wealth = runner.run()?.wealth().to_vec();
            let summary = Summary::from_wealth(&wealth, top_percent);
            info!(volatility, tax_fraction, "{}", summary.line);
            Ok(SweepPoint {
                volatility,
                tax_fraction,
                seed,
                summary,
                wealth,
            })
        })
        .collect()
}
