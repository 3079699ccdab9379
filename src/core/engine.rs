use tracing::warn;

use super::error::SimError;
use super::rng::RandomSource;
use super::types::{RoundReport, SimulationConfig};
use super::wealth::WealthState;

/// Relative gap between the running and starting totals beyond which a round
/// is reported as drifting.
pub const DRIFT_TOLERANCE: f64 = 1e-9;

/// Advances `state` by one round: growth, elimination, renormalization, then
/// flat tax with equal redistribution.
///
/// Consumes exactly `state.len()` draws from `source`. `round` is the 1-based
/// index used in reports and errors. On `DegenerateState` the state keeps its
/// post-elimination balances and is never rescaled.
pub fn advance_round<R: RandomSource + ?Sized>(
    config: &SimulationConfig,
    state: &mut WealthState,
    source: &mut R,
    round: u32,
) -> Result<RoundReport, SimError> {
    apply_growth(config, state, source);
    let newly_eliminated = eliminate_below_limit(config.survival_limit, state);
    let pre_renormalization_total = renormalize(state, round)?;
    check_drift(state, round, "renormalization");
    let tax_collected = apply_flat_tax(config.tax_fraction, state);
    check_drift(state, round, "taxation");

    Ok(RoundReport {
        round,
        newly_eliminated,
        pre_renormalization_total,
        tax_collected,
        survivors: state.survivors(),
    })
}

/// Two-point multiplicative shock: a draw `>= 0.5` applies the up multiplier,
/// anything lower applies the down multiplier.
pub fn apply_growth<R: RandomSource + ?Sized>(
    config: &SimulationConfig,
    state: &mut WealthState,
    source: &mut R,
) {
    let up = config.up_multiplier();
    let down = config.down_multiplier();
    let mut draws = vec![0.0; state.len()];
    source.fill_uniform(&mut draws);

    state
        .wealth_mut()
        .iter_mut()
        .zip(&draws)
        .for_each(|(wealth, &u)| *wealth *= if u >= 0.5 { up } else { down });
    state.recompute_total();
}

/// Zeroes every agent strictly below `survival_limit`. Returns how many agents
/// held positive wealth before being zeroed.
pub fn eliminate_below_limit(survival_limit: f64, state: &mut WealthState) -> usize {
    let mut newly_eliminated = 0;
    state
        .wealth_mut()
        .iter_mut()
        .filter(|wealth| **wealth < survival_limit)
        .for_each(|wealth| {
            if *wealth > 0.0 {
                newly_eliminated += 1;
            }
            *wealth = 0.0;
        });
    state.recompute_total();
    newly_eliminated
}

/// Rescales every agent so the total returns to the starting total. Returns
/// the total observed before rescaling.
pub fn renormalize(state: &mut WealthState, round: u32) -> Result<f64, SimError> {
    let total = state.recompute_total();
    if !(total > 0.0 && total.is_finite()) {
        return Err(SimError::DegenerateState { round, total });
    }

    let factor = state.starting_total() / total;
    state
        .wealth_mut()
        .iter_mut()
        .for_each(|wealth| *wealth *= factor);
    state.recompute_total();
    Ok(total)
}

/// Taxes each agent `tax_fraction` of its wealth and hands the proceeds back
/// in equal parts to the whole population, eliminated agents included.
/// Returns the amount collected.
pub fn apply_flat_tax(tax_fraction: f64, state: &mut WealthState) -> f64 {
    if state.is_empty() {
        return 0.0;
    }

    let collected: f64 = state
        .wealth()
        .iter()
        .map(|wealth| wealth * tax_fraction)
        .sum();
    let kept = 1.0 - tax_fraction;
    let reimbursement = collected / state.len() as f64;

    state
        .wealth_mut()
        .iter_mut()
        .for_each(|wealth| *wealth = *wealth * kept + reimbursement);
    state.recompute_total();
    collected
}

fn check_drift(state: &WealthState, round: u32, phase: &'static str) {
    let error = state.conservation_error();
    if error > DRIFT_TOLERANCE {
        warn!(
            round,
            phase,
            relative_error = error,
            total = state.total_wealth(),
            starting_total = state.starting_total(),
            "total wealth drifted from the starting total"
        );
    }
}
