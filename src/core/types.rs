use serde::Serialize;

use super::error::SimError;
use super::summary::Summary;

/// Largest population a single run will allocate.
pub const MAX_AGENTS: usize = 10_000_000;

/// Largest number of balances kept when `record_history` is set.
pub const MAX_HISTORY_CELLS: u64 = 50_000_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub number_of_agents: usize,
    pub survival_limit: f64,
    pub tax_fraction: f64,
    pub starting_amount: f64,
    pub expected_gain: f64,
    pub volatility: f64,
    pub number_of_rounds: u32,
    pub seed: u64,
    pub sort_final: bool,
    pub record_history: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            number_of_agents: 10_000,
            survival_limit: 1.0,
            tax_fraction: 0.05,
            starting_amount: 1e4,
            expected_gain: 0.2,
            volatility: 0.4,
            number_of_rounds: 1_000,
            seed: 42,
            sort_final: true,
            record_history: false,
        }
    }
}

impl SimulationConfig {
    /// Multiplier applied on a draw `>= 0.5`.
    pub fn up_multiplier(&self) -> f64 {
        1.0 + self.expected_gain + self.volatility
    }

    /// Multiplier applied on a draw `< 0.5`.
    pub fn down_multiplier(&self) -> f64 {
        1.0 + self.expected_gain - self.volatility
    }

    pub fn starting_total(&self) -> f64 {
        self.starting_amount * self.number_of_agents as f64
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.number_of_agents == 0 {
            return Err(SimError::config("number_of_agents", "must be > 0"));
        }
        if self.number_of_agents > MAX_AGENTS {
            return Err(SimError::config(
                "number_of_agents",
                format!("must be <= {MAX_AGENTS}"),
            ));
        }
        if self.record_history
            && (self.number_of_agents as u64).saturating_mul(self.number_of_rounds as u64)
                > MAX_HISTORY_CELLS
        {
            return Err(SimError::config(
                "record_history",
                format!("number_of_agents * number_of_rounds must be <= {MAX_HISTORY_CELLS}"),
            ));
        }
        if !self.survival_limit.is_finite() || self.survival_limit < 0.0 {
            return Err(SimError::config("survival_limit", "must be finite and >= 0"));
        }
        if !(0.0..1.0).contains(&self.tax_fraction) {
            return Err(SimError::config("tax_fraction", "must be in [0, 1)"));
        }
        if !self.starting_amount.is_finite() || self.starting_amount <= 0.0 {
            return Err(SimError::config("starting_amount", "must be finite and > 0"));
        }
        if !self.expected_gain.is_finite() {
            return Err(SimError::config("expected_gain", "must be finite"));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(SimError::config("volatility", "must be finite and >= 0"));
        }
        if self.down_multiplier() < 0.0 {
            return Err(SimError::config(
                "volatility",
                format!(
                    "1 + expected_gain - volatility is {}, which would make wealth negative",
                    self.down_multiplier()
                ),
            ));
        }
        if !self.starting_total().is_finite() {
            return Err(SimError::config(
                "starting_amount",
                "starting_amount * number_of_agents overflows",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub round: u32,
    pub newly_eliminated: usize,
    pub pre_renormalization_total: f64,
    pub tax_collected: f64,
    pub survivors: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub config: SimulationConfig,
    pub rounds_completed: u32,
    pub starting_total: f64,
    pub total_wealth: f64,
    /// Eliminations summed over every round. An agent that is taxed back
    /// above zero and eliminated again counts each time.
    pub total_eliminated: usize,
    pub summary: Summary,
    pub wealth: Vec<f64>,
    pub reports: Vec<RoundReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Vec<f64>>,
}
