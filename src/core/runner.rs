use serde::Serialize;
use tracing::{debug, error, info};

use super::engine::advance_round;
use super::error::SimError;
use super::rng::{RandomSource, Rng};
use super::summary::Summary;
use super::types::{RoundReport, SimulationConfig, SimulationOutcome};
use super::wealth::WealthState;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Drives [`advance_round`] for `config.number_of_rounds` rounds.
///
/// A runner is single-use: once it has run, `run` refuses to go again until
/// `reset` is called.
#[derive(Debug)]
pub struct SimulationRunner<R = Rng> {
    config: SimulationConfig,
    state: WealthState,
    source: R,
    run_state: RunState,
    rounds_completed: u32,
    reports: Vec<RoundReport>,
    history: Vec<Vec<f64>>,
}

impl SimulationRunner<Rng> {
    /// Validates `config` and seeds the generator from `config.seed`.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        let source = Rng::new(config.seed);
        Self::with_source(config, source)
    }
}

impl<R: RandomSource> SimulationRunner<R> {
    pub fn with_source(config: SimulationConfig, source: R) -> Result<Self, SimError> {
        config.validate()?;
        let state = WealthState::new(config.number_of_agents, config.starting_amount);
        Ok(Self {
            config,
            state,
            source,
            run_state: RunState::NotStarted,
            rounds_completed: 0,
            reports: Vec::new(),
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &WealthState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    pub fn reports(&self) -> &[RoundReport] {
        &self.reports
    }

    /// Wealth after each completed round; empty unless `record_history` is set.
    pub fn history(&self) -> &[Vec<f64>] {
        &self.history
    }

    pub fn run(&mut self) -> Result<&WealthState, SimError> {
        if self.run_state != RunState::NotStarted {
            return Err(SimError::InvalidRunState {
                expected: RunState::NotStarted,
                actual: self.run_state,
            });
        }

        info!(
            agents = self.config.number_of_agents,
            rounds = self.config.number_of_rounds,
            tax_fraction = self.config.tax_fraction,
            expected_gain = self.config.expected_gain,
            volatility = self.config.volatility,
            survival_limit = self.config.survival_limit,
            seed = self.config.seed,
            "starting simulation"
        );
        self.run_state = RunState::Running;

        while self.rounds_completed < self.config.number_of_rounds {
            let round = self.rounds_completed + 1;
            let report = match advance_round(&self.config, &mut self.state, &mut self.source, round)
            {
                Ok(report) => report,
                Err(err) => {
                    error!(round, error = %err, "simulation failed");
                    self.run_state = RunState::Failed;
                    return Err(err);
                }
            };
            debug!(
                round,
                survivors = report.survivors,
                newly_eliminated = report.newly_eliminated,
                tax_collected = report.tax_collected,
                "round complete"
            );

            self.reports.push(report);
            if self.config.record_history {
                self.history.push(self.state.wealth().to_vec());
            }
            self.rounds_completed = round;
        }

        if self.config.sort_final {
            self.state.sort_ascending();
        }
        self.run_state = RunState::Completed;

        info!(
            rounds = self.rounds_completed,
            survivors = self.state.survivors(),
            total_wealth = self.state.total_wealth(),
            "simulation complete"
        );
        Ok(&self.state)
    }

    /// Restores every agent to the starting amount. The random source keeps
    /// its position in the stream.
    pub fn reset(&mut self) {
        self.state = WealthState::new(self.config.number_of_agents, self.config.starting_amount);
        self.run_state = RunState::NotStarted;
        self.rounds_completed = 0;
        self.reports.clear();
        self.history.clear();
    }

    pub fn into_outcome(self, top_percent: f64) -> SimulationOutcome {
        let summary = Summary::from_wealth(self.state.wealth(), top_percent);
        SimulationOutcome {
            rounds_completed: self.rounds_completed,
            starting_total: self.state.starting_total(),
            total_wealth: self.state.total_wealth(),
            total_eliminated: self.reports.iter().map(|r| r.newly_eliminated).sum(),
            summary,
            config: self.config,
            wealth: self.state.into_wealth(),
            reports: self.reports,
            history: self.history,
        }
    }
}

/// Validates `config`, runs it to completion with its own seed and returns
/// the outcome.
pub fn run_simulation(
    config: SimulationConfig,
    top_percent: f64,
) -> Result<SimulationOutcome, SimError> {
    let mut runner = SimulationRunner::new(config)?;
    runner.run()?;
    Ok(runner.into_outcome(top_percent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::ScriptedSource;
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS * expected.abs().max(1.0),
            "expected {expected}, got {actual}"
        );
    }

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            number_of_agents: 200,
            survival_limit: 1.0,
            tax_fraction: 0.05,
            starting_amount: 1_000.0,
            expected_gain: 0.2,
            volatility: 0.4,
            number_of_rounds: 50,
            seed: 42,
            sort_final: true,
            record_history: false,
        }
    }

    #[test]
    fn new_runner_is_not_started_with_equal_agents() {
        let runner = SimulationRunner::new(small_config()).expect("valid config");
        assert_eq!(runner.run_state(), RunState::NotStarted);
        assert_eq!(runner.rounds_completed(), 0);
        assert!(runner.state().wealth().iter().all(|w| *w == 1_000.0));
        assert_approx(runner.state().starting_total(), 200_000.0);
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let config = SimulationConfig {
            tax_fraction: 1.0,
            ..small_config()
        };
        let err = SimulationRunner::new(config).expect_err("tax of 100% is invalid");
        assert!(matches!(
            err,
            SimError::Configuration {
                field: "tax_fraction",
                ..
            }
        ));
    }

    #[test]
    fn run_honors_the_configured_round_count() {
        let config = SimulationConfig {
            number_of_rounds: 17,
            ..small_config()
        };
        let mut runner = SimulationRunner::new(config).expect("valid config");
        runner.run().expect("run succeeds");

        assert_eq!(runner.run_state(), RunState::Completed);
        assert_eq!(runner.rounds_completed(), 17);
        assert_eq!(runner.reports().len(), 17);
        assert_eq!(
            runner.reports().iter().map(|r| r.round).collect::<Vec<_>>(),
            (1..=17).collect::<Vec<_>>()
        );
        assert_approx(runner.state().total_wealth(), 200_000.0);
    }

    #[test]
    fn final_wealth_is_sorted_when_requested() {
        let mut runner = SimulationRunner::new(small_config()).expect("valid config");
        let state = runner.run().expect("run succeeds");
        assert!(state.wealth().windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(state.total_wealth(), state.wealth().iter().sum::<f64>());

        let unsorted = SimulationConfig {
            sort_final: false,
            ..small_config()
        };
        let mut runner = SimulationRunner::new(unsorted).expect("valid config");
        let state = runner.run().expect("run succeeds");
        assert!(!state.wealth().windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn zero_rounds_completes_without_touching_wealth() {
        let config = SimulationConfig {
            number_of_rounds: 0,
            ..small_config()
        };
        let mut runner = SimulationRunner::new(config).expect("valid config");
        runner.run().expect("run succeeds");

        assert_eq!(runner.run_state(), RunState::Completed);
        assert!(runner.reports().is_empty());
        assert!(runner.state().wealth().iter().all(|w| *w == 1_000.0));
    }

    #[test]
    fn second_run_is_refused_until_reset() {
        let mut runner = SimulationRunner::new(small_config()).expect("valid config");
        runner.run().expect("first run succeeds");

        let err = runner.run().expect_err("second run must be refused");
        assert_eq!(
            err,
            SimError::InvalidRunState {
                expected: RunState::NotStarted,
                actual: RunState::Completed,
            }
        );

        runner.reset();
        assert_eq!(runner.run_state(), RunState::NotStarted);
        assert!(runner.reports().is_empty());
        assert!(runner.state().wealth().iter().all(|w| *w == 1_000.0));
        runner.run().expect("run after reset succeeds");
        assert_eq!(runner.run_state(), RunState::Completed);
    }

    #[test]
    fn extinction_fails_the_run() {
        let config = SimulationConfig {
            number_of_agents: 3,
            survival_limit: 500.0,
            starting_amount: 100.0,
            ..small_config()
        };
        let mut runner = SimulationRunner::new(config).expect("valid config");

        let err = runner.run().expect_err("every agent falls below the limit");
        assert!(matches!(err, SimError::DegenerateState { round: 1, .. }));
        assert_eq!(runner.run_state(), RunState::Failed);
        assert_eq!(runner.rounds_completed(), 0);
        assert!(runner.state().wealth().iter().all(|w| !w.is_nan()));
    }

    #[test]
    fn history_records_each_round_when_enabled() {
        let config = SimulationConfig {
            number_of_agents: 4,
            number_of_rounds: 3,
            record_history: true,
            sort_final: false,
            ..small_config()
        };
        let mut runner = SimulationRunner::new(config).expect("valid config");
        runner.run().expect("run succeeds");

        assert_eq!(runner.history().len(), 3);
        assert_eq!(runner.history()[2], runner.state().wealth());
        for snapshot in runner.history() {
            let total: f64 = snapshot.iter().sum();
            assert_approx(total, 4_000.0);
        }
    }

    #[test]
    fn scripted_source_drives_a_known_trajectory() {
        let config = SimulationConfig {
            number_of_agents: 2,
            survival_limit: 0.0,
            tax_fraction: 0.0,
            starting_amount: 100.0,
            expected_gain: 0.0,
            volatility: 0.5,
            number_of_rounds: 1,
            sort_final: false,
            ..small_config()
        };
        let source = ScriptedSource::new(vec![0.75, 0.25]);
        let mut runner = SimulationRunner::with_source(config, source).expect("valid config");
        let state = runner.run().expect("run succeeds");

        // 150 and 50 already sum to the starting total.
        assert_eq!(state.wealth(), &[150.0, 50.0]);
    }

    #[test]
    fn outcome_carries_summary_and_final_wealth() {
        let outcome = run_simulation(small_config(), 20.0).expect("run succeeds");

        assert_eq!(outcome.rounds_completed, 50);
        assert_eq!(outcome.wealth.len(), 200);
        assert_approx(outcome.total_wealth, outcome.starting_total);
        assert!(outcome.summary.top_share_percent >= 20.0);
        assert!(outcome.summary.line.starts_with("Top 20% own "));
        assert!(outcome.history.is_empty());
    }

    #[test]
    fn outcome_counts_eliminations_that_tax_refunds_hide() {
        let config = SimulationConfig {
            survival_limit: 900.0,
            expected_gain: 0.0,
            volatility: 0.5,
            number_of_rounds: 1,
            ..small_config()
        };
        let outcome = run_simulation(config, 20.0).expect("run succeeds");

        assert_eq!(outcome.reports.len(), 1);
        assert!(outcome.total_eliminated > 0);
        assert_eq!(outcome.total_eliminated, outcome.reports[0].newly_eliminated);
        assert_eq!(outcome.summary.zero_wealth, 0);
        assert_eq!(outcome.summary.survivors, 200);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(16))]

        #[test]
        fn prop_same_seed_same_final_wealth(
            seed in any::<u64>(),
            tax_fraction in 0.0_f64..0.4,
            volatility in 0.0_f64..0.6,
        ) {
            let config = SimulationConfig {
                seed,
                tax_fraction,
                volatility,
                survival_limit: 0.0,
                number_of_rounds: 30,
                ..small_config()
            };
            let left = run_simulation(config.clone(), 20.0).expect("run succeeds");
            let right = run_simulation(config, 20.0).expect("run succeeds");
            prop_assert_eq!(&left.wealth, &right.wealth);
            prop_assert_eq!(&left.reports, &right.reports);
        }

        #[test]
        fn prop_completed_runs_conserve_total_wealth(
            seed in any::<u64>(),
            tax_fraction in 0.0_f64..0.6,
            survival_limit in 0.0_f64..50.0,
        ) {
            let config = SimulationConfig {
                seed,
                tax_fraction,
                survival_limit,
                number_of_rounds: 40,
                ..small_config()
            };
            if let Ok(outcome) = run_simulation(config, 20.0) {
                let total: f64 = outcome.wealth.iter().sum();
                prop_assert!(((total - outcome.starting_total) / outcome.starting_total).abs() <= 1e-9);
                prop_assert!(outcome.wealth.iter().all(|w| *w >= 0.0));
            }
        }
    }
}
