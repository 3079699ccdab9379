use serde::Serialize;

pub const DEFAULT_TOP_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub top_percent: f64,
    pub top_share_percent: f64,
    pub gini: f64,
    pub survivors: usize,
    /// Agents holding exactly zero. Under a positive tax every agent gets a
    /// stipend, so this stays 0; see `SimulationOutcome::total_eliminated`.
    pub zero_wealth: usize,
    pub total_wealth: f64,
    pub line: String,
}

impl Summary {
    pub fn from_wealth(wealth: &[f64], top_percent: f64) -> Self {
        let sorted = sorted_copy(wealth);
        let survivors = sorted.iter().filter(|&&w| w > 0.0).count();
        let top_share_percent = top_share_of_sorted(&sorted, top_percent);
        Self {
            top_percent,
            top_share_percent,
            gini: gini_of_sorted(&sorted),
            survivors,
            zero_wealth: sorted.len() - survivors,
            total_wealth: sorted.iter().sum(),
            line: format_line(top_percent, top_share_percent),
        }
    }
}

/// Percentage of total wealth held by the richest `top_percent` of agents.
///
/// The cutoff is positional: with `n` agents sorted ascending, everyone from
/// index `floor(n * (100 - top_percent) / 100)` upward counts as the top.
pub fn top_share_percent(wealth: &[f64], top_percent: f64) -> f64 {
    top_share_of_sorted(&sorted_copy(wealth), top_percent)
}

/// `"Top 20% own 41.23456% of the wealth"`.
pub fn summary_line(wealth: &[f64], top_percent: f64) -> String {
    format_line(top_percent, top_share_percent(wealth, top_percent))
}

pub fn gini(wealth: &[f64]) -> f64 {
    gini_of_sorted(&sorted_copy(wealth))
}

fn sorted_copy(wealth: &[f64]) -> Vec<f64> {
    let mut sorted = wealth.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn top_share_of_sorted(sorted: &[f64], top_percent: f64) -> f64 {
    let total: f64 = sorted.iter().sum();
    if sorted.is_empty() || total <= 0.0 {
        return 0.0;
    }

    let top_percent = top_percent.clamp(0.0, 100.0);
    let n = sorted.len();
    let cutoff = ((n as f64) * (100.0 - top_percent) / 100.0).floor() as usize;
    let top: f64 = sorted[cutoff.min(n)..].iter().sum();
    100.0 * top / total
}

fn gini_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    let total: f64 = sorted.iter().sum();
    if n < 2 || total <= 0.0 {
        return 0.0;
    }

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, w)| (i as f64 + 1.0) * w)
        .sum();
    let n = n as f64;
    (2.0 * weighted) / (n * total) - (n + 1.0) / n
}

fn format_line(top_percent: f64, share: f64) -> String {
    format!("Top {top_percent}% own {share:.5}% of the wealth")
}
