/// Per-agent wealth plus the cached running total.
///
/// The index into `wealth` is the agent's identity. Eliminated agents stay in
/// place with zero wealth.
#[derive(Debug, Clone, PartialEq)]
pub struct WealthState {
    wealth: Vec<f64>,
    total_wealth: f64,
    starting_total: f64,
}

impl WealthState {
    pub fn new(number_of_agents: usize, starting_amount: f64) -> Self {
        let wealth = vec![starting_amount; number_of_agents];
        let total: f64 = wealth.iter().sum();
        Self {
            wealth,
            total_wealth: total,
            starting_total: total,
        }
    }

    /// Builds a state from explicit balances; the starting total is their sum.
    pub fn from_wealth(wealth: Vec<f64>) -> Self {
        let total: f64 = wealth.iter().sum();
        Self {
            wealth,
            total_wealth: total,
            starting_total: total,
        }
    }

    pub fn wealth(&self) -> &[f64] {
        &self.wealth
    }

    pub(crate) fn wealth_mut(&mut self) -> &mut [f64] {
        &mut self.wealth
    }

    pub fn len(&self) -> usize {
        self.wealth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wealth.is_empty()
    }

    pub fn total_wealth(&self) -> f64 {
        self.total_wealth
    }

    pub fn starting_total(&self) -> f64 {
        self.starting_total
    }

    /// Re-sums `wealth` into the cached total and returns it.
    pub fn recompute_total(&mut self) -> f64 {
        self.total_wealth = self.wealth.iter().sum();
        self.total_wealth
    }

    pub fn survivors(&self) -> usize {
        self.wealth.iter().filter(|&&w| w > 0.0).count()
    }

    pub fn sorted_ascending(&self) -> Vec<f64> {
        let mut sorted = self.wealth.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted
    }

    /// Sorts the balances ascending and refreshes the cached total, since
    /// float summation depends on order.
    pub fn sort_ascending(&mut self) {
        self.wealth.sort_by(|a, b| a.total_cmp(b));
        self.recompute_total();
    }

    /// Relative gap between the cached total and the starting total.
    pub fn conservation_error(&self) -> f64 {
        if self.starting_total == 0.0 {
            return self.total_wealth.abs();
        }
        ((self.total_wealth - self.starting_total) / self.starting_total).abs()
    }

    pub fn into_wealth(self) -> Vec<f64> {
        self.wealth
    }
}
