use super::sampler::{NormalSampler, UniformSource};
use super::types::{PERIODS_PER_YEAR, SimulationParameters, TrialOutcome};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathModel {
    pub starting_capital: f64,
    pub periodic_contribution: f64,
    pub target_amount: f64,
    pub period_log_mean: f64,
    pub period_log_vol: f64,
    pub max_periods: u32,
}

impl PathModel {
    pub fn from_parameters(params: &SimulationParameters) -> Self {
        let periods_per_year = PERIODS_PER_YEAR as f64;
        let annual_mean = params.mean_annual_return_percent / 100.0;
        let annual_vol = params.annual_volatility_percent / 100.0;
        Self {
            starting_capital: params.starting_capital,
            periodic_contribution: params.periodic_contribution,
            target_amount: params.target_amount,
            period_log_mean: (1.0 + annual_mean).ln() / periods_per_year,
            period_log_vol: annual_vol / periods_per_year.sqrt(),
            max_periods: params.max_periods,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathRun {
    pub outcome: TrialOutcome,
    pub trajectory: Option<Vec<f64>>,
}

/// Contributions land before the period's return; capital floors at zero.
pub fn simulate_path<U: UniformSource>(
    model: &PathModel,
    sampler: &mut NormalSampler<U>,
    track: bool,
) -> PathRun {
    let mut capital = model.starting_capital;
    let mut periods = 0_u32;
    let mut trajectory = track.then(|| Vec::with_capacity(model.max_periods as usize));

    while capital < model.target_amount && periods < model.max_periods {
        capital += model.periodic_contribution;
        let log_return = sampler.sample(model.period_log_mean, model.period_log_vol);
        capital = (capital * log_return.exp()).max(0.0);
        periods += 1;

        if let Some(values) = trajectory.as_mut() {
            values.push(capital);
        }
    }

    let outcome = if capital >= model.target_amount {
        TrialOutcome::Success { periods }
    } else {
        TrialOutcome::Failure
    };

    PathRun {
        outcome,
        trajectory,
    }
}
