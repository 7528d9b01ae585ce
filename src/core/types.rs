use serde::{Deserialize, Serialize};

use super::error::{SimulationError, ensure_finite};

pub const PERIODS_PER_YEAR: u32 = 12;
pub const DEFAULT_TRIAL_COUNT: u32 = 30_000;
pub const DEFAULT_MAX_PERIODS: u32 = 1_200;
pub const DEFAULT_PROGRESS_INTERVAL: u32 = 200;
pub const MAX_HORIZON_YEARS: u32 = 1_000;

/// Return and volatility are whole-number percentages (6.5 means 6.5%).
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub starting_capital: f64,
    pub periodic_contribution: f64,
    pub target_amount: f64,
    pub mean_annual_return_percent: f64,
    pub annual_volatility_percent: f64,
    pub trial_count: u32,
    pub max_periods: u32,
    /// Retaining trajectories costs `trial_count * max_periods` values.
    pub track_paths: bool,
}

impl SimulationParameters {
    pub fn new(
        starting_capital: f64,
        periodic_contribution: f64,
        target_amount: f64,
        mean_annual_return_percent: f64,
        annual_volatility_percent: f64,
    ) -> Self {
        Self {
            starting_capital,
            periodic_contribution,
            target_amount,
            mean_annual_return_percent,
            annual_volatility_percent,
            trial_count: DEFAULT_TRIAL_COUNT,
            max_periods: DEFAULT_MAX_PERIODS,
            track_paths: false,
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.trial_count == 0 {
            return Err(SimulationError::invalid("trial_count", "must be > 0"));
        }
        if self.max_periods == 0 {
            return Err(SimulationError::invalid("max_periods", "must be > 0"));
        }

        ensure_finite("starting_capital", self.starting_capital)?;
        ensure_finite("periodic_contribution", self.periodic_contribution)?;
        ensure_finite("target_amount", self.target_amount)?;
        ensure_finite("mean_annual_return_percent", self.mean_annual_return_percent)?;
        ensure_finite("annual_volatility_percent", self.annual_volatility_percent)?;

        if self.starting_capital < 0.0 {
            return Err(SimulationError::invalid("starting_capital", "must be >= 0"));
        }
        if self.target_amount <= 0.0 {
            return Err(SimulationError::invalid("target_amount", "must be > 0"));
        }
        if self.mean_annual_return_percent <= -100.0 {
            return Err(SimulationError::invalid(
                "mean_annual_return_percent",
                "must be > -100",
            ));
        }
        if self.annual_volatility_percent < 0.0 {
            return Err(SimulationError::invalid(
                "annual_volatility_percent",
                "must be >= 0",
            ));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TrialOutcome {
    Success { periods: u32 },
    Failure,
}

impl TrialOutcome {
    pub fn periods(self) -> Option<u32> {
        match self {
            TrialOutcome::Success { periods } => Some(periods),
            TrialOutcome::Failure => None,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, TrialOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub outcome: TrialOutcome,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativePath {
    pub periods: u32,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativePaths {
    pub best: RepresentativePath,
    pub median: RepresentativePath,
    pub worst: RepresentativePath,
}

/// Periods-to-target at the 10th / 50th / 90th percentile of successful trials.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodPercentiles {
    pub best: u32,
    pub median: u32,
    pub worst: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub success_rate: f64,
    pub success_ci_half_width: f64,
    pub success_periods: Vec<u32>,
    pub failure_count: u32,
    pub trial_count: u32,
    pub percentiles: Option<PeriodPercentiles>,
    pub representative_paths: Option<RepresentativePaths>,
}

impl AggregateResult {
    pub fn success_count(&self) -> u32 {
        self.success_periods.len() as u32
    }
}

/// `cagr` and `volatility` are fractions (0.07 means 7%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParameters {
    pub cagr: f64,
    pub volatility: f64,
    pub horizon_years: u32,
    pub trial_count: u32,
}

impl ProjectionParameters {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.trial_count == 0 {
            return Err(SimulationError::invalid("trial_count", "must be > 0"));
        }
        if self.horizon_years == 0 {
            return Err(SimulationError::invalid("horizon_years", "must be > 0"));
        }
        if self.horizon_years > MAX_HORIZON_YEARS {
            return Err(SimulationError::invalid(
                "horizon_years",
                format!("must be <= {MAX_HORIZON_YEARS}"),
            ));
        }
        ensure_finite("cagr", self.cagr)?;
        ensure_finite("volatility", self.volatility)?;
        if self.cagr <= -1.0 {
            return Err(SimulationError::invalid("cagr", "must be > -1"));
        }
        if self.volatility < 0.0 {
            return Err(SimulationError::invalid("volatility", "must be >= 0"));
        }
        Ok(())
    }

    pub fn period_count(&self) -> usize {
        self.horizon_years as usize * PERIODS_PER_YEAR as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub horizon_years: u32,
    pub trial_count: u32,
    /// 80th percentile per period.
    pub best: Vec<f64>,
    pub median: Vec<f64>,
    /// 20th percentile per period.
    pub worst: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingHistory {
    pub weight: f64,
    pub annual_returns: Vec<f64>,
    #[serde(default)]
    pub dividend_yield: f64,
}
