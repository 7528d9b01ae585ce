use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use super::error::SimulationError;
use super::path::{PathModel, PathRun, simulate_path};
use super::sampler::{NormalSampler, derive_seed};
use super::selector::select_representative_paths;
use super::stats::{binomial_ci_half_width, nearest_rank};
use super::types::{
    AggregateResult, DEFAULT_PROGRESS_INTERVAL, PeriodPercentiles, SimulationParameters,
    Trajectory, TrialOutcome,
};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub seed: Option<u64>,
    pub progress_interval: u32,
    pub cancellation: Option<CancellationToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancellation: None,
        }
    }
}

impl RunOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub completed: u32,
    pub trial_count: u32,
    pub success_periods: &'a [u32],
    pub trajectories: &'a [Trajectory],
}

impl Progress<'_> {
    pub fn fraction_complete(&self) -> f64 {
        self.completed as f64 / self.trial_count as f64
    }
}

pub fn simulate(
    params: &SimulationParameters,
    options: &RunOptions,
) -> Result<AggregateResult, SimulationError> {
    run_simulation(params, options, |_| {})
}

/// `on_progress` runs on the calling thread after every `progress_interval` trials.
pub fn run_simulation<F>(
    params: &SimulationParameters,
    options: &RunOptions,
    mut on_progress: F,
) -> Result<AggregateResult, SimulationError>
where
    F: FnMut(&Progress<'_>),
{
    params.validate()?;
    if options.progress_interval == 0 {
        return Err(SimulationError::invalid("progress_interval", "must be > 0"));
    }

    let seed = options.seed.unwrap_or_else(rand::random);
    let model = PathModel::from_parameters(params);
    let trial_count = params.trial_count;

    tracing::debug!(
        trial_count,
        max_periods = params.max_periods,
        track_paths = params.track_paths,
        seed,
        "starting time-to-target simulation"
    );

    let mut success_periods = Vec::with_capacity(trial_count as usize);
    let mut failure_count = 0_u32;
    let mut trajectories = if params.track_paths {
        Vec::with_capacity(trial_count as usize)
    } else {
        Vec::new()
    };

    let mut completed = 0_u32;
    while completed < trial_count {
        if let Some(token) = &options.cancellation {
            if token.is_cancelled() {
                tracing::debug!(completed, trial_count, "simulation cancelled");
                return Err(SimulationError::Cancelled {
                    completed,
                    total: trial_count,
                });
            }
        }

        let batch_end = completed.saturating_add(options.progress_interval).min(trial_count);
        let batch: Vec<PathRun> = (completed..batch_end)
            .into_par_iter()
            .map(|trial_id| run_trial(&model, seed, trial_id, params.track_paths))
            .collect();

        for run in batch {
            match run.outcome {
                TrialOutcome::Success { periods } => success_periods.push(periods),
                TrialOutcome::Failure => failure_count += 1,
            }
            if let Some(values) = run.trajectory {
                trajectories.push(Trajectory {
                    outcome: run.outcome,
                    values,
                });
            }
        }
        completed = batch_end;

        on_progress(&Progress {
            completed,
            trial_count,
            success_periods: &success_periods,
            trajectories: &trajectories,
        });
    }

    let success_rate = success_periods.len() as f64 / trial_count as f64;
    let percentiles = period_percentiles(&success_periods);
    let representative_paths = if params.track_paths {
        select_representative_paths(&trajectories, &success_periods)
    } else {
        None
    };

    tracing::debug!(
        success_rate,
        failure_count,
        median_periods = ?percentiles.map(|p| p.median),
        "time-to-target simulation finished"
    );

    Ok(AggregateResult {
        success_rate,
        success_ci_half_width: binomial_ci_half_width(success_rate, trial_count),
        success_periods,
        failure_count,
        trial_count,
        percentiles,
        representative_paths,
    })
}

fn run_trial(model: &PathModel, seed: u64, trial_id: u32, track: bool) -> PathRun {
    let rng = StdRng::seed_from_u64(derive_seed(seed, trial_id as u64));
    let mut sampler = NormalSampler::new(rng);
    simulate_path(model, &mut sampler, track)
}

fn period_percentiles(success_periods: &[u32]) -> Option<PeriodPercentiles> {
    if success_periods.is_empty() {
        return None;
    }
    let mut sorted = success_periods.to_vec();
    sorted.sort_unstable();
    Some(PeriodPercentiles {
        best: nearest_rank(&sorted, 0.1),
        median: nearest_rank(&sorted, 0.5),
        worst: nearest_rank(&sorted, 0.9),
    })
}
