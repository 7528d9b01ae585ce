mod engine;
mod error;
mod history;
mod path;
mod projector;
mod sampler;
mod selector;
mod stats;
mod target;
mod types;

pub use engine::{CancellationToken, Progress, RunOptions, run_simulation, simulate};
pub use error::SimulationError;
pub use history::historical_performance;
pub use path::{PathModel, PathRun, simulate_path};
pub use projector::project;
pub use sampler::{NormalSampler, SequenceSource, UniformSource, derive_seed};
pub use selector::select_representative_paths;
pub use target::required_capital;
pub use types::{
    AggregateResult, DEFAULT_MAX_PERIODS, DEFAULT_PROGRESS_INTERVAL, DEFAULT_TRIAL_COUNT,
    HoldingHistory, MAX_HORIZON_YEARS, PERIODS_PER_YEAR, PeriodPercentiles, ProjectionParameters,
    ProjectionResult, RepresentativePath, RepresentativePaths, SimulationParameters, Trajectory,
    TrialOutcome,
};
