use super::stats::rank_index;
use super::types::{RepresentativePath, RepresentativePaths, Trajectory, TrialOutcome};

const BEST_FRACTION: f64 = 0.1;
const MEDIAN_FRACTION: f64 = 0.5;
const WORST_FRACTION: f64 = 0.9;

/// Values come from a trajectory with exactly the percentile's period count,
/// else from the same rank among successes sorted by period count.
pub fn select_representative_paths(
    trajectories: &[Trajectory],
    success_periods: &[u32],
) -> Option<RepresentativePaths> {
    if success_periods.is_empty() {
        return None;
    }

    let mut sorted_periods = success_periods.to_vec();
    sorted_periods.sort_unstable();

    let mut ranked: Vec<(u32, &Trajectory)> = trajectories
        .iter()
        .filter_map(|t| t.outcome.periods().map(|periods| (periods, t)))
        .collect();
    if ranked.is_empty() {
        return None;
    }
    ranked.sort_by_key(|(periods, _)| *periods);

    let pick = |fraction: f64| -> RepresentativePath {
        let idx = rank_index(sorted_periods.len(), fraction);
        let periods = sorted_periods[idx];
        let exact = trajectories
            .iter()
            .find(|t| t.outcome == TrialOutcome::Success { periods });
        let chosen = exact.unwrap_or_else(|| ranked[idx.min(ranked.len() - 1)].1);
        RepresentativePath {
            periods,
            values: chosen.values.clone(),
        }
    };

    Some(RepresentativePaths {
        best: pick(BEST_FRACTION),
        median: pick(MEDIAN_FRACTION),
        worst: pick(WORST_FRACTION),
    })
}
