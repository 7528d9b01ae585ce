use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use super::error::SimulationError;
use super::sampler::{NormalSampler, derive_seed};
use super::stats::nearest_rank;
use super::types::{PERIODS_PER_YEAR, ProjectionParameters, ProjectionResult};

const WORST_BAND: f64 = 0.2;
const MEDIAN_BAND: f64 = 0.5;
const BEST_BAND: f64 = 0.8;

/// Drift is variance-drag corrected: the mean compounds at `cagr`, the median below it.
pub fn project(
    params: &ProjectionParameters,
    seed: Option<u64>,
) -> Result<ProjectionResult, SimulationError> {
    params.validate()?;

    let seed = seed.unwrap_or_else(rand::random);
    let periods_per_year = PERIODS_PER_YEAR as f64;
    let period_mean = (1.0 + params.cagr).ln() / periods_per_year
        - 0.5 * params.volatility.powi(2) / periods_per_year;
    let period_vol = params.volatility / periods_per_year.sqrt();
    let period_count = params.period_count();

    tracing::debug!(
        horizon_years = params.horizon_years,
        trial_count = params.trial_count,
        seed,
        "starting portfolio projection"
    );

    let paths: Vec<Vec<f64>> = (0..params.trial_count)
        .into_par_iter()
        .map(|trial_id| {
            let rng = StdRng::seed_from_u64(derive_seed(seed, trial_id as u64));
            let mut sampler = NormalSampler::new(rng);
            let mut value = 1.0_f64;
            let mut path = Vec::with_capacity(period_count + 1);
            path.push(value);
            for _ in 0..period_count {
                value *= sampler.sample(period_mean, period_vol).exp();
                path.push(value);
            }
            path
        })
        .collect();

    let bands: Vec<(f64, f64, f64)> = (0..=period_count)
        .into_par_iter()
        .map(|period| {
            let mut column: Vec<f64> = paths.iter().map(|path| path[period]).collect();
            column.sort_by(|a, b| a.total_cmp(b));
            (
                nearest_rank(&column, WORST_BAND),
                nearest_rank(&column, MEDIAN_BAND),
                nearest_rank(&column, BEST_BAND),
            )
        })
        .collect();

    let mut worst = Vec::with_capacity(bands.len());
    let mut median = Vec::with_capacity(bands.len());
    let mut best = Vec::with_capacity(bands.len());
    for (w, m, b) in bands {
        worst.push(w);
        median.push(m);
        best.push(b);
    }

    Ok(ProjectionResult {
        horizon_years: params.horizon_years,
        trial_count: params.trial_count,
        best,
        median,
        worst,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn sample_parameters() -> ProjectionParameters {
        ProjectionParameters {
            cagr: 0.07,
            volatility: 0.18,
            horizon_years: 10,
            trial_count: 2_000,
        }
    }

    #[test]
    fn bands_start_at_one_and_cover_every_month() {
        let result = project(&sample_parameters(), Some(42)).expect("valid");
        assert_eq!(result.best.len(), 121);
        assert_eq!(result.median.len(), 121);
        assert_eq!(result.worst.len(), 121);
        assert_eq!(result.best[0], 1.0);
        assert_eq!(result.median[0], 1.0);
        assert_eq!(result.worst[0], 1.0);
    }

    #[test]
    fn bands_are_ordered_and_widen_over_time() {
        let result = project(&sample_parameters(), Some(7)).expect("valid");
        for i in 0..result.median.len() {
            assert!(result.worst[i] <= result.median[i]);
            assert!(result.median[i] <= result.best[i]);
        }
        let spread_1y = result.best[12] - result.worst[12];
        let spread_10y = result.best[120] - result.worst[120];
        assert!(spread_10y > spread_1y);
    }

    #[test]
    fn median_reflects_variance_drag() {
        let params = sample_parameters();
        let result = project(&params, Some(99)).expect("valid");
        let expected = 1.07_f64.powi(10) * (-0.5 * params.volatility.powi(2) * 10.0).exp();
        let median = result.median[120];
        assert!(
            (median / expected - 1.0).abs() < 0.08,
            "median {median} too far from {expected}"
        );
    }

    #[test]
    fn zero_volatility_collapses_bands_onto_compounding_curve() {
        let params = ProjectionParameters {
            volatility: 0.0,
            trial_count: 50,
            horizon_years: 3,
            ..sample_parameters()
        };
        let result = project(&params, Some(1)).expect("valid");
        for (i, value) in result.median.iter().enumerate() {
            let expected = 1.07_f64.powf(i as f64 / 12.0);
            assert!((value - expected).abs() < EPS, "month {i}: {value} vs {expected}");
            assert_eq!(result.best[i], *value);
            assert_eq!(result.worst[i], *value);
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let a = project(&sample_parameters(), Some(5)).expect("valid");
        let b = project(&sample_parameters(), Some(5)).expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let mut params = sample_parameters();
        params.trial_count = 0;
        assert!(project(&params, Some(1)).is_err());

        let mut params = sample_parameters();
        params.volatility = -0.01;
        assert!(matches!(
            project(&params, Some(1)),
            Err(SimulationError::InvalidParameter {
                name: "volatility",
                ..
            })
        ));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(16))]

        #[test]
        fn prop_bands_ordered_and_positive(
            seed in 0u64..1_000,
            cagr_bp in -3_000i32..3_000,
            vol_bp in 0u32..6_000,
            horizon_years in 1u32..6,
            trials in 1u32..120,
        ) {
            let params = ProjectionParameters {
                cagr: cagr_bp as f64 / 10_000.0,
                volatility: vol_bp as f64 / 10_000.0,
                horizon_years,
                trial_count: trials,
            };
            let result = project(&params, Some(seed)).expect("valid");
            prop_assert_eq!(result.median.len(), (horizon_years * 12 + 1) as usize);
            prop_assert_eq!(result.median[0], 1.0);
            for i in 0..result.median.len() {
                prop_assert!(result.worst[i] > 0.0);
                prop_assert!(result.worst[i] <= result.median[i]);
                prop_assert!(result.median[i] <= result.best[i]);
            }
        }
    }
}
