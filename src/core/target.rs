use super::error::{SimulationError, ensure_finite};
use super::types::PERIODS_PER_YEAR;

/// Capital needed to fund `desired_monthly_income` from a portfolio yielding
/// `annual_return_percent` without drawing down principal.
pub fn required_capital(
    desired_monthly_income: f64,
    annual_return_percent: f64,
) -> Result<f64, SimulationError> {
    ensure_finite("desired_monthly_income", desired_monthly_income)?;
    ensure_finite("annual_return_percent", annual_return_percent)?;
    if desired_monthly_income < 0.0 {
        return Err(SimulationError::invalid("desired_monthly_income", "must be >= 0"));
    }
    if annual_return_percent <= 0.0 {
        return Err(SimulationError::invalid("annual_return_percent", "must be > 0"));
    }

    let annual_income = desired_monthly_income * PERIODS_PER_YEAR as f64;
    Ok(annual_income / (annual_return_percent / 100.0))
}
