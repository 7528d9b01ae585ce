use super::error::{SimulationError, ensure_finite};
use super::types::HoldingHistory;

/// Each year compounds the weight-averaged `return + dividend_yield` of the
/// holdings with a record for that year, starting from 1.0.
pub fn historical_performance(holdings: &[HoldingHistory]) -> Result<Vec<f64>, SimulationError> {
    if holdings.is_empty() {
        return Err(SimulationError::invalid("holdings", "must not be empty"));
    }

    let mut total_weight = 0.0;
    for holding in holdings {
        ensure_finite("weight", holding.weight)?;
        ensure_finite("dividend_yield", holding.dividend_yield)?;
        if holding.weight < 0.0 {
            return Err(SimulationError::invalid("weight", "must be >= 0"));
        }
        if let Some(bad) = holding.annual_returns.iter().find(|r| !r.is_finite()) {
            return Err(SimulationError::invalid(
                "annual_returns",
                format!("must be finite, got {bad}"),
            ));
        }
        total_weight += holding.weight;
    }
    if total_weight <= 0.0 {
        return Err(SimulationError::invalid("weight", "total weight must be > 0"));
    }

    let years = holdings
        .iter()
        .map(|h| h.annual_returns.len())
        .max()
        .unwrap_or(0);

    let mut values = Vec::with_capacity(years + 1);
    let mut value = 1.0_f64;
    values.push(value);

    for year in 0..years {
        let (weighted, weight) = holdings
            .iter()
            .filter_map(|h| {
                h.annual_returns
                    .get(year)
                    .map(|r| (h.weight * (r + h.dividend_yield), h.weight))
            })
            .fold((0.0, 0.0), |(acc_r, acc_w), (r, w)| (acc_r + r, acc_w + w));

        let year_return = if weight > 0.0 { weighted / weight } else { 0.0 };
        value = (value * (1.0 + year_return)).max(0.0);
        values.push(value);
    }

    Ok(values)
}
