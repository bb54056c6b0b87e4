//! Derived metrics
//!
//! Combines readings into a new one. The combinator only applies the formula
//! it is given; constants such as the token supply come from configuration.

use crate::types::{MetricResult, Unit};
use serde::Deserialize;

/// Arithmetic applied to the input values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formula {
    /// Product of all inputs, times a constant factor
    ScaledProduct { factor: f64 },
}

impl Formula {
    /// `price × supply` with a single price input
    pub fn times(factor: f64) -> Self {
        Formula::ScaledProduct { factor }
    }

    fn evaluate(&self, values: &[f64]) -> f64 {
        match self {
            Formula::ScaledProduct { factor } => values.iter().product::<f64>() * factor,
        }
    }
}

/// Rounding applied to the derived value
///
/// Written in config as `"exact"`, `"nearest"`, `"truncate"` or
/// `{ decimals = N }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    Exact,
    /// Round half away from zero to an integer
    Nearest,
    /// Drop the fractional part
    Truncate,
    /// Round to a number of decimal places
    Decimals(u32),
}

impl Rounding {
    fn apply(&self, value: f64) -> f64 {
        match *self {
            Rounding::Exact => value,
            Rounding::Nearest => value.round(),
            Rounding::Truncate => value.trunc(),
            Rounding::Decimals(places) => {
                let scale = 10f64.powi(places as i32);
                (value * scale).round() / scale
            }
        }
    }
}

/// Combine readings into a derived reading
///
/// Returns an unavailable reading if there are no inputs, if any input is
/// unavailable, or if the result is not a finite non-negative number. The
/// result carries the timestamp of the oldest input.
pub fn combine(inputs: &[MetricResult], formula: Formula, rounding: Rounding, unit: Unit) -> MetricResult {
    let Some(oldest) = inputs.iter().map(|m| m.fetched_at).min() else {
        return MetricResult::unavailable(unit);
    };

    let values: Option<Vec<f64>> = inputs.iter().map(|m| m.value).collect();
    let value = values.map(|values| rounding.apply(formula.evaluate(&values)));

    MetricResult::at(value, unit, oldest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TOKEN_SUPPLY;
    use crate::format::format_currency;

    #[test]
    fn test_null_input_propagates() {
        let price = MetricResult::unavailable(Unit::USD);
        let cap = combine(&[price], Formula::times(TOKEN_SUPPLY), Rounding::Nearest, Unit::USD);
        assert_eq!(cap.value, None);
        assert_eq!(cap.unit, Unit::USD);
    }

    #[test]
    fn test_one_null_among_many() {
        let inputs = [
            MetricResult::new(2.0, Unit::KAS),
            MetricResult::unavailable(Unit::USD),
        ];
        let result = combine(&inputs, Formula::times(10.0), Rounding::Exact, Unit::USD);
        assert!(!result.is_available());
    }

    #[test]
    fn test_market_cap() {
        let price = MetricResult::new(0.0000012, Unit::USD);
        let cap = combine(&[price], Formula::times(287_000_000_000.0), Rounding::Nearest, Unit::USD);
        assert_eq!(cap.value, Some(344_400.0));
        assert_eq!(format_currency(cap.value.unwrap(), 0), "$344,400");
    }

    #[test]
    fn test_empty_inputs() {
        let result = combine(&[], Formula::times(1.0), Rounding::Exact, Unit::USD);
        assert!(!result.is_available());
    }

    #[test]
    fn test_overflow_yields_unavailable() {
        let price = MetricResult::new(f64::MAX, Unit::USD);
        let result = combine(&[price], Formula::times(10.0), Rounding::Exact, Unit::USD);
        assert!(!result.is_available());
    }

    #[test]
    fn test_rounding_modes() {
        assert_eq!(Rounding::Truncate.apply(9.99), 9.0);
        assert_eq!(Rounding::Nearest.apply(9.5), 10.0);
        assert_eq!(Rounding::Decimals(2).apply(1.234), 1.23);
        assert_eq!(Rounding::Exact.apply(1.234), 1.234);
    }

    #[test]
    fn test_keeps_oldest_timestamp() {
        let older = MetricResult::at(Some(1.0), Unit::USD, chrono::Utc::now() - chrono::Duration::seconds(30));
        let newer = MetricResult::new(2.0, Unit::USD);
        let result = combine(&[older.clone(), newer], Formula::times(1.0), Rounding::Exact, Unit::USD);
        assert_eq!(result.fetched_at, older.fetched_at);
        assert_eq!(result.value, Some(2.0));
    }
}
