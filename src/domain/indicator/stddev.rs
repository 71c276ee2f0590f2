//! Standard Deviation indicator.
//!
//! Population standard deviation over n input values.
//! Warmup: first (n-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{population_stddev, window, Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct StandardDeviationIndicator {
    input: IndicatorRef,
    period: usize,
}

impl StandardDeviationIndicator {
    pub fn new(input: IndicatorRef, period: usize) -> Self {
        Self { input, period }
    }
}

impl Indicator for StandardDeviationIndicator {
    fn value(&self, position: usize) -> Evaluated {
        Ok(window(self.input.as_ref(), position, self.period)?.map(|w| population_stddev(&w)))
    }

    fn series(&self) -> &BarSeries {
        self.input.series()
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(StandardDeviationIndicator::new(
        args.indicator(0)?,
        args.period(1)?,
    )))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "StandardDeviationIndicator",
        vec![Signature::new(
            vec![ParameterKind::IndicatorHandle, ParameterKind::Int],
            build,
        )],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::price::close_price;
    use crate::domain::indicator::testing::*;
    use approx::assert_relative_eq;

    #[test]
    fn stddev_constant_is_zero() {
        let s = series_from_closes(&[5.0, 5.0, 5.0]);
        let v = values(&StandardDeviationIndicator::new(close_price(s), 3));
        assert_eq!(v[1], None);
        assert_relative_eq!(v[2].unwrap(), 0.0);
    }

    #[test]
    fn stddev_population() {
        let s = series_from_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let v = values(&StandardDeviationIndicator::new(close_price(s), 8));
        assert_relative_eq!(v[7].unwrap(), 2.0);
    }
}
