//! Indicators built from literal values rather than from bars.
//!
//! Neither is reachable from expression text: `constant` is registered as
//! internal and `fixed` takes a value list that text cannot express.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct ConstantIndicator {
    series: BarSeries,
    value: f64,
}

impl ConstantIndicator {
    pub fn new(series: BarSeries, value: f64) -> Self {
        Self { series, value }
    }
}

impl Indicator for ConstantIndicator {
    fn value(&self, position: usize) -> Evaluated {
        self.series.bar(position)?;
        Ok(Some(self.value))
    }

    fn series(&self) -> &BarSeries {
        &self.series
    }
}

/// One value per position; positions past the list have no value.
#[derive(Debug)]
pub struct FixedIndicator {
    series: BarSeries,
    values: Vec<f64>,
}

impl FixedIndicator {
    pub fn new(series: BarSeries, values: Vec<f64>) -> Self {
        Self { series, values }
    }
}

impl Indicator for FixedIndicator {
    fn value(&self, position: usize) -> Evaluated {
        self.series.bar(position)?;
        Ok(self.values.get(position).copied())
    }

    fn series(&self) -> &BarSeries {
        &self.series
    }
}

fn build_constant(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(ConstantIndicator::new(args.series(0)?, args.num(1)?)))
}

fn build_fixed(_: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Err(ConstructionFailure::new(
        "fixed values can only be supplied programmatically",
    ))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog
        .register_internal(
            "ConstantIndicator",
            vec![Signature::new(
                vec![ParameterKind::SequenceHandle, ParameterKind::NumericValue],
                build_constant,
            )],
        )?
        .register(
            "FixedIndicator",
            vec![Signature::new(
                vec![
                    ParameterKind::SequenceHandle,
                    ParameterKind::Unsupported("Num[]"),
                ],
                build_fixed,
            )],
        )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::EvalError;
    use crate::domain::indicator::testing::*;

    #[test]
    fn constant_everywhere_in_range() {
        let c = ConstantIndicator::new(series_from_closes(&[1.0, 2.0]), 3.5);
        assert_eq!(values(&c), vec![Some(3.5), Some(3.5)]);
        assert!(matches!(c.value(2), Err(EvalError::OutOfRange { .. })));
    }

    #[test]
    fn fixed_runs_out() {
        let f = FixedIndicator::new(series_from_closes(&[1.0, 2.0, 3.0]), vec![7.0, 8.0]);
        assert_eq!(values(&f), vec![Some(7.0), Some(8.0), None]);
    }
}
