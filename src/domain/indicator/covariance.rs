//! Population covariance of two indicators over a rolling window.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{mean, window, Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct CovarianceIndicator {
    first: IndicatorRef,
    second: IndicatorRef,
    period: usize,
}

impl CovarianceIndicator {
    pub fn new(first: IndicatorRef, second: IndicatorRef, period: usize) -> Self {
        Self {
            first,
            second,
            period,
        }
    }
}

impl Indicator for CovarianceIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let a = window(self.first.as_ref(), position, self.period)?;
        let b = window(self.second.as_ref(), position, self.period)?;
        let (Some(a), Some(b)) = (a, b) else {
            return Ok(None);
        };
        let (ma, mb) = (mean(&a), mean(&b));
        let cov = a
            .iter()
            .zip(&b)
            .map(|(x, y)| (x - ma) * (y - mb))
            .sum::<f64>()
            / self.period as f64;
        Ok(Some(cov))
    }

    fn series(&self) -> &BarSeries {
        self.first.series()
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(CovarianceIndicator::new(
        args.indicator(0)?,
        args.indicator(1)?,
        args.period(2)?,
    )))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    use ParameterKind::{IndicatorHandle, Int};
    catalog.register(
        "CovarianceIndicator",
        vec![Signature::new(vec![IndicatorHandle, IndicatorHandle, Int], build)],
    )?;
    Ok(())
}
