//! Weighted Moving Average.
//!
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{window, Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct WmaIndicator {
    input: IndicatorRef,
    period: usize,
}

impl WmaIndicator {
    pub fn new(input: IndicatorRef, period: usize) -> Self {
        Self { input, period }
    }
}

impl Indicator for WmaIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let divisor = (self.period * (self.period + 1)) as f64 / 2.0;
        Ok(
            window(self.input.as_ref(), position, self.period)?.map(|w| {
                w.iter()
                    .enumerate()
                    .map(|(i, p)| (i + 1) as f64 * p)
                    .sum::<f64>()
                    / divisor
            }),
        )
    }

    fn series(&self) -> &BarSeries {
        self.input.series()
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(WmaIndicator::new(args.indicator(0)?, args.period(1)?)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "WMAIndicator",
        vec![Signature::new(
            vec![ParameterKind::IndicatorHandle, ParameterKind::Int],
            build,
        )],
    )?;
    Ok(())
}
