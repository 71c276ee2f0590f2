//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(P[i-n+1..=i]). Warmup: first (n-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{mean, window, Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct SmaIndicator {
    input: IndicatorRef,
    period: usize,
}

impl SmaIndicator {
    pub fn new(input: IndicatorRef, period: usize) -> Self {
        Self { input, period }
    }
}

impl Indicator for SmaIndicator {
    fn value(&self, position: usize) -> Evaluated {
        Ok(window(self.input.as_ref(), position, self.period)?.map(|w| mean(&w)))
    }

    fn series(&self) -> &BarSeries {
        self.input.series()
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(SmaIndicator::new(args.indicator(0)?, args.period(1)?)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "SMAIndicator",
        vec![Signature::new(
            vec![ParameterKind::IndicatorHandle, ParameterKind::Int],
            build,
        )],
    )?;
    Ok(())
}
