//! Exponential and modified (Wilder) moving averages.
//!
//! EMA: k = 2/(n+1). MMA: k = 1/n.
//! Seed with the SMA of the first full window, then
//! X[i] = X[i-1] + k * (P[i] - X[i-1]).
//! Warmup: first (n-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{
    mean, window, Cached, Calculate, Evaluated, IndicatorRef,
};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct ExponentialAverage {
    input: IndicatorRef,
    period: usize,
    k: f64,
}

impl ExponentialAverage {
    pub fn ema(input: IndicatorRef, period: usize) -> Cached<Self> {
        let k = 2.0 / (period as f64 + 1.0);
        Cached::new(Self { input, period, k })
    }

    pub fn mma(input: IndicatorRef, period: usize) -> Cached<Self> {
        let k = 1.0 / period as f64;
        Cached::new(Self { input, period, k })
    }
}

impl Calculate for ExponentialAverage {
    fn series(&self) -> &BarSeries {
        self.input.series()
    }

    fn calculate(&self, position: usize, earlier: &[Evaluated]) -> Evaluated {
        let prev = position
            .checked_sub(1)
            .and_then(|p| earlier.get(p))
            .and_then(|v| v.as_ref().ok().copied().flatten());
        match prev {
            Some(prev) => Ok(self
                .input
                .value(position)?
                .map(|x| prev + self.k * (x - prev))),
            None => Ok(window(self.input.as_ref(), position, self.period)?.map(|w| mean(&w))),
        }
    }
}

fn build_ema(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(ExponentialAverage::ema(
        args.indicator(0)?,
        args.period(1)?,
    )))
}

fn build_mma(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(ExponentialAverage::mma(
        args.indicator(0)?,
        args.period(1)?,
    )))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    let params = || vec![ParameterKind::IndicatorHandle, ParameterKind::Int];
    catalog
        .register("EMAIndicator", vec![Signature::new(params(), build_ema)])?
        .register("MMAIndicator", vec![Signature::new(params(), build_mma)])?;
    Ok(())
}
