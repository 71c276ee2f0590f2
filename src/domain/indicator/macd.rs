//! MACD (Moving Average Convergence Divergence) line.
//!
//! MACD = EMA(fast) - EMA(slow). Default parameters: fast=12, slow=26.
//! Warmup: first (slow-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::ema::ExponentialAverage;
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;

#[derive(Debug)]
pub struct MacdIndicator {
    fast: IndicatorRef,
    slow: IndicatorRef,
}

impl MacdIndicator {
    pub fn new(input: IndicatorRef, fast: usize, slow: usize) -> Self {
        Self {
            fast: Arc::new(ExponentialAverage::ema(input.clone(), fast)),
            slow: Arc::new(ExponentialAverage::ema(input, slow)),
        }
    }
}

impl Indicator for MacdIndicator {
    fn value(&self, position: usize) -> Evaluated {
        match (self.fast.value(position)?, self.slow.value(position)?) {
            (Some(f), Some(s)) => Ok(Some(f - s)),
            _ => Ok(None),
        }
    }

    fn series(&self) -> &BarSeries {
        self.fast.series()
    }
}

fn build_default(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(MacdIndicator::new(
        args.indicator(0)?,
        DEFAULT_FAST,
        DEFAULT_SLOW,
    )))
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    let fast = args.period(1)?;
    let slow = args.period(2)?;
    if fast >= slow {
        return Err(ConstructionFailure::new(format!(
            "short bar count {fast} must be below long bar count {slow}"
        )));
    }
    Ok(Arc::new(MacdIndicator::new(args.indicator(0)?, fast, slow)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    use ParameterKind::{IndicatorHandle, Int};
    catalog.register(
        "MACDIndicator",
        vec![
            Signature::new(vec![IndicatorHandle], build_default),
            Signature::new(vec![IndicatorHandle, Int, Int], build),
        ],
    )?;
    Ok(())
}
