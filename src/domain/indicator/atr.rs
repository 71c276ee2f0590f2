//! ATR (Average True Range).
//!
//! TR[0] = high - low, TR[i] = true_range(close[i-1]).
//! Seed with the mean TR of the first n bars, then Wilder smoothing:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::ema::ExponentialAverage;
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct TrueRangeIndicator {
    series: BarSeries,
}

impl TrueRangeIndicator {
    pub fn new(series: BarSeries) -> Self {
        Self { series }
    }
}

impl Indicator for TrueRangeIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let bar = self.series.bar(position)?;
        if position == 0 {
            return Ok(Some(bar.high - bar.low));
        }
        let prev = self.series.bar(position - 1)?;
        Ok(Some(bar.true_range(prev.close)))
    }

    fn series(&self) -> &BarSeries {
        &self.series
    }
}

/// Builds ATR as Wilder smoothing of the true range.
pub fn average_true_range(series: BarSeries, period: usize) -> IndicatorRef {
    let tr: IndicatorRef = Arc::new(TrueRangeIndicator::new(series));
    Arc::new(ExponentialAverage::mma(tr, period))
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(average_true_range(args.series(0)?, args.period(1)?))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog
        .register(
            "ATRIndicator",
            vec![Signature::new(
                vec![ParameterKind::SequenceHandle, ParameterKind::Int],
                build,
            )],
        )?
        .register(
            "TRIndicator",
            vec![Signature::new(vec![ParameterKind::SequenceHandle], |a| {
                Ok(Arc::new(TrueRangeIndicator::new(a.series(0)?)))
            })],
        )?;
    Ok(())
}
