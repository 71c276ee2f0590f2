//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)); if avg_loss == 0, RSI = 100.
//! Warmup: first n positions have no value (n changes are needed).

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::ema::ExponentialAverage;
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

/// Positive (or negated negative) change of the input since the previous position.
#[derive(Debug)]
pub struct ChangeIndicator {
    input: IndicatorRef,
    gains: bool,
}

impl ChangeIndicator {
    pub fn gain(input: IndicatorRef) -> Self {
        Self { input, gains: true }
    }

    pub fn loss(input: IndicatorRef) -> Self {
        Self {
            input,
            gains: false,
        }
    }
}

impl Indicator for ChangeIndicator {
    fn value(&self, position: usize) -> Evaluated {
        if position == 0 {
            self.input.series().bar(position)?;
            return Ok(None);
        }
        let (Some(curr), Some(prev)) =
            (self.input.value(position)?, self.input.value(position - 1)?)
        else {
            return Ok(None);
        };
        let change = curr - prev;
        let v = if self.gains {
            change.max(0.0)
        } else {
            (-change).max(0.0)
        };
        Ok(Some(v))
    }

    fn series(&self) -> &BarSeries {
        self.input.series()
    }
}

#[derive(Debug)]
pub struct RsiIndicator {
    avg_gain: IndicatorRef,
    avg_loss: IndicatorRef,
}

impl RsiIndicator {
    pub fn new(input: IndicatorRef, period: usize) -> Self {
        let gain: IndicatorRef = Arc::new(ChangeIndicator::gain(input.clone()));
        let loss: IndicatorRef = Arc::new(ChangeIndicator::loss(input));
        Self {
            avg_gain: Arc::new(ExponentialAverage::mma(gain, period)),
            avg_loss: Arc::new(ExponentialAverage::mma(loss, period)),
        }
    }
}

impl Indicator for RsiIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let (Some(gain), Some(loss)) = (
            self.avg_gain.value(position)?,
            self.avg_loss.value(position)?,
        ) else {
            return Ok(None);
        };
        if loss == 0.0 {
            return Ok(Some(100.0));
        }
        Ok(Some(100.0 - 100.0 / (1.0 + gain / loss)))
    }

    fn series(&self) -> &BarSeries {
        self.avg_gain.series()
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(RsiIndicator::new(args.indicator(0)?, args.period(1)?)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "RSIIndicator",
        vec![Signature::new(
            vec![ParameterKind::IndicatorHandle, ParameterKind::Int],
            build,
        )],
    )?;
    Ok(())
}
