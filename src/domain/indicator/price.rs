//! Raw bar fields exposed as indicators.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::BarSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
    Typical,
}

impl Field {
    fn read(self, bar: &OhlcvBar) -> f64 {
        match self {
            Field::Open => bar.open,
            Field::High => bar.high,
            Field::Low => bar.low,
            Field::Close => bar.close,
            Field::Volume => bar.volume,
            Field::Typical => bar.typical_price(),
        }
    }
}

#[derive(Debug)]
pub struct PriceIndicator {
    series: BarSeries,
    field: Field,
}

impl PriceIndicator {
    pub fn new(series: BarSeries, field: Field) -> Self {
        Self { series, field }
    }
}

impl Indicator for PriceIndicator {
    fn value(&self, position: usize) -> Evaluated {
        Ok(Some(self.field.read(self.series.bar(position)?)))
    }

    fn series(&self) -> &BarSeries {
        &self.series
    }
}

pub fn close_price(series: BarSeries) -> IndicatorRef {
    Arc::new(PriceIndicator::new(series, Field::Close))
}

fn factory(args: &BoundArgs, field: Field) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(PriceIndicator::new(args.series(0)?, field)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    let series_only = || vec![ParameterKind::SequenceHandle];
    catalog
        .register(
            "ClosePriceIndicator",
            vec![Signature::new(series_only(), |a| factory(a, Field::Close))],
        )?
        .register(
            "OpenPriceIndicator",
            vec![Signature::new(series_only(), |a| factory(a, Field::Open))],
        )?
        .register(
            "HighPriceIndicator",
            vec![Signature::new(series_only(), |a| factory(a, Field::High))],
        )?
        .register(
            "LowPriceIndicator",
            vec![Signature::new(series_only(), |a| factory(a, Field::Low))],
        )?
        .register(
            "VolumeIndicator",
            vec![Signature::new(series_only(), |a| factory(a, Field::Volume))],
        )?
        .register(
            "TypicalPriceIndicator",
            vec![Signature::new(series_only(), |a| factory(a, Field::Typical))],
        )?;
    Ok(())
}
