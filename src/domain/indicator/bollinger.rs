//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (k × StdDev)
//! - Lower: Middle - (k × StdDev)
//!
//! StdDev is the population standard deviation. Default k = 2.0.
//! Warmup: first (n-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{mean, population_stddev, window, Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug)]
pub struct BollingerIndicator {
    input: IndicatorRef,
    period: usize,
    multiplier: f64,
    band: Band,
}

impl BollingerIndicator {
    pub fn new(input: IndicatorRef, period: usize, multiplier: f64, band: Band) -> Self {
        Self {
            input,
            period,
            multiplier,
            band,
        }
    }
}

impl Indicator for BollingerIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let Some(w) = window(self.input.as_ref(), position, self.period)? else {
            return Ok(None);
        };
        let middle = mean(&w);
        let spread = self.multiplier * population_stddev(&w);
        Ok(Some(match self.band {
            Band::Upper => middle + spread,
            Band::Middle => middle,
            Band::Lower => middle - spread,
        }))
    }

    fn series(&self) -> &BarSeries {
        self.input.series()
    }
}

fn build(args: &BoundArgs, band: Band) -> Result<IndicatorRef, ConstructionFailure> {
    let multiplier = if args.len() > 2 {
        args.num(2)?
    } else {
        DEFAULT_MULTIPLIER
    };
    Ok(Arc::new(BollingerIndicator::new(
        args.indicator(0)?,
        args.period(1)?,
        multiplier,
        band,
    )))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    use ParameterKind::{IndicatorHandle, Int, NumericValue};
    catalog
        .register(
            "BollingerBandsMiddleIndicator",
            vec![Signature::new(vec![IndicatorHandle, Int], |a| {
                build(a, Band::Middle)
            })],
        )?
        .register(
            "BollingerBandsUpperIndicator",
            vec![
                Signature::new(vec![IndicatorHandle, Int], |a| build(a, Band::Upper)),
                Signature::new(vec![IndicatorHandle, Int, NumericValue], |a| {
                    build(a, Band::Upper)
                }),
            ],
        )?
        .register(
            "BollingerBandsLowerIndicator",
            vec![
                Signature::new(vec![IndicatorHandle, Int], |a| build(a, Band::Lower)),
                Signature::new(vec![IndicatorHandle, Int, NumericValue], |a| {
                    build(a, Band::Lower)
                }),
            ],
        )?;
    Ok(())
}
