//! Cross-above detection between two indicators.
//!
//! 1.0 where `left` crosses above `right`:
//! `left[i] > right[i] && left[i-1] <= right[i-1]`, otherwise 0.0.
//! Position 0 is always 0.0; missing inputs give no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct CrossIndicator {
    left: IndicatorRef,
    right: IndicatorRef,
}

impl CrossIndicator {
    pub fn new(left: IndicatorRef, right: IndicatorRef) -> Self {
        Self { left, right }
    }
}

impl Indicator for CrossIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let (Some(left_curr), Some(right_curr)) =
            (self.left.value(position)?, self.right.value(position)?)
        else {
            return Ok(None);
        };
        if position == 0 {
            return Ok(Some(0.0));
        }
        let (Some(left_prev), Some(right_prev)) = (
            self.left.value(position - 1)?,
            self.right.value(position - 1)?,
        ) else {
            return Ok(None);
        };
        let crossed = left_curr > right_curr && left_prev <= right_prev;
        Ok(Some(if crossed { 1.0 } else { 0.0 }))
    }

    fn series(&self) -> &BarSeries {
        self.left.series()
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(CrossIndicator::new(
        args.indicator(0)?,
        args.indicator(1)?,
    )))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "CrossIndicator",
        vec![Signature::new(
            vec![ParameterKind::IndicatorHandle, ParameterKind::IndicatorHandle],
            build,
        )],
    )?;
    Ok(())
}
