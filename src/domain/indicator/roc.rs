//! ROC (Rate of Change).
//!
//! ROC(n)[i] = ((P[i] - P[i-n]) / P[i-n]) * 100, and 0 when P[i-n] == 0.
//! Warmup: first n positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

#[derive(Debug)]
pub struct RocIndicator {
    input: IndicatorRef,
    period: usize,
}

impl RocIndicator {
    pub fn new(input: IndicatorRef, period: usize) -> Self {
        Self { input, period }
    }
}

impl Indicator for RocIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let curr = self.input.value(position)?;
        if position < self.period {
            return Ok(None);
        }
        let (Some(curr), Some(prev)) = (curr, self.input.value(position - self.period)?) else {
            return Ok(None);
        };
        if prev == 0.0 {
            return Ok(Some(0.0));
        }
        Ok(Some((curr - prev) / prev * 100.0))
    }

    fn series(&self) -> &BarSeries {
        self.input.series()
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(RocIndicator::new(args.indicator(0)?, args.period(1)?)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "ROCIndicator",
        vec![Signature::new(
            vec![ParameterKind::IndicatorHandle, ParameterKind::Int],
            build,
        )],
    )?;
    Ok(())
}
