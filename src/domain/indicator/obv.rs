//! OBV (On-Balance Volume).

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{Cached, Calculate, Evaluated, IndicatorRef};
use crate::domain::series::BarSeries;

/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// Otherwise OBV[i] = OBV[i-1]
///
/// No warmup period.
#[derive(Debug)]
pub struct OnBalanceVolume {
    series: BarSeries,
}

impl Calculate for OnBalanceVolume {
    fn series(&self) -> &BarSeries {
        &self.series
    }

    fn calculate(&self, position: usize, earlier: &[Evaluated]) -> Evaluated {
        let bar = self.series.bar(position)?;
        if position == 0 {
            return Ok(Some(bar.volume));
        }
        let prev_close = self.series.bar(position - 1)?.close;
        let prev = match &earlier[position - 1] {
            Ok(Some(v)) => *v,
            _ => return Ok(None),
        };
        let obv = if bar.close > prev_close {
            prev + bar.volume
        } else if bar.close < prev_close {
            prev - bar.volume
        } else {
            prev
        };
        Ok(Some(obv))
    }
}

pub fn on_balance_volume(series: BarSeries) -> Cached<OnBalanceVolume> {
    Cached::new(OnBalanceVolume { series })
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(on_balance_volume(args.series(0)?)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "OnBalanceVolumeIndicator",
        vec![Signature::new(vec![ParameterKind::SequenceHandle], build)],
    )?;
    Ok(())
}
