//! Fisher transform of an input normalized over a rolling range.
//!
//! V[i] = alpha * 2 * ((P[i] - min) / (max - min) - 0.5) + beta * V[i-1],
//! clipped to ±0.999, then
//! F[i] = 0.5 * ln((1 + V) / (1 - V)) + 0.5 * F[i-1] when smoothing.
//! Warmup: first (n-1) positions have no value.

use std::sync::Arc;

use crate::domain::catalog::{CatalogBuilder, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{window, Cached, Calculate, Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

pub const DEFAULT_ALPHA: f64 = 0.33;
pub const DEFAULT_BETA: f64 = 0.67;
const CLIP: f64 = 0.999;

fn previous(earlier: &[Evaluated], position: usize) -> f64 {
    match position.checked_sub(1).and_then(|p| earlier.get(p)) {
        Some(Ok(Some(v))) => *v,
        _ => 0.0,
    }
}

#[derive(Debug)]
pub struct NormalizedRange {
    input: IndicatorRef,
    period: usize,
    alpha: f64,
    beta: f64,
}

impl Calculate for NormalizedRange {
    fn series(&self) -> &BarSeries {
        self.input.series()
    }

    fn calculate(&self, position: usize, earlier: &[Evaluated]) -> Evaluated {
        let Some(w) = window(self.input.as_ref(), position, self.period)? else {
            return Ok(None);
        };
        let max = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = w.iter().copied().fold(f64::INFINITY, f64::min);
        let last = w[w.len() - 1];
        let ratio = if max > min {
            (last - min) / (max - min)
        } else {
            0.5
        };
        let v = self.alpha * 2.0 * (ratio - 0.5) + self.beta * previous(earlier, position);
        Ok(Some(v.clamp(-CLIP, CLIP)))
    }
}

#[derive(Debug)]
pub struct Fisher {
    normalized: Cached<NormalizedRange>,
    smooth: bool,
}

impl Calculate for Fisher {
    fn series(&self) -> &BarSeries {
        self.normalized.series()
    }

    fn calculate(&self, position: usize, earlier: &[Evaluated]) -> Evaluated {
        let Some(v) = self.normalized.value(position)? else {
            return Ok(None);
        };
        let mut f = 0.5 * ((1.0 + v) / (1.0 - v)).ln();
        if self.smooth {
            f += 0.5 * previous(earlier, position);
        }
        Ok(Some(f))
    }
}

pub fn fisher(
    input: IndicatorRef,
    period: usize,
    alpha: f64,
    beta: f64,
    smooth: bool,
) -> Cached<Fisher> {
    Cached::new(Fisher {
        normalized: Cached::new(NormalizedRange {
            input,
            period,
            alpha,
            beta,
        }),
        smooth,
    })
}

fn finite(name: &str, v: f64) -> Result<f64, ConstructionFailure> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ConstructionFailure::new(format!("{name} must be finite, got {v}")))
    }
}

fn build(
    args: &BoundArgs,
    alpha: f64,
    beta: f64,
    smooth: bool,
) -> Result<IndicatorRef, ConstructionFailure> {
    Ok(Arc::new(fisher(
        args.indicator(0)?,
        args.period(1)?,
        finite("alpha", alpha)?,
        finite("beta", beta)?,
        smooth,
    )))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    use ParameterKind::{Boolean, Double, IndicatorHandle, Int};
    catalog.register(
        "FisherIndicator",
        vec![
            Signature::new(vec![IndicatorHandle, Int], |a| {
                build(a, DEFAULT_ALPHA, DEFAULT_BETA, true)
            }),
            Signature::new(vec![IndicatorHandle, Int, Boolean], |a| {
                build(a, DEFAULT_ALPHA, DEFAULT_BETA, a.boolean(2)?)
            }),
            Signature::new(vec![IndicatorHandle, Int, Double, Double], |a| {
                build(a, a.double(2)?, a.double(3)?, true)
            }),
            Signature::new(vec![IndicatorHandle, Int, Double, Boolean], |a| {
                let alpha = a.double(2)?;
                build(a, alpha, 1.0 - alpha, a.boolean(3)?)
            }),
        ],
    )?;
    Ok(())
}
