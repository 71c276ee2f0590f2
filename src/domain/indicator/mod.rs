//! Technical indicators evaluated position by position over a [`BarSeries`].
//!
//! An indicator answers `value(position)` with `Ok(None)` while it has no value
//! (warm-up, missing input) and `Err` when the position itself cannot be
//! evaluated. Indicators whose value depends on their own previous value wrap a
//! [`Calculate`] implementation in [`Cached`], which fills a prefix cache up to
//! the requested position.

pub mod atr;
pub mod bollinger;
pub mod constant;
pub mod covariance;
pub mod cross;
pub mod ema;
pub mod fisher;
pub mod macd;
pub mod obv;
pub mod pivot;
pub mod price;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod wma;

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::domain::catalog::CatalogBuilder;
use crate::domain::error::{CatalogError, EvalError};
use crate::domain::series::BarSeries;

pub type Evaluated = Result<Option<f64>, EvalError>;

pub trait Indicator: Send + Sync + fmt::Debug {
    fn value(&self, position: usize) -> Evaluated;

    fn series(&self) -> &BarSeries;
}

pub type IndicatorRef = Arc<dyn Indicator>;

/// One step of a recursively defined indicator.
pub trait Calculate: Send + Sync + fmt::Debug {
    fn series(&self) -> &BarSeries;

    /// Value at `position`, given every earlier value of this indicator.
    fn calculate(&self, position: usize, earlier: &[Evaluated]) -> Evaluated;
}

/// Memoizes a [`Calculate`] so each position is computed once, in order.
#[derive(Debug)]
pub struct Cached<C> {
    inner: C,
    values: Mutex<Vec<Evaluated>>,
}

impl<C: Calculate> Cached<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            values: Mutex::new(Vec::new()),
        }
    }
}

impl<C: Calculate + 'static> Indicator for Cached<C> {
    fn value(&self, position: usize) -> Evaluated {
        let len = self.inner.series().len();
        if position >= len {
            return Err(EvalError::OutOfRange { position, len });
        }
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        while values.len() <= position {
            let next = self.inner.calculate(values.len(), &values);
            values.push(next);
        }
        values[position].clone()
    }

    fn series(&self) -> &BarSeries {
        self.inner.series()
    }
}

/// Values of `input` over the `period` positions ending at `end`.
///
/// `None` while the window reaches before position 0 or any value in it is
/// missing.
pub fn window(
    input: &dyn Indicator,
    end: usize,
    period: usize,
) -> Result<Option<Vec<f64>>, EvalError> {
    if period == 0 || end + 1 < period {
        return Ok(None);
    }
    let mut out = Vec::with_capacity(period);
    for i in (end + 1 - period)..=end {
        match input.value(i)? {
            Some(v) => out.push(v),
            None => return Ok(None),
        }
    }
    Ok(Some(out))
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
pub fn population_stddev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Register every indicator this crate ships.
pub fn register_all(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    price::register(catalog)?;
    sma::register(catalog)?;
    ema::register(catalog)?;
    wma::register(catalog)?;
    rsi::register(catalog)?;
    roc::register(catalog)?;
    stddev::register(catalog)?;
    bollinger::register(catalog)?;
    macd::register(catalog)?;
    atr::register(catalog)?;
    obv::register(catalog)?;
    cross::register(catalog)?;
    covariance::register(catalog)?;
    fisher::register(catalog)?;
    pivot::register(catalog)?;
    constant::register(catalog)?;
    Ok(())
}
