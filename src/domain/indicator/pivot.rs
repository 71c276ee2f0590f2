//! Floor-trader pivot point of the previous period.
//!
//! Pivot = (high + low + close) / 3, where high and low are the extremes of
//! the previous period and close is its last close. Positions in the first
//! period have no value.

use std::sync::Arc;

use chrono::Datelike;

use crate::domain::catalog::{CatalogBuilder, EnumKind, ParameterKind, Signature};
use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure, EvalError};
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;

pub const TIME_LEVEL: EnumKind = EnumKind {
    name: "TimeLevel",
    values: &["DAY", "WEEK", "MONTH", "YEAR", "BARBASED"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLevel {
    Day,
    Week,
    Month,
    Year,
    BarBased,
}

impl TimeLevel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "DAY" => Some(TimeLevel::Day),
            "WEEK" => Some(TimeLevel::Week),
            "MONTH" => Some(TimeLevel::Month),
            "YEAR" => Some(TimeLevel::Year),
            "BARBASED" => Some(TimeLevel::BarBased),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PivotPointIndicator {
    series: BarSeries,
    level: TimeLevel,
}

impl PivotPointIndicator {
    pub fn new(series: BarSeries, level: TimeLevel) -> Self {
        Self { series, level }
    }

    fn period_key(&self, position: usize) -> Result<i64, EvalError> {
        let date = self.series.bar(position)?.date;
        Ok(match self.level {
            TimeLevel::Day => i64::from(date.num_days_from_ce()),
            TimeLevel::Week => {
                let w = date.iso_week();
                i64::from(w.year()) * 100 + i64::from(w.week())
            }
            TimeLevel::Month => i64::from(date.year()) * 100 + i64::from(date.month()),
            TimeLevel::Year => i64::from(date.year()),
            TimeLevel::BarBased => position as i64,
        })
    }
}

impl Indicator for PivotPointIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let current = self.period_key(position)?;

        // last position of the previous period
        let mut end = position;
        while end > 0 && self.period_key(end - 1)? == current {
            end -= 1;
        }
        if end == 0 {
            return Ok(None);
        }
        let last = end - 1;
        let previous = self.period_key(last)?;
        let close = self.series.bar(last)?.close;

        let mut high = f64::NEG_INFINITY;
        let mut low = f64::INFINITY;
        let mut i = last;
        loop {
            let bar = self.series.bar(i)?;
            high = high.max(bar.high);
            low = low.min(bar.low);
            if i == 0 || self.period_key(i - 1)? != previous {
                break;
            }
            i -= 1;
        }
        Ok(Some((high + low + close) / 3.0))
    }

    fn series(&self) -> &BarSeries {
        &self.series
    }
}

fn build(args: &BoundArgs) -> Result<IndicatorRef, ConstructionFailure> {
    let name = args.enum_value(1)?;
    let level = TimeLevel::from_name(name)
        .ok_or_else(|| ConstructionFailure::new(format!("unknown time level {name}")))?;
    Ok(Arc::new(PivotPointIndicator::new(args.series(0)?, level)))
}

pub fn register(catalog: &mut CatalogBuilder) -> Result<(), CatalogError> {
    catalog.register(
        "PivotPointIndicator",
        vec![Signature::new(
            vec![ParameterKind::SequenceHandle, ParameterKind::Enum(TIME_LEVEL)],
            build,
        )],
    )?;
    Ok(())
}
