//! Core domain types and logic.

pub mod catalog;
pub mod column_indicator;
pub mod construction;
pub mod error;
pub mod expression;
pub mod indicator;
pub mod ohlcv;
pub mod persistence;
pub mod series;
