//! bartable: compute technical indicators from short call expressions such as
//! `sma(20) as sma_20` and store them as columns of a bar table.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
