//! Signature selection, argument coercion and indicator instantiation.
//!
//! Given a resolved [`FactoryDescriptor`] and the raw argument tokens of an
//! expression, the engine tries each candidate signature in a fixed order and
//! returns the first indicator whose factory succeeds.
//!
//! Candidate order:
//! - only signatures of arity `n` or `n + 1` for `n` supplied tokens,
//! - shorter signatures first,
//! - within one arity, signatures without a `Boolean` parameter first.
//!
//! The extra slot in `n + 1` is the implicit close-price input that a leading
//! `IndicatorHandle` receives when the first token is not a reference.

use std::cell::OnceCell;

use tracing::debug;

use crate::domain::catalog::{EnumKind, FactoryDescriptor, ParameterKind, Signature};
use crate::domain::error::{BindError, ConstructionFailure, IndicatorError};
use crate::domain::indicator::IndicatorRef;
use crate::domain::indicator::price;
use crate::domain::series::BarSeries;

/// Resolves a bare identifier argument to an indicator reading that column.
pub trait ColumnLookup {
    fn column_indicator(&self, column: &str) -> Result<IndicatorRef, BindError>;
}

/// Lookup for contexts that have no backing table.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoColumns;

impl ColumnLookup for NoColumns {
    fn column_indicator(&self, column: &str) -> Result<IndicatorRef, BindError> {
        Err(BindError::ColumnUnavailable {
            column: column.to_string(),
            reason: "no table is attached".into(),
        })
    }
}

/// A single coerced argument.
#[derive(Debug, Clone)]
pub enum Arg {
    Series(BarSeries),
    Indicator(IndicatorRef),
    Int(i64),
    Double(f64),
    Boolean(bool),
    Numeric(f64),
    Enum(&'static str),
}

/// Arguments bound to one signature, in parameter order.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    args: Vec<Arg>,
}

impl BoundArgs {
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn get(&self, index: usize, expected: &str) -> Result<&Arg, ConstructionFailure> {
        self.args.get(index).ok_or_else(|| {
            ConstructionFailure::new(format!("missing {expected} argument at {index}"))
        })
    }

    fn mismatch(index: usize, expected: &str) -> ConstructionFailure {
        ConstructionFailure::new(format!("argument {index} is not {expected}"))
    }

    pub fn series(&self, index: usize) -> Result<BarSeries, ConstructionFailure> {
        match self.get(index, "series")? {
            Arg::Series(s) => Ok(s.clone()),
            _ => Err(Self::mismatch(index, "a series")),
        }
    }

    pub fn indicator(&self, index: usize) -> Result<IndicatorRef, ConstructionFailure> {
        match self.get(index, "indicator")? {
            Arg::Indicator(i) => Ok(i.clone()),
            _ => Err(Self::mismatch(index, "an indicator")),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64, ConstructionFailure> {
        match self.get(index, "int")? {
            Arg::Int(v) => Ok(*v),
            _ => Err(Self::mismatch(index, "an int")),
        }
    }

    /// An `Int` argument that must be a positive bar count.
    pub fn period(&self, index: usize) -> Result<usize, ConstructionFailure> {
        let v = self.int(index)?;
        if v <= 0 {
            return Err(ConstructionFailure::new(format!(
                "bar count must be positive, got {v}"
            )));
        }
        usize::try_from(v).map_err(|e| ConstructionFailure::new(e.to_string()))
    }

    pub fn double(&self, index: usize) -> Result<f64, ConstructionFailure> {
        match self.get(index, "double")? {
            Arg::Double(v) => Ok(*v),
            _ => Err(Self::mismatch(index, "a double")),
        }
    }

    pub fn boolean(&self, index: usize) -> Result<bool, ConstructionFailure> {
        match self.get(index, "boolean")? {
            Arg::Boolean(v) => Ok(*v),
            _ => Err(Self::mismatch(index, "a boolean")),
        }
    }

    pub fn num(&self, index: usize) -> Result<f64, ConstructionFailure> {
        match self.get(index, "numeric")? {
            Arg::Numeric(v) => Ok(*v),
            _ => Err(Self::mismatch(index, "a numeric value")),
        }
    }

    pub fn enum_value(&self, index: usize) -> Result<&'static str, ConstructionFailure> {
        match self.get(index, "enum")? {
            Arg::Enum(v) => Ok(v),
            _ => Err(Self::mismatch(index, "an enum value")),
        }
    }
}

/// A successfully constructed indicator and the signature that produced it.
#[derive(Debug)]
pub struct Built<'c> {
    pub indicator: IndicatorRef,
    pub signature: &'c Signature,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// No candidate signature could be bound; carries the failure that got
    /// furthest.
    NoMatch(BindError),
    /// A signature bound but its factory rejected the values.
    Construction {
        signature: String,
        source: ConstructionFailure,
    },
}

impl BuildError {
    /// Attach the request context.
    pub fn into_indicator_error(self, name: &str, expression: &str) -> IndicatorError {
        match self {
            BuildError::NoMatch(cause) => IndicatorError::NoMatch {
                name: name.to_string(),
                expression: expression.to_string(),
                cause,
            },
            BuildError::Construction { signature, source } => IndicatorError::Construction {
                name: name.to_string(),
                signature,
                expression: expression.to_string(),
                source,
            },
        }
    }
}

/// Case-insensitive `true|yes|1` / `false|no|0`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn looks_like_reference(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

/// How far a failed binding got, for choosing the most specific failure.
struct BindFailure {
    bound: usize,
    error: BindError,
}

pub struct ConstructionEngine<'a> {
    series: BarSeries,
    columns: &'a dyn ColumnLookup,
    close_price: OnceCell<IndicatorRef>,
}

impl<'a> ConstructionEngine<'a> {
    pub fn new(series: BarSeries, columns: &'a dyn ColumnLookup) -> Self {
        Self {
            series,
            columns,
            close_price: OnceCell::new(),
        }
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    fn default_input(&self) -> IndicatorRef {
        self.close_price
            .get_or_init(|| price::close_price(self.series.clone()))
            .clone()
    }

    /// Candidates for `supplied` tokens, in trial order.
    pub fn candidates<'c>(
        descriptor: &'c FactoryDescriptor,
        supplied: usize,
    ) -> Vec<&'c Signature> {
        let mut candidates: Vec<&Signature> = descriptor
            .signatures
            .iter()
            .filter(|s| s.is_standard())
            .filter(|s| s.arity() >= supplied && s.arity() <= supplied + 1)
            .collect();
        candidates.sort_by_key(|s| (s.arity(), s.has_boolean()));
        candidates
    }

    pub fn build<'c>(
        &self,
        descriptor: &'c FactoryDescriptor,
        args: &[String],
    ) -> Result<Built<'c>, BuildError> {
        let candidates = Self::candidates(descriptor, args.len());
        if candidates.is_empty() {
            let mut arities: Vec<usize> = descriptor
                .signatures
                .iter()
                .filter(|s| s.is_standard())
                .map(Signature::arity)
                .collect();
            arities.sort_unstable();
            arities.dedup();
            return Err(BuildError::NoMatch(BindError::NoCandidateSignature {
                supplied: args.len(),
                arities,
            }));
        }

        let mut best: Option<BindFailure> = None;
        let mut construction: Option<BuildError> = None;

        for signature in candidates {
            debug!(
                indicator = %descriptor.canonical_name,
                signature = %signature,
                "trying signature"
            );
            match self.bind(signature, args) {
                Ok(bound) => match (signature.factory)(&bound) {
                    Ok(indicator) => {
                        debug!(
                            indicator = %descriptor.canonical_name,
                            signature = %signature,
                            "constructed"
                        );
                        return Ok(Built {
                            indicator,
                            signature,
                        });
                    }
                    Err(source) => {
                        debug!(signature = %signature, error = %source, "factory rejected arguments");
                        construction.get_or_insert(BuildError::Construction {
                            signature: signature.to_string(),
                            source,
                        });
                    }
                },
                Err(failure) => {
                    debug!(signature = %signature, error = %failure.error, "binding failed");
                    if best.as_ref().is_none_or(|b| failure.bound > b.bound) {
                        best = Some(failure);
                    }
                }
            }
        }

        if let Some(err) = construction {
            return Err(err);
        }
        match best {
            Some(failure) => Err(BuildError::NoMatch(failure.error)),
            None => Err(BuildError::NoMatch(BindError::NoCandidateSignature {
                supplied: args.len(),
                arities: Vec::new(),
            })),
        }
    }

    fn bind(&self, signature: &Signature, args: &[String]) -> Result<BoundArgs, BindFailure> {
        let mut bound = Vec::with_capacity(signature.arity());
        let mut tokens = args.iter().map(String::as_str).peekable();

        for (position, kind) in signature.params.iter().enumerate() {
            let fail = |error| BindFailure {
                bound: position,
                error,
            };
            let arg = match kind {
                ParameterKind::SequenceHandle => Arg::Series(self.series.clone()),
                ParameterKind::IndicatorHandle => match tokens.peek() {
                    Some(token) if looks_like_reference(token) => {
                        let column = tokens.next().unwrap_or_default();
                        Arg::Indicator(self.columns.column_indicator(column).map_err(fail)?)
                    }
                    _ if position == 0 => Arg::Indicator(self.default_input()),
                    _ => return Err(fail(BindError::AmbiguousImplicitArgument { position })),
                },
                scalar => {
                    let token = tokens.next().ok_or_else(|| {
                        fail(BindError::ArgumentUnderflow {
                            reason: format!("parameter {position} ({scalar}) has no value"),
                        })
                    })?;
                    coerce(*scalar, token).map_err(fail)?
                }
            };
            bound.push(arg);
        }

        let leftover = tokens.count();
        if leftover > 0 {
            return Err(BindFailure {
                bound: bound.len(),
                error: BindError::ArgumentUnderflow {
                    reason: format!("{leftover} argument(s) left unused by {signature}"),
                },
            });
        }
        if bound.len() != signature.arity() {
            return Err(BindFailure {
                bound: bound.len(),
                error: BindError::ArityMismatch {
                    expected: signature.arity(),
                    bound: bound.len(),
                },
            });
        }
        Ok(BoundArgs::new(bound))
    }
}

fn coerce(kind: ParameterKind, token: &str) -> Result<Arg, BindError> {
    let invalid = || BindError::InvalidArgument {
        value: token.to_string(),
        kind: kind.to_string(),
    };
    match kind {
        ParameterKind::Int => token.parse().map(Arg::Int).map_err(|_| invalid()),
        ParameterKind::Double => token.parse().map(Arg::Double).map_err(|_| invalid()),
        ParameterKind::NumericValue => token.parse().map(Arg::Numeric).map_err(|_| invalid()),
        ParameterKind::Boolean => parse_bool(token).map(Arg::Boolean).ok_or_else(invalid),
        ParameterKind::Enum(e) => coerce_enum(e, token),
        _ => Err(invalid()),
    }
}

fn coerce_enum(kind: EnumKind, token: &str) -> Result<Arg, BindError> {
    kind.lookup(token)
        .map(Arg::Enum)
        .ok_or_else(|| BindError::InvalidEnumValue {
            kind: kind.name.to_string(),
            value: token.to_string(),
            valid: kind.values.iter().map(|v| v.to_string()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Catalog;
    use crate::domain::indicator::constant::ConstantIndicator;
    use crate::domain::ohlcv::{OhlcvBar, RowId};
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::sync::Arc;

    fn series(n: usize) -> BarSeries {
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                OhlcvBar {
                    row_id: Some(RowId(i as i64 + 1)),
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                        + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0,
                }
            })
            .collect();
        BarSeries::new("test", bars)
    }

    /// Hands out constant indicators and records every lookup.
    struct RecordingColumns {
        series: BarSeries,
        seen: RefCell<Vec<String>>,
    }

    impl RecordingColumns {
        fn new(series: BarSeries) -> Self {
            Self {
                series,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ColumnLookup for RecordingColumns {
        fn column_indicator(&self, column: &str) -> Result<IndicatorRef, BindError> {
            self.seen.borrow_mut().push(column.to_string());
            Ok(Arc::new(ConstantIndicator::new(self.series.clone(), 1.0)))
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn build_sig(name: &str, tokens: &[&str]) -> Result<String, BuildError> {
        let catalog = Catalog::discover().unwrap();
        let s = series(40);
        let columns = RecordingColumns::new(s.clone());
        let engine = ConstructionEngine::new(s, &columns);
        let d = catalog.resolve(name).unwrap();
        engine
            .build(d, &args(tokens))
            .map(|b| b.signature.to_string())
    }

    mod selection {
        use super::*;

        #[test]
        fn sma_uses_implicit_close() {
            assert_eq!(build_sig("sma", &["20"]).unwrap(), "[Indicator, int]");
        }

        #[test]
        fn macd_defaults() {
            assert_eq!(build_sig("macd", &[]).unwrap(), "[Indicator]");
        }

        #[test]
        fn macd_with_column() {
            let catalog = Catalog::discover().unwrap();
            let s = series(40);
            let columns = RecordingColumns::new(s.clone());
            let engine = ConstructionEngine::new(s, &columns);
            let built = engine
                .build(catalog.resolve("macd").unwrap(), &args(&["close"]))
                .unwrap();
            assert_eq!(built.signature.to_string(), "[Indicator]");
            assert_eq!(*columns.seen.borrow(), vec!["close"]);
        }

        #[test]
        fn cross_binds_two_columns_without_default() {
            let catalog = Catalog::discover().unwrap();
            let s = series(10);
            let columns = RecordingColumns::new(s.clone());
            let engine = ConstructionEngine::new(s, &columns);
            engine
                .build(catalog.resolve("cross").unwrap(), &args(&["foo", "bar"]))
                .unwrap();
            assert_eq!(*columns.seen.borrow(), vec!["foo", "bar"]);
            assert!(engine.close_price.get().is_none());
        }

        #[test]
        fn covariance_with_two_columns() {
            assert_eq!(
                build_sig("covariance", &["col_a", "col_b", "12"]).unwrap(),
                "[Indicator, Indicator, int]"
            );
        }

        #[test]
        fn covariance_second_input_must_be_explicit() {
            let err = build_sig("covariance", &["col", "10"]).unwrap_err();
            assert_eq!(
                err,
                BuildError::NoMatch(BindError::AmbiguousImplicitArgument { position: 1 })
            );
        }

        #[test]
        fn fisher_boolean_overload() {
            assert_eq!(
                build_sig("fisher", &["10", "true"]).unwrap(),
                "[Indicator, int, boolean]"
            );
        }

        #[test]
        fn fisher_double_overload() {
            assert_eq!(
                build_sig("fisher", &["10", "12.3", "13.4"]).unwrap(),
                "[Indicator, int, double, double]"
            );
        }

        #[test]
        fn numeric_token_prefers_double_over_boolean() {
            assert_eq!(
                build_sig("fisher", &["10", "0.5", "1"]).unwrap(),
                "[Indicator, int, double, double]"
            );
        }

        #[test]
        fn boolean_word_falls_through_to_boolean_overload() {
            assert_eq!(
                build_sig("fisher", &["10", "0.5", "yes"]).unwrap(),
                "[Indicator, int, double, boolean]"
            );
        }

        #[test]
        fn pivot_point_enum_is_case_insensitive() {
            assert_eq!(
                build_sig("pivot_point", &["day"]).unwrap(),
                "[BarSeries, TimeLevel]"
            );
        }

        #[test]
        fn candidates_are_ordered() {
            let catalog = Catalog::discover().unwrap();
            let d = catalog.resolve("fisher").unwrap();
            let order: Vec<String> = ConstructionEngine::candidates(d, 3)
                .iter()
                .map(|s| s.to_string())
                .collect();
            assert_eq!(
                order,
                vec![
                    "[Indicator, int, boolean]",
                    "[Indicator, int, double, double]",
                    "[Indicator, int, double, boolean]",
                ]
            );
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn invalid_enum_lists_values() {
            let err = build_sig("pivot_point", &["FORTNIGHT"]).unwrap_err();
            match err {
                BuildError::NoMatch(BindError::InvalidEnumValue { valid, value, .. }) => {
                    assert_eq!(value, "FORTNIGHT");
                    assert!(valid.contains(&"DAY".to_string()));
                    assert!(valid.contains(&"BARBASED".to_string()));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn leftover_tokens_underflow() {
            let err = build_sig("on_balance_volume", &["1"]).unwrap_err();
            assert!(matches!(
                err,
                BuildError::NoMatch(BindError::ArgumentUnderflow { .. })
            ));
        }

        #[test]
        fn missing_scalar_underflows() {
            let err = build_sig("covariance", &["a", "b"]).unwrap_err();
            assert!(matches!(
                err,
                BuildError::NoMatch(BindError::ArgumentUnderflow { .. })
            ));
        }

        #[test]
        fn no_candidate_for_argument_count() {
            let err = build_sig("sma", &["1", "2", "3", "4"]).unwrap_err();
            assert_eq!(
                err,
                BuildError::NoMatch(BindError::NoCandidateSignature {
                    supplied: 4,
                    arities: vec![2],
                })
            );
        }

        #[test]
        fn unparseable_int() {
            let err = build_sig("sma", &["twenty"]).unwrap_err();
            // "twenty" reads as a column for slot 0, then the int slot is empty
            assert!(matches!(
                err,
                BuildError::NoMatch(BindError::ArgumentUnderflow { .. })
            ));
            let err = build_sig("sma", &["2x"]).unwrap_err();
            assert_eq!(
                err,
                BuildError::NoMatch(BindError::InvalidArgument {
                    value: "2x".into(),
                    kind: "int".into(),
                })
            );
        }

        #[test]
        fn factory_rejection_is_construction_error() {
            let err = build_sig("sma", &["0"]).unwrap_err();
            match err {
                BuildError::Construction { signature, source } => {
                    assert_eq!(signature, "[Indicator, int]");
                    assert!(source.reason.contains("positive"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn missing_column_surfaces_lookup_error() {
            let catalog = Catalog::discover().unwrap();
            let engine = ConstructionEngine::new(series(5), &NoColumns);
            let err = engine
                .build(catalog.resolve("sma").unwrap(), &args(&["nope", "3"]))
                .unwrap_err();
            assert!(matches!(
                err,
                BuildError::NoMatch(BindError::ColumnUnavailable { .. })
            ));
        }

        #[test]
        fn into_indicator_error_quotes_expression() {
            let err = BuildError::NoMatch(BindError::ArityMismatch {
                expected: 2,
                bound: 1,
            })
            .into_indicator_error("sma", "sma(x)");
            assert!(err.to_string().ends_with(" - 'sma(x)'"));
        }
    }

    mod coercion {
        use super::*;

        #[test]
        fn boolean_literals() {
            for t in ["true", "TRUE", "yes", "Yes", "1"] {
                assert_eq!(parse_bool(t), Some(true), "{t}");
            }
            for t in ["false", "No", "0"] {
                assert_eq!(parse_bool(t), Some(false), "{t}");
            }
            assert_eq!(parse_bool("0.5"), None);
            assert_eq!(parse_bool(""), None);
        }

        #[test]
        fn unsupported_kind_rejects_every_token() {
            let err = coerce(ParameterKind::Unsupported("Function"), "abs").unwrap_err();
            assert!(matches!(err, BindError::InvalidArgument { kind, .. } if kind == "Function"));
        }

        #[test]
        fn reference_detection() {
            assert!(looks_like_reference("close"));
            assert!(looks_like_reference("_tmp"));
            assert!(!looks_like_reference("12"));
            assert!(!looks_like_reference("-1"));
            assert!(!looks_like_reference(""));
        }

        #[test]
        fn bound_args_accessors() {
            let b = BoundArgs::new(vec![Arg::Int(5), Arg::Double(0.5), Arg::Enum("DAY")]);
            assert_eq!(b.int(0).unwrap(), 5);
            assert_eq!(b.period(0).unwrap(), 5);
            assert_eq!(b.double(1).unwrap(), 0.5);
            assert_eq!(b.enum_value(2).unwrap(), "DAY");
            assert!(b.boolean(0).is_err());
            assert!(b.int(7).is_err());
            let neg = BoundArgs::new(vec![Arg::Int(-3)]);
            assert!(neg.period(0).is_err());
        }
    }
}
