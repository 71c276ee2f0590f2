//! Domain error types.
//!
//! Every failure surfaced by the indicator pipeline carries the raw expression
//! text so callers can report it verbatim.

/// A parse error with position information for indicator expressions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message} - '{expression}'")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    pub expression: String,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = self.expression,
            caret = caret,
            err = self
        )
    }
}

/// Why a single signature could not be bound to the supplied argument text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    #[error("arg underflow: {reason}")]
    ArgumentUnderflow { reason: String },

    #[error("expected {expected} arguments, got {bound}")]
    ArityMismatch { expected: usize, bound: usize },

    #[error("{kind} arg must be one of: [{}], got '{value}'", .valid.join(", "))]
    InvalidEnumValue {
        kind: String,
        value: String,
        valid: Vec<String>,
    },

    #[error(
        "parameter {position}: when more than one indicator is required it must be explicit"
    )]
    AmbiguousImplicitArgument { position: usize },

    #[error("cannot read '{value}' as {kind}")]
    InvalidArgument { value: String, kind: String },

    #[error("no signature accepts {supplied} arguments (available arities: {arities:?})")]
    NoCandidateSignature { supplied: usize, arities: Vec<usize> },

    #[error("column '{column}' is not usable as an input: {reason}")]
    ColumnUnavailable { column: String, reason: String },
}

/// Failure while computing one indicator value at one position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("bar at position {position} has no row identity")]
    MissingIdentity { position: usize },

    #[error("position {position} out of range for series of {len} bars")]
    OutOfRange { position: usize, len: usize },

    #[error("storage read failed: {reason}")]
    Storage { reason: String },
}

/// Raised by an indicator factory when its inputs are unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("constructor failed: {reason}")]
pub struct ConstructionFailure {
    pub reason: String,
}

impl ConstructionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("invalid identifier '{name}'")]
    InvalidIdentifier { name: String },

    #[error("'{name}' is a base bar column and cannot hold indicator values")]
    ReservedColumn { name: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("canonical name '{name}' is claimed by both {first} and {second}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },
}

/// Failure of an `add_indicator` request.
#[derive(Debug, thiserror::Error)]
pub enum IndicatorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no such indicator '{name}' - '{expression}'")]
    NoSuchIndicator { name: String, expression: String },

    #[error("no matching signature for '{name}': {cause} - '{expression}'")]
    NoMatch {
        name: String,
        expression: String,
        cause: BindError,
    },

    #[error("{source} (signature {signature} of '{name}') - '{expression}'")]
    Construction {
        name: String,
        signature: String,
        expression: String,
        #[source]
        source: ConstructionFailure,
    },

    #[error("{source} - '{expression}'")]
    Storage {
        expression: String,
        #[source]
        source: StorageError,
    },
}

impl IndicatorError {
    /// The raw expression text the request was made with.
    pub fn expression(&self) -> &str {
        match self {
            IndicatorError::Parse(e) => &e.expression,
            IndicatorError::NoSuchIndicator { expression, .. }
            | IndicatorError::NoMatch { expression, .. }
            | IndicatorError::Construction { expression, .. }
            | IndicatorError::Storage { expression, .. } => expression,
        }
    }
}

/// Top-level error type for bartable.
#[derive(Debug, thiserror::Error)]
pub enum BartableError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid bar data in {file}: {reason}")]
    BarData { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BartableError> for std::process::ExitCode {
    fn from(err: &BartableError) -> Self {
        let code: u8 = match err {
            BartableError::Io(_) => 1,
            BartableError::ConfigParse { .. }
            | BartableError::ConfigMissing { .. }
            | BartableError::ConfigInvalid { .. } => 2,
            BartableError::Storage(_) => 3,
            BartableError::Indicator(IndicatorError::Storage { .. }) => 3,
            BartableError::Indicator(_) | BartableError::Catalog(_) => 4,
            BartableError::BarData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_renders_caret_under_position() {
        let err = ParseError {
            message: "expected '('".into(),
            position: 3,
            expression: "sma 20".into(),
        };
        let rendered = err.display_with_context();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "sma 20");
        assert_eq!(lines[1], "   ^");
        assert!(lines[2].ends_with("- 'sma 20'"));
    }

    #[test]
    fn enum_error_lists_valid_values() {
        let err = BindError::InvalidEnumValue {
            kind: "TimeLevel".into(),
            value: "FORTNIGHT".into(),
            valid: vec!["DAY".into(), "WEEK".into()],
        };
        assert_eq!(
            err.to_string(),
            "TimeLevel arg must be one of: [DAY, WEEK], got 'FORTNIGHT'"
        );
    }

    #[test]
    fn indicator_errors_quote_expression() {
        let err = IndicatorError::NoSuchIndicator {
            name: "nope".into(),
            expression: "nope(1)".into(),
        };
        assert!(err.to_string().ends_with(" - 'nope(1)'"));
        assert_eq!(err.expression(), "nope(1)");

        let err = IndicatorError::NoMatch {
            name: "sma".into(),
            expression: "sma()".into(),
            cause: BindError::ArgumentUnderflow {
                reason: "Int needs a value".into(),
            },
        };
        assert!(err.to_string().contains("arg underflow"));
        assert!(err.to_string().ends_with(" - 'sma()'"));
    }

    #[test]
    fn exit_codes_follow_error_class() {
        use std::process::ExitCode;
        // ExitCode has no PartialEq, compare the debug form instead
        fn same(a: ExitCode, b: ExitCode) -> bool {
            format!("{a:?}") == format!("{b:?}")
        }
        let io = BartableError::Io(std::io::Error::other("x"));
        assert!(same(ExitCode::from(&io), ExitCode::from(1)));
        let cfg = BartableError::ConfigMissing {
            section: "sqlite".into(),
            key: "path".into(),
        };
        assert!(same(ExitCode::from(&cfg), ExitCode::from(2)));
        let storage = BartableError::Storage(StorageError::Database { reason: "x".into() });
        assert!(same(ExitCode::from(&storage), ExitCode::from(3)));
        let ind = BartableError::Indicator(IndicatorError::NoSuchIndicator {
            name: "x".into(),
            expression: "x()".into(),
        });
        assert!(same(ExitCode::from(&ind), ExitCode::from(4)));
        let data = BartableError::BarData {
            file: "a.csv".into(),
            reason: "bad".into(),
        };
        assert!(same(ExitCode::from(&data), ExitCode::from(5)));
    }
}
