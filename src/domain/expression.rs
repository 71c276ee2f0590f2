//! Indicator expression parser.
//!
//! Grammar:
//!
//! ```text
//! function_name "(" [ arg { "," arg } ] ")" [ "as" alias ]
//! ```
//!
//! The argument list runs to the last `)` in the input and is split on commas
//! only; there is no nesting, quoting or escaping. Each argument is trimmed,
//! empty arguments are kept, and a blank list yields no arguments.

use crate::domain::error::ParseError;

/// One parsed indicator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub function_name: String,
    pub args: Vec<String>,
    pub alias: Option<String>,
    /// The text exactly as supplied, for diagnostics.
    pub raw_text: String,
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position,
            expression: self.input.to_string(),
        }
    }

    fn parse_name(&mut self) -> Result<&'a str, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            let found = self
                .peek()
                .map(|c| format!("'{c}'"))
                .unwrap_or_else(|| "end of input".to_string());
            return Err(self.error(format!("expected indicator name, found {found}"), start));
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_args(&mut self, name: &str) -> Result<Vec<String>, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
            }
            Some(ch) => {
                return Err(self.error(
                    format!("expected '(' after '{name}', found '{ch}'"),
                    self.pos,
                ));
            }
            None => {
                return Err(self.error(
                    format!("expected '(' after '{name}', found end of input"),
                    self.pos,
                ));
            }
        }

        let open = self.pos;
        let close = match self.remaining().rfind(')') {
            Some(offset) => open + offset,
            None => return Err(self.error("missing closing ')'", self.input.len())),
        };
        let body = &self.input[open..close];
        self.pos = close + 1;

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(body.split(',').map(|arg| arg.trim().to_string()).collect())
    }

    fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        let start = self.pos;
        let rest = self.remaining();
        let parts: Vec<&str> = rest.split_whitespace().collect();
        self.pos = self.input.len();
        match parts.as_slice() {
            [] => Ok(None),
            [keyword, alias] if keyword.eq_ignore_ascii_case("as") && is_identifier(alias) => {
                Ok(Some(alias.to_string()))
            }
            _ => {
                let offset = rest.len() - rest.trim_start().len();
                Err(self.error(
                    format!("invalid 'as' clause: '{}'", rest.trim()),
                    start + offset,
                ))
            }
        }
    }
}

/// Parse `text` into an [`Expression`].
///
/// Leading and trailing whitespace is ignored. Fails when the text is not of
/// the form `name(args)` optionally followed by `as alias`.
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(text);
    let name = parser.parse_name()?;
    let args = parser.parse_args(name)?;
    let alias = parser.parse_alias()?;
    Ok(Expression {
        function_name: name.to_string(),
        args,
        alias,
        raw_text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_padded_call_with_alias() {
        let e = parse(" sma(  12 ) as foo  ").unwrap();
        assert_eq!(e.function_name, "sma");
        assert_eq!(e.args, vec!["12"]);
        assert_eq!(e.alias.as_deref(), Some("foo"));
        assert_eq!(e.raw_text, " sma(  12 ) as foo  ");
    }

    #[test]
    fn empty_parens_yield_no_args() {
        assert!(parse("macd()").unwrap().args.is_empty());
        assert!(parse("macd(   )").unwrap().args.is_empty());
    }

    #[test]
    fn empty_args_are_kept() {
        let e = parse("f(1,)").unwrap();
        assert_eq!(e.args, vec!["1", ""]);
        let e = parse("f(,,)").unwrap();
        assert_eq!(e.args, vec!["", "", ""]);
    }

    #[test]
    fn multiple_args_are_trimmed() {
        let e = parse("covariance( col_a ,col_b,  12)").unwrap();
        assert_eq!(e.args, vec!["col_a", "col_b", "12"]);
        assert_eq!(e.alias, None);
    }

    #[test]
    fn whitespace_between_name_and_paren() {
        let e = parse("sma  (20)").unwrap();
        assert_eq!(e.function_name, "sma");
        assert_eq!(e.args, vec!["20"]);
    }

    #[test]
    fn as_keyword_is_case_insensitive() {
        assert_eq!(parse("sma(5) AS x").unwrap().alias.as_deref(), Some("x"));
        assert_eq!(parse("sma(5) As _x1").unwrap().alias.as_deref(), Some("_x1"));
    }

    #[test]
    fn args_run_to_last_paren() {
        let e = parse("f(a(b), c)").unwrap();
        assert_eq!(e.args, vec!["a(b", "c"]);
    }

    #[test]
    fn rejects_bad_alias_clause() {
        for text in ["sma(5) foo", "sma(5) as", "sma(5) as x y", "sma(5) as 9x", "sma(5) with x"] {
            let err = parse(text).unwrap_err();
            assert!(
                err.message.starts_with("invalid 'as' clause"),
                "{text}: {}",
                err.message
            );
            assert_eq!(err.expression, text);
        }
    }

    #[test]
    fn alias_error_quotes_fragment() {
        let err = parse("sma(5)  to x").unwrap_err();
        assert_eq!(err.message, "invalid 'as' clause: 'to x'");
        assert_eq!(err.position, 8);
    }

    #[test]
    fn rejects_missing_parens() {
        let err = parse("sma 20").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(err.message.contains("expected '('"));

        let err = parse("sma(20").unwrap_err();
        assert!(err.message.contains("missing closing ')'"));
    }

    #[test]
    fn rejects_missing_name() {
        assert!(parse("(20)").is_err());
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn rejects_non_word_name_characters() {
        assert!(parse("s-ma(20)").is_err());
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("sma_20"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("20sma"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }

    proptest! {
        #[test]
        fn name_is_text_before_first_paren(
            name in "[A-Za-z_][A-Za-z0-9_]{0,12}",
            args in proptest::collection::vec("[0-9a-z_. ]{0,6}", 0..5),
            lead in "[ \t]{0,3}",
            trail in "[ \t]{0,3}",
        ) {
            let text = format!("{lead}{name}({}){trail}", args.join(","));
            let parsed = parse(&text).unwrap();
            let before_paren = text.split('(').next().unwrap().trim();
            prop_assert_eq!(&parsed.function_name, before_paren);
            prop_assert!(parsed.alias.is_none());
        }

        #[test]
        fn parse_never_panics(text in ".{0,40}") {
            let _ = parse(&text);
        }
    }
}
