//! Safe evaluation of tool argument text.
//!
//! Accepts a small literal-only grammar: quoted strings, integers, floats,
//! `True`/`False`/`None`, tuples, lists and dicts. Nothing is ever
//! executed. Unquoted text that is not a keyword or number is taken as a
//! plain string, so `remember(color, blue)` yields `["color", "blue"]`.

use std::fmt;

/// One parsed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted or bare text.
    Str(String),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// `True` or `False`.
    Bool(bool),
    /// `None`.
    None,
    /// `[a, b]`.
    List(Vec<Literal>),
    /// `(a, b)`.
    Tuple(Vec<Literal>),
    /// `{k: v}`, in source order.
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Borrow the text of a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value of an int, or of a string holding only digits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric value of an int, float or numeric string.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Str(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }
}

impl Literal {
    /// Convert to JSON. Dict keys use their display form.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Int(n) => Value::from(*n),
            Self::Float(x) => serde_json::Number::from_f64(*x).map_or(Value::Null, Value::Number),
            Self::Bool(b) => Value::Bool(*b),
            Self::None => Value::Null,
            Self::List(items) | Self::Tuple(items) => {
                Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Dict(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Literal {
    /// Strings print raw; everything else prints in source form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::None => f.write_str("None"),
            Self::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Self::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_repr(f, k)?;
                    f.write_str(": ")?;
                    write_repr(f, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Literal]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_repr(f, item)?;
    }
    Ok(())
}

fn write_repr(f: &mut fmt::Formatter<'_>, value: &Literal) -> fmt::Result {
    match value {
        Literal::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        other => write!(f, "{other}"),
    }
}

/// Why argument text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    /// A quoted string has no closing quote.
    #[error("unterminated string literal at column {0}")]
    UnterminatedString(usize),
    /// A bracket was opened and never closed.
    #[error("'{0}' was never closed")]
    Unclosed(char),
    /// A character that cannot appear here.
    #[error("invalid syntax near '{0}' at column {1}")]
    Unexpected(char, usize),
    /// Two separators with nothing between them, or a missing value.
    #[error("invalid syntax: expected a value at column {0}")]
    ExpectedValue(usize),
    /// A malformed escape sequence.
    #[error("invalid escape sequence at column {0}")]
    BadEscape(usize),
    /// Brackets nested deeper than [`MAX_NESTING`].
    #[error("brackets nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Deepest bracket nesting `parse_args` accepts.
pub const MAX_NESTING: usize = 64;

/// Parse the text between a tool's parentheses into an argument list.
///
/// Empty text gives no arguments. A single value without a trailing comma
/// gives a one-element list. A single tuple or list keeps its items, as a
/// tuple literal would.
///
/// # Errors
///
/// Returns a [`LiteralError`] describing the first syntax problem.
pub fn parse_args(text: &str) -> Result<Vec<Literal>, LiteralError> {
    let mut parser = Parser::new(text);
    parser.skip_ws();
    if parser.at_end() {
        return Ok(Vec::new());
    }
    let (items, trailing_comma) = parser.sequence(None)?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(LiteralError::Unexpected(c, parser.column()));
    }
    match (items.len(), trailing_comma) {
        (1, false) => match items.into_iter().next() {
            Some(Literal::Tuple(inner) | Literal::List(inner)) => Ok(inner),
            Some(other) => Ok(vec![other]),
            None => Ok(Vec::new()),
        },
        _ => Ok(items),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn column(&self) -> usize {
        self.pos + 1
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Comma-separated values up to `close` (or end of input when `None`).
    /// Returns the values and whether a trailing comma was present.
    fn sequence(&mut self, close: Option<char>) -> Result<(Vec<Literal>, bool), LiteralError> {
        let mut items = Vec::new();
        let mut trailing = false;
        loop {
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(c) if Some(c) == close => break,
                Some(',') => return Err(LiteralError::ExpectedValue(self.column())),
                Some(_) => {}
            }
            items.push(self.value(close)?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    trailing = true;
                }
                None => {
                    trailing = false;
                    break;
                }
                Some(c) if Some(c) == close => {
                    trailing = false;
                    break;
                }
                Some(c) => return Err(LiteralError::Unexpected(c, self.column())),
            }
        }
        Ok((items, trailing))
    }

    fn value(&mut self, close: Option<char>) -> Result<Literal, LiteralError> {
        self.skip_ws();
        if !matches!(self.peek(), Some('[' | '(' | '{')) {
            return self.item(close);
        }
        if self.depth >= MAX_NESTING {
            return Err(LiteralError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let nested = self.item(close);
        self.depth -= 1;
        nested
    }

    fn item(&mut self, close: Option<char>) -> Result<Literal, LiteralError> {
        match self.peek() {
            None => Err(LiteralError::ExpectedValue(self.column())),
            Some('"' | '\'') => self.string(),
            Some('[') => {
                self.bump();
                let (items, _) = self.sequence(Some(']'))?;
                self.expect_close(']', '[')?;
                Ok(Literal::List(items))
            }
            Some('(') => {
                self.bump();
                let (items, trailing) = self.sequence(Some(')'))?;
                self.expect_close(')', '(')?;
                // `(x)` is just `x`; `(x,)` and `()` are tuples.
                if items.len() == 1 && !trailing {
                    Ok(items.into_iter().next().unwrap_or(Literal::None))
                } else {
                    Ok(Literal::Tuple(items))
                }
            }
            Some('{') => self.dict(),
            Some(c @ (']' | ')' | '}' | ':')) => Err(LiteralError::Unexpected(c, self.column())),
            Some(_) => self.bare(close),
        }
    }

    fn expect_close(&mut self, close: char, open: char) -> Result<(), LiteralError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == close => Ok(()),
            _ => Err(LiteralError::Unclosed(open)),
        }
    }

    fn dict(&mut self) -> Result<Literal, LiteralError> {
        self.bump();
        let mut pairs = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(LiteralError::Unclosed('{')),
                Some('}') => {
                    self.bump();
                    return Ok(Literal::Dict(pairs));
                }
                Some(_) => {}
            }
            let key = self.value(Some(':'))?;
            self.skip_ws();
            match self.bump() {
                Some(':') => {}
                Some(c) => return Err(LiteralError::Unexpected(c, self.pos)),
                None => return Err(LiteralError::Unclosed('{')),
            }
            let value = self.value(Some('}'))?;
            pairs.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                Some(c) => return Err(LiteralError::Unexpected(c, self.column())),
                None => return Err(LiteralError::Unclosed('{')),
            }
        }
    }

    fn string(&mut self) -> Result<Literal, LiteralError> {
        let start = self.column();
        let Some(quote) = self.bump() else {
            return Err(LiteralError::ExpectedValue(start));
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(LiteralError::UnterminatedString(start)),
                Some(c) if c == quote => return Ok(Literal::Str(out)),
                Some('\\') => {
                    let at = self.column();
                    match self.bump() {
                        None => return Err(LiteralError::UnterminatedString(start)),
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('0') => out.push('\0'),
                        Some('\\') => out.push('\\'),
                        Some('\'') => out.push('\''),
                        Some('"') => out.push('"'),
                        Some('x') => out.push(self.hex_escape(2, at)?),
                        Some('u') => out.push(self.hex_escape(4, at)?),
                        // Unknown escapes keep the backslash.
                        Some(other) => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize, at: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or(LiteralError::BadEscape(at))?;
            code = code * 16 + d;
        }
        char::from_u32(code).ok_or(LiteralError::BadEscape(at))
    }

    /// Unquoted text up to the next top-level separator.
    fn bare(&mut self, close: Option<char>) -> Result<Literal, LiteralError> {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c == ',' || Some(c) == close || (close == Some(':') && c == ':') {
                break;
            }
            if matches!(c, '"' | '\'' | '[' | ']' | '(' | ')' | '{' | '}') {
                return Err(LiteralError::Unexpected(c, self.column()));
            }
            raw.push(c);
            self.bump();
        }
        let token = raw.trim();
        if token.is_empty() {
            return Err(LiteralError::ExpectedValue(self.column()));
        }
        Ok(classify(token))
    }
}

fn classify(token: &str) -> Literal {
    match token {
        "True" => return Literal::Bool(true),
        "False" => return Literal::Bool(false),
        "None" => return Literal::None,
        _ => {}
    }
    let digits = token.replace('_', "");
    if let Ok(n) = digits.parse::<i64>() {
        return Literal::Int(n);
    }
    let looks_numeric = digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && digits.chars().any(|c| c.is_ascii_digit());
    if looks_numeric && let Ok(x) = digits.parse::<f64>() {
        return Literal::Float(x);
    }
    Literal::Str(token.to_owned())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn strs(values: &[Literal]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_gives_no_args() {
        assert!(parse_args("").unwrap().is_empty());
        assert!(parse_args("   ").unwrap().is_empty());
    }

    #[test]
    fn quoted_strings() {
        let args = parse_args(r#""nombre", 'Ana María'"#).unwrap();
        assert_eq!(strs(&args), vec!["nombre", "Ana María"]);
    }

    #[test]
    fn bare_words_are_strings() {
        let args = parse_args("color, blue").unwrap();
        assert_eq!(args, vec![Literal::Str("color".into()), Literal::Str("blue".into())]);
    }

    #[test]
    fn single_value_is_one_element_list() {
        assert_eq!(parse_args("time").unwrap(), vec![Literal::Str("time".into())]);
        assert_eq!(parse_args("'a, b'").unwrap(), vec![Literal::Str("a, b".into())]);
    }

    #[test]
    fn numbers_and_keywords() {
        let args = parse_args("3, -2.5, True, None, 1e3").unwrap();
        assert_eq!(
            args,
            vec![
                Literal::Int(3),
                Literal::Float(-2.5),
                Literal::Bool(true),
                Literal::None,
                Literal::Float(1000.0)
            ]
        );
    }

    #[test]
    fn single_tuple_unpacks_like_a_tuple_literal() {
        let args = parse_args("(1, 2)").unwrap();
        assert_eq!(args, vec![Literal::Int(1), Literal::Int(2)]);
    }

    #[test]
    fn trailing_comma_keeps_container_whole() {
        let args = parse_args("[1, 2],").unwrap();
        assert_eq!(args, vec![Literal::List(vec![Literal::Int(1), Literal::Int(2)])]);
    }

    #[test]
    fn dict_argument() {
        let args = parse_args(r#"'wf', {"a": 1, "b": [True]}"#).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].to_string(), "{'a': 1, 'b': [True]}");
    }

    #[test]
    fn escapes() {
        let args = parse_args(r#""línea\nnueva \"x\" é \d""#).unwrap();
        assert_eq!(args[0].as_str(), Some("línea\nnueva \"x\" é \\d"));
    }

    #[test]
    fn unterminated_string_is_error() {
        assert_eq!(
            parse_args(r#""abc, x"#).unwrap_err(),
            LiteralError::UnterminatedString(1)
        );
    }

    #[test]
    fn unclosed_bracket_is_error() {
        assert_eq!(parse_args("[1, 2").unwrap_err(), LiteralError::Unclosed('['));
    }

    #[test]
    fn stray_quote_in_bare_word_is_error() {
        assert!(matches!(
            parse_args("ab\"c"),
            Err(LiteralError::Unexpected('"', 3))
        ));
    }

    #[test]
    fn double_comma_is_error() {
        assert!(matches!(parse_args("a,,b"), Err(LiteralError::ExpectedValue(_))));
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let deep = "[".repeat(200_000);
        assert_eq!(parse_args(&deep), Err(LiteralError::TooDeep(MAX_NESTING)));
        let mixed = "({[".repeat(50_000);
        assert_eq!(parse_args(&mixed), Err(LiteralError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn nesting_at_the_limit_parses() {
        let text = format!("{}{}", "[".repeat(MAX_NESTING), "]".repeat(MAX_NESTING));
        assert!(parse_args(&text).is_ok());
        let over = format!("{}{}", "[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1));
        assert!(parse_args(&over).is_err());
    }

    #[test]
    fn conversions() {
        assert_eq!(Literal::Str(" 42 ".into()).as_int(), Some(42));
        assert_eq!(Literal::Str("1500,50".into()).as_float(), Some(1500.5));
        assert_eq!(Literal::Int(2).as_float(), Some(2.0));
        assert_eq!(Literal::Bool(true).as_int(), None);
    }

    #[test]
    fn json_conversion() {
        let args = parse_args(r#"{"a": [1, 2.5, None], 'b': True}"#).unwrap();
        assert_eq!(
            args[0].to_json(),
            serde_json::json!({"a": [1, 2.5, null], "b": true})
        );
    }

    #[test]
    fn display_matches_source_form() {
        assert_eq!(Literal::Float(2.0).to_string(), "2.0");
        assert_eq!(Literal::Tuple(vec![Literal::Int(1)]).to_string(), "(1,)");
        assert_eq!(
            Literal::List(vec![Literal::Str("it's".into())]).to_string(),
            r"['it\'s']"
        );
    }
}
