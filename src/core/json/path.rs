// src/core/json/path.rs

//! Parses dotted path expressions such as `messages[role=user].content` or
//! `items[0].name` into navigation segments.

use crate::core::errors::HttpMuxError;
use serde_json::{Number, Value};
use std::fmt;

/// Absolute tolerance for numeric predicate matches.
pub const NUMBER_EPSILON: f64 = 1e-8;

/// A typed scalar: the value written by `set`, appended by `add_array_item`
/// and compared by predicate segments.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonScalar {
    String(String),
    Number(f64),
    Bool(bool),
}

impl JsonScalar {
    /// Interprets a bare token the way predicate values are typed: `true` /
    /// `false` (any case), then a plain decimal number, then a string.
    /// A token wrapped in double quotes is always a string, quotes removed.
    pub fn parse(token: &str) -> Self {
        if let Some(inner) = strip_quotes(token) {
            return JsonScalar::String(inner.to_string());
        }
        if token.eq_ignore_ascii_case("true") {
            return JsonScalar::Bool(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return JsonScalar::Bool(false);
        }
        if is_numeric(token)
            && let Ok(number) = token.parse::<f64>()
        {
            return JsonScalar::Number(number);
        }
        JsonScalar::String(token.to_string())
    }

    /// Converts into a JSON value. Whole numbers are stored as integers so
    /// they serialize without a trailing `.0`.
    pub fn to_value(&self) -> Result<Value, HttpMuxError> {
        Ok(match self {
            JsonScalar::String(s) => Value::String(s.clone()),
            JsonScalar::Bool(b) => Value::Bool(*b),
            JsonScalar::Number(n) => Value::Number(number_from_f64(*n)?),
        })
    }

    /// True if `value` is of the same JSON kind and equal (numbers within
    /// [`NUMBER_EPSILON`]).
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (JsonScalar::Bool(expected), Value::Bool(actual)) => expected == actual,
            (JsonScalar::Number(expected), Value::Number(actual)) => actual
                .as_f64()
                .is_some_and(|actual| (actual - expected).abs() <= NUMBER_EPSILON),
            (JsonScalar::String(expected), Value::String(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl From<&str> for JsonScalar {
    fn from(s: &str) -> Self {
        JsonScalar::String(s.to_string())
    }
}

impl From<String> for JsonScalar {
    fn from(s: String) -> Self {
        JsonScalar::String(s)
    }
}

impl From<f64> for JsonScalar {
    fn from(n: f64) -> Self {
        JsonScalar::Number(n)
    }
}

impl From<bool> for JsonScalar {
    fn from(b: bool) -> Self {
        JsonScalar::Bool(b)
    }
}

impl fmt::Display for JsonScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonScalar::String(s) => write!(f, "\"{s}\""),
            JsonScalar::Number(n) => write!(f, "{n}"),
            JsonScalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One navigation step.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// `name`: an object member.
    Field(String),
    /// `name[i]`: element `i` of the array member `name`.
    Index { name: String, index: usize },
    /// `name[field=value]`: the first element of the array member `name`
    /// that is an object whose `field` matches `value`.
    Predicate {
        name: String,
        field: String,
        value: JsonScalar,
    },
}

impl PathSegment {
    /// The object member this segment descends into.
    pub fn name(&self) -> &str {
        match self {
            PathSegment::Field(name)
            | PathSegment::Index { name, .. }
            | PathSegment::Predicate { name, .. } => name,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{name}"),
            PathSegment::Index { name, index } => write!(f, "{name}[{index}]"),
            PathSegment::Predicate { name, field, value } => {
                write!(f, "{name}[{field}={value}]")
            }
        }
    }
}

/// Parses a path string into segments.
///
/// Segments are separated by `.` outside of brackets and quotes, so predicate
/// values may contain dots (`items[price=1.5]`, `items[host="a.b"]`). Empty
/// segments are skipped; a path with no segments at all is an error.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, HttpMuxError> {
    let segments = split_segments(path)?
        .into_iter()
        .filter(|raw| !raw.is_empty())
        .map(parse_segment)
        .collect::<Result<Vec<_>, _>>()?;

    if segments.is_empty() {
        return Err(HttpMuxError::PathSyntax("empty path".to_string()));
    }
    Ok(segments)
}

fn split_segments(path: &str) -> Result<Vec<&str>, HttpMuxError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in path.char_indices() {
        match c {
            '"' if depth > 0 => in_quotes = !in_quotes,
            '[' if !in_quotes => depth += 1,
            ']' if !in_quotes => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    HttpMuxError::PathSyntax(format!("unbalanced ']' at {i} in '{path}'"))
                })?;
            }
            '.' if depth == 0 => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || in_quotes {
        return Err(HttpMuxError::PathSyntax(format!(
            "unterminated bracket in '{path}'"
        )));
    }
    parts.push(&path[start..]);
    Ok(parts)
}

fn parse_segment(raw: &str) -> Result<PathSegment, HttpMuxError> {
    let Some(open) = raw.find('[') else {
        return Ok(PathSegment::Field(raw.to_string()));
    };
    let Some(inner) = raw[open + 1..].strip_suffix(']') else {
        return Err(HttpMuxError::PathSyntax(format!(
            "segment '{raw}' must end with ']'"
        )));
    };
    let name = &raw[..open];
    if name.is_empty() {
        return Err(HttpMuxError::PathSyntax(format!(
            "segment '{raw}' has no array name"
        )));
    }

    if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
        let index = inner
            .parse::<usize>()
            .map_err(|_| HttpMuxError::PathSyntax(format!("index out of range in '{raw}'")))?;
        return Ok(PathSegment::Index {
            name: name.to_string(),
            index,
        });
    }

    let Some((field, value)) = inner.split_once('=') else {
        return Err(HttpMuxError::PathSyntax(format!(
            "segment '{raw}' needs an index or a field=value predicate"
        )));
    };
    let field = field.trim();
    if field.is_empty() {
        return Err(HttpMuxError::PathSyntax(format!(
            "predicate in '{raw}' has no field name"
        )));
    }
    Ok(PathSegment::Predicate {
        name: name.to_string(),
        field: field.to_string(),
        value: JsonScalar::parse(value.trim()),
    })
}

fn strip_quotes(token: &str) -> Option<&str> {
    token
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
}

/// Optional sign, digits, at most one decimal point, at least one digit.
fn is_numeric(token: &str) -> bool {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

fn number_from_f64(n: f64) -> Result<Number, HttpMuxError> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Number::from(n as i64));
    }
    Number::from_f64(n)
        .ok_or_else(|| HttpMuxError::InvalidRequest(format!("{n} is not a finite JSON number")))
}
