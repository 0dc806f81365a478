use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::document::{Document, NodeId};

static CONDITION_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_]+)\s*(===|!==|==|!=|<=|>=|<|>)\s*'([^']*)'\s*$").ok()
});

/// Comparison operator of a step condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    #[serde(rename = "==")]
    LooseEq,
    #[serde(rename = "!=")]
    LooseNe,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!==")]
    StrictNe,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::LooseEq => "==",
            Operator::LooseNe => "!=",
            Operator::StrictEq => "===",
            Operator::StrictNe => "!==",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "==" => Operator::LooseEq,
            "!=" => Operator::LooseNe,
            "===" => Operator::StrictEq,
            "!==" => Operator::StrictNe,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            _ => return None,
        })
    }
}

/// `field <op> 'literal'`, the only shape a step condition can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConditionExpression {
    pub field: String,
    pub operator: Operator,
    pub literal: String,
}

/// Marker error for condition strings outside the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed condition expression")]
pub struct MalformedCondition;

impl FromStr for ConditionExpression {
    type Err = MalformedCondition;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let regex = CONDITION_RE.as_ref().ok_or(MalformedCondition)?;
        let captures = regex.captures(raw).ok_or(MalformedCondition)?;
        let operator = Operator::from_token(&captures[2]).ok_or(MalformedCondition)?;
        Ok(Self {
            field: captures[1].to_string(),
            operator,
            literal: captures[3].to_string(),
        })
    }
}

impl fmt::Display for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}'",
            self.field,
            self.operator.as_str(),
            self.literal
        )
    }
}

/// Resolved value of a named field group at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue(String);

impl FieldValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Loose equality. Both operands are strings, so no coercion applies yet.
    pub fn loosely_equals(&self, literal: &str) -> bool {
        self.0 == literal
    }

    /// Strict equality: identical type and contents.
    pub fn strictly_equals(&self, literal: &str) -> bool {
        self.0.as_str() == literal
    }

    pub fn as_number(&self) -> Option<f64> {
        parse_numeric_prefix(&self.0)
    }
}

/// Anything able to resolve a field name to its current value.
pub trait FieldSource {
    /// `None` when no control carries the name.
    fn resolve(&self, name: &str) -> Option<FieldValue>;
}

impl FieldSource for HashMap<String, String> {
    fn resolve(&self, name: &str) -> Option<FieldValue> {
        self.get(name).map(FieldValue::new)
    }
}

/// Field lookup scoped to a subtree of a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct ScopedFields<'a> {
    doc: &'a Document,
    scope: NodeId,
}

impl<'a> ScopedFields<'a> {
    pub fn new(doc: &'a Document, scope: NodeId) -> Self {
        Self { doc, scope }
    }
}

impl FieldSource for ScopedFields<'_> {
    fn resolve(&self, name: &str) -> Option<FieldValue> {
        let controls = self.doc.controls_named(self.scope, name);
        match controls.as_slice() {
            [] => None,
            [single] => {
                let element = self.doc.element(*single)?;
                if element.input_type() == "checkbox" {
                    let value = if element.checked {
                        element.value.clone()
                    } else {
                        String::new()
                    };
                    Some(FieldValue(value))
                } else {
                    Some(FieldValue(element.value.clone()))
                }
            }
            group => {
                let checked = group
                    .iter()
                    .find(|id| self.doc.is_checked(**id))
                    .map(|id| self.doc.value(*id).to_string())
                    .unwrap_or_default();
                Some(FieldValue(checked))
            }
        }
    }
}

impl ConditionExpression {
    pub fn evaluate<S: FieldSource + ?Sized>(&self, fields: &S) -> bool {
        let Some(value) = fields.resolve(&self.field) else {
            return false;
        };
        match self.operator {
            Operator::LooseEq => value.loosely_equals(&self.literal),
            Operator::LooseNe => !value.loosely_equals(&self.literal),
            Operator::StrictEq => value.strictly_equals(&self.literal),
            Operator::StrictNe => !value.strictly_equals(&self.literal),
            Operator::Lt => self.compare_numeric(&value, |l, r| l < r),
            Operator::Lte => self.compare_numeric(&value, |l, r| l <= r),
            Operator::Gt => self.compare_numeric(&value, |l, r| l > r),
            Operator::Gte => self.compare_numeric(&value, |l, r| l >= r),
        }
    }

    fn compare_numeric<F>(&self, value: &FieldValue, predicate: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (value.as_number(), parse_numeric_prefix(&self.literal)) {
            (Some(left), Some(right)) => predicate(left, right),
            _ => false,
        }
    }
}

/// Parses and evaluates `raw`; anything unparsable is `false`.
pub fn evaluate<S: FieldSource + ?Sized>(raw: &str, fields: &S) -> bool {
    raw.parse::<ConditionExpression>()
        .map(|expression| expression.evaluate(fields))
        .unwrap_or(false)
}

/// Parse-once cache keyed by the raw condition string.
#[derive(Debug, Default, Clone)]
pub struct ConditionCache {
    parsed: HashMap<String, Option<ConditionExpression>>,
}

impl ConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, raw: &str) -> Option<&ConditionExpression> {
        if !self.parsed.contains_key(raw) {
            let parsed = raw.parse::<ConditionExpression>().ok();
            if parsed.is_none() {
                tracing::warn!(condition = raw, "unparsable step condition, step stays hidden");
            }
            self.parsed.insert(raw.to_string(), parsed);
        }
        self.parsed.get(raw).and_then(Option::as_ref)
    }

    pub fn evaluate<S: FieldSource + ?Sized>(&mut self, raw: &str, fields: &S) -> bool {
        self.get(raw)
            .is_some_and(|expression| expression.evaluate(fields))
    }
}

/// Longest leading decimal literal of `raw`, ignoring leading whitespace.
/// Returns `None` when there is no numeric prefix or it is not finite.
pub fn parse_numeric_prefix(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    trimmed[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_prefix_follows_leading_digits() {
        assert_eq!(parse_numeric_prefix("12abc"), Some(12.0));
        assert_eq!(parse_numeric_prefix("  -3.5e2x"), Some(-350.0));
        assert_eq!(parse_numeric_prefix(".5"), Some(0.5));
        assert_eq!(parse_numeric_prefix("7."), Some(7.0));
        assert_eq!(parse_numeric_prefix("1e"), Some(1.0));
        assert_eq!(parse_numeric_prefix("abc"), None);
        assert_eq!(parse_numeric_prefix("-"), None);
        assert_eq!(parse_numeric_prefix(""), None);
        assert_eq!(parse_numeric_prefix("1e999"), None);
    }

    #[test]
    fn strict_operators_are_not_shadowed_by_loose_ones() {
        let parsed: ConditionExpression = "plan === '5'".parse().unwrap();
        assert_eq!(parsed.operator, Operator::StrictEq);
        let parsed: ConditionExpression = "plan!=='5'".parse().unwrap();
        assert_eq!(parsed.operator, Operator::StrictNe);
        assert_eq!(parsed.to_string(), "plan !== '5'");
    }
}
