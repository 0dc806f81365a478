use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::document::{Document, NodeId};

static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .ok()
});

static URL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:[^\s]+$").ok());

/// Native constraint a control can violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityKind {
    ValueMissing,
    TypeMismatch,
    PatternMismatch,
    TooShort,
    TooLong,
    RangeUnderflow,
    RangeOverflow,
    BadInput,
}

/// A failed constraint with the message shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidityReport {
    pub node: NodeId,
    pub kind: ValidityKind,
    pub message: String,
}

/// Controls barred from constraint validation never fail.
pub fn will_validate(doc: &Document, node: NodeId) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };
    if !element.is_control() || element.attrs.contains_key("disabled") {
        return false;
    }
    !(element.tag == "input"
        && matches!(
            element.input_type().as_str(),
            "hidden" | "submit" | "button" | "reset" | "image"
        ))
}

/// Checks the control against its declared constraints.
pub fn check_validity(doc: &Document, node: NodeId) -> Result<(), ValidityReport> {
    if !will_validate(doc, node) {
        return Ok(());
    }
    let Some(element) = doc.element(node) else {
        return Ok(());
    };
    let input_type = element.input_type();
    let fail = |kind: ValidityKind, message: String| {
        Err(ValidityReport {
            node,
            kind,
            message,
        })
    };

    if element.attrs.contains_key("required") && value_missing(doc, node) {
        let message = match input_type.as_str() {
            "checkbox" => "Please check this box if you want to proceed.",
            "radio" => "Please select one of these options.",
            _ if element.tag == "select" => "Please select an item in the list.",
            _ => "Please fill out this field.",
        };
        return fail(ValidityKind::ValueMissing, message.to_string());
    }

    if matches!(input_type.as_str(), "checkbox" | "radio") || element.tag == "select" {
        return Ok(());
    }

    let value = element.value.as_str();
    if value.is_empty() {
        return Ok(());
    }

    match input_type.as_str() {
        "email" if !matches_static(&EMAIL_RE, value) => {
            return fail(
                ValidityKind::TypeMismatch,
                "Please enter an email address.".into(),
            );
        }
        "url" if !matches_static(&URL_RE, value) => {
            return fail(ValidityKind::TypeMismatch, "Please enter a URL.".into());
        }
        _ => {}
    }

    let length = value.chars().count();
    if let Some(min_len) = parse_usize_attr(element.attrs.get("minlength"))
        && length < min_len
    {
        return fail(
            ValidityKind::TooShort,
            format!(
                "Please lengthen this text to {min_len} characters or more (you are currently using {length} characters)."
            ),
        );
    }
    if let Some(max_len) = parse_usize_attr(element.attrs.get("maxlength"))
        && length > max_len
    {
        return fail(
            ValidityKind::TooLong,
            format!("Please shorten this text to {max_len} characters or less."),
        );
    }

    if let Some(pattern) = element.attrs.get("pattern")
        && let Ok(regex) = Regex::new(&format!("^(?:{pattern})$"))
        && !regex.is_match(value)
    {
        let message = element
            .attrs
            .get("title")
            .map(|title| format!("Please match the requested format: {title}"))
            .unwrap_or_else(|| "Please match the requested format.".to_string());
        return fail(ValidityKind::PatternMismatch, message);
    }

    if matches!(input_type.as_str(), "number" | "range") {
        let Some(number) = value.trim().parse::<f64>().ok().filter(|n| n.is_finite()) else {
            return fail(ValidityKind::BadInput, "Please enter a number.".into());
        };
        if let Some(min) = parse_f64_attr(element.attrs.get("min"))
            && number < min
        {
            return fail(
                ValidityKind::RangeUnderflow,
                format!("Value must be greater than or equal to {min}."),
            );
        }
        if let Some(max) = parse_f64_attr(element.attrs.get("max"))
            && number > max
        {
            return fail(
                ValidityKind::RangeOverflow,
                format!("Value must be less than or equal to {max}."),
            );
        }
    }

    Ok(())
}

/// Checks the control and, on failure, surfaces the report and focuses it.
pub fn report_validity(doc: &mut Document, node: NodeId) -> Result<(), ValidityReport> {
    match check_validity(doc, node) {
        Ok(()) => Ok(()),
        Err(report) => {
            tracing::debug!(node = node.index(), kind = ?report.kind, "constraint violated");
            doc.focus(node);
            doc.record_report(report.clone());
            Err(report)
        }
    }
}

fn value_missing(doc: &Document, node: NodeId) -> bool {
    let Some(element) = doc.element(node) else {
        return true;
    };
    match element.input_type().as_str() {
        "checkbox" => !element.checked,
        "radio" => !doc
            .radio_group(node)
            .into_iter()
            .any(|member| doc.is_checked(member)),
        _ => element.value.is_empty(),
    }
}

fn matches_static(regex: &Lazy<Option<Regex>>, value: &str) -> bool {
    match &**regex {
        Some(regex) => regex.is_match(value),
        None => true,
    }
}

fn parse_usize_attr(raw: Option<&String>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse().ok())
}

fn parse_f64_attr(raw: Option<&String>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}
