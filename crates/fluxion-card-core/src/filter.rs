// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use fluxion_card_types::FilterSpec;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use crate::diagnostics::DiagnosticSink;
use crate::number::value_as_number;
use crate::pattern::{parse_regex_literal, wildcard_regex};
use crate::values::{get_value_from_path, value_to_string};

/// Comparison performed by a filter condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOperator {
    Exists,
    NotExists,
    Equals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    Matches,
    /// Kept so the condition can report itself; always evaluates to false
    Unknown(String),
}

impl FilterOperator {
    pub fn parse(operator: &str) -> Self {
        match operator {
            "exists" => Self::Exists,
            "not_exists" => Self::NotExists,
            "=" => Self::Equals,
            ">" => Self::GreaterThan,
            "<" => Self::LessThan,
            ">=" => Self::GreaterOrEqual,
            "<=" => Self::LessOrEqual,
            "contains" => Self::Contains,
            "matches" => Self::Matches,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Operator used when none is configured
    fn implied_by(value: Option<&Value>) -> Self {
        match value {
            None => Self::Exists,
            Some(Value::String(s)) if s.contains('*') || parse_regex_literal(s).is_some() => {
                Self::Matches
            }
            Some(_) => Self::Equals,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
            Self::Equals => "=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Contains => "contains",
            Self::Matches => "matches",
            Self::Unknown(name) => name,
        })
    }
}

/// Precompiled `matches` operand
#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(Regex),
    Exact(String),
    /// Pattern failed to compile; never matches
    Invalid,
}

impl Matcher {
    fn compile(value: Option<&Value>, sink: &dyn DiagnosticSink) -> Self {
        let Some(value) = value else {
            return Self::Invalid;
        };
        let text = value_to_string(value);

        let compiled = match parse_regex_literal(&text) {
            Some(literal) => literal.map(|l| l.regex),
            None if text.contains('*') => wildcard_regex(&text),
            None => return Self::Exact(text),
        };

        compiled.map_or_else(
            |e| {
                sink.error(&format!("[FILTER] Invalid pattern '{text}': {e}"));
                Self::Invalid
            },
            Self::Regex,
        )
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(text),
            Self::Exact(expected) => text == expected,
            Self::Invalid => false,
        }
    }
}

/// Compiled filter with the subject it was declared on
///
/// Permanence is decided by the top-level `name` alone. Nested conditions on `state`
/// inside a filter declared on another subject do not make it re-evaluable.
#[derive(Debug, Clone)]
pub struct Filter {
    subject: Option<String>,
    root: FilterNode,
}

impl Filter {
    pub fn compile(spec: &FilterSpec, sink: &dyn DiagnosticSink) -> Self {
        Self {
            subject: spec.name.clone(),
            root: FilterNode::compile(spec, sink),
        }
    }

    /// Top-level `name` of the filter, if any
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn root(&self) -> &FilterNode {
        &self.root
    }

    /// Filters not declared on `state` only need to run once; their verdict never changes
    ///
    /// Classification is by subject name only, so a time-varying attribute is still permanent.
    pub fn is_permanent(&self) -> bool {
        self.subject() != Some("state")
    }

    /// Evaluate against entity data; `state` overrides `data.state` when given
    pub fn is_valid(&self, data: &Value, state: Option<&str>, sink: &dyn DiagnosticSink) -> bool {
        self.root.is_valid(data, state, sink)
    }
}

/// Node of a compiled filter tree
#[derive(Debug, Clone)]
pub enum FilterNode {
    Condition {
        name: String,
        operator: FilterOperator,
        value: Option<Value>,
        matcher: Option<Matcher>,
    },
    All(Vec<FilterNode>),
    Any(Vec<FilterNode>),
    Not(Box<FilterNode>),
}

impl FilterNode {
    fn compile(spec: &FilterSpec, sink: &dyn DiagnosticSink) -> Self {
        let mut parts = Vec::new();

        if let Some(name) = &spec.name {
            let operator = spec.operator.as_deref().map_or_else(
                || FilterOperator::implied_by(spec.value.as_ref()),
                FilterOperator::parse,
            );
            let matcher = (operator == FilterOperator::Matches)
                .then(|| Matcher::compile(spec.value.as_ref(), sink));
            parts.push(Self::Condition {
                name: name.clone(),
                operator,
                value: spec.value.clone(),
                matcher,
            });
        }
        if !spec.and.is_empty() {
            parts.push(Self::All(
                spec.and.iter().map(|s| Self::compile(s, sink)).collect(),
            ));
        }
        if !spec.or.is_empty() {
            parts.push(Self::Any(
                spec.or.iter().map(|s| Self::compile(s, sink)).collect(),
            ));
        }
        if let Some(not) = &spec.not {
            parts.push(Self::Not(Box::new(Self::compile(not, sink))));
        }

        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Self::All(parts)
        }
    }

    pub fn is_valid(&self, data: &Value, state: Option<&str>, sink: &dyn DiagnosticSink) -> bool {
        match self {
            Self::Condition {
                name,
                operator,
                value,
                matcher,
            } => {
                let override_value;
                let subject = match state {
                    Some(state) if name == "state" => {
                        override_value = Value::from(state);
                        Some(&override_value)
                    }
                    _ => get_value_from_path(data, name),
                };
                evaluate(operator, subject, value.as_ref(), matcher.as_ref(), sink)
            }
            Self::All(nodes) => nodes.iter().all(|n| n.is_valid(data, state, sink)),
            Self::Any(nodes) => nodes.iter().any(|n| n.is_valid(data, state, sink)),
            Self::Not(inner) => !inner.is_valid(data, state, sink),
        }
    }
}

fn evaluate(
    operator: &FilterOperator,
    subject: Option<&Value>,
    expected: Option<&Value>,
    matcher: Option<&Matcher>,
    sink: &dyn DiagnosticSink,
) -> bool {
    match operator {
        FilterOperator::Exists => subject.is_some(),
        FilterOperator::NotExists => subject.is_none(),
        FilterOperator::Contains => {
            let (Some(subject), Some(expected)) = (subject, expected) else {
                return false;
            };
            let needle = value_to_string(expected);
            match subject {
                Value::Array(items) => items
                    .iter()
                    .any(|item| value_to_string(item).contains(&needle)),
                other => value_to_string(other).contains(&needle),
            }
        }
        FilterOperator::Matches => match (subject, matcher) {
            (Some(subject), Some(matcher)) => matcher.is_match(&value_to_string(subject)),
            _ => false,
        },
        FilterOperator::Equals => {
            let (Some(subject), Some(expected)) = (subject, expected) else {
                return false;
            };
            match (value_as_number(subject), value_as_number(expected)) {
                (Some(a), Some(b)) => a == b,
                _ => subject == expected,
            }
        }
        FilterOperator::GreaterThan
        | FilterOperator::LessThan
        | FilterOperator::GreaterOrEqual
        | FilterOperator::LessOrEqual => {
            let (Some(a), Some(b)) = (
                subject.and_then(value_as_number),
                expected.and_then(value_as_number),
            ) else {
                return false;
            };
            match operator {
                FilterOperator::GreaterThan => a > b,
                FilterOperator::LessThan => a < b,
                FilterOperator::GreaterOrEqual => a >= b,
                _ => a <= b,
            }
        }
        FilterOperator::Unknown(name) => {
            sink.warn(&format!("[FILTER] Unknown operator '{name}'"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use serde_json::json;

    fn entity() -> Value {
        json!({
            "entity_id": "sensor.bedroom_motion_battery_level",
            "state": "45,5",
            "attributes": {
                "device_class": "battery",
                "labels": ["garden", "outdoor"],
                "battery": { "type": "CR2032" },
                "empty": null
            },
            "device": { "manufacturer": { "name": "IKEA" } }
        })
    }

    fn check(spec: FilterSpec) -> bool {
        let sink = MemorySink::new();
        Filter::compile(&spec, &sink).is_valid(&entity(), None, &sink)
    }

    #[test]
    fn test_wildcard_match() {
        let filter = FilterSpec::new("entity_id").value("*_battery_level");
        assert!(check(filter));

        let data = json!({ "entity_id": "bedroom_motion" });
        let sink = MemorySink::new();
        let compiled = Filter::compile(&FilterSpec::new("entity_id").value("*_battery_level"), &sink);
        assert!(!compiled.is_valid(&data, None, &sink));
    }

    #[test]
    fn test_regex_and_exact_match() {
        assert!(check(FilterSpec::new("entity_id").value("/BEDROOM/i")));
        assert!(!check(FilterSpec::new("entity_id").value("/kitchen/")));
        assert!(check(
            FilterSpec::new("attributes.device_class")
                .operator("matches")
                .value("battery")
        ));
    }

    #[test]
    fn test_existence() {
        assert!(check(FilterSpec::new("attributes.device_class")));
        assert!(check(FilterSpec::new("attributes.empty").operator("exists")));
        assert!(check(FilterSpec::new("attributes.nope").operator("not_exists")));
        assert!(!check(FilterSpec::new("attributes.nope")));
    }

    #[test]
    fn test_numeric_comparisons_accept_comma() {
        assert!(check(FilterSpec::new("state").operator(">").value(45)));
        assert!(check(FilterSpec::new("state").operator("<=").value("45.5")));
        assert!(check(FilterSpec::new("state").operator("=").value(45.5)));
        assert!(!check(FilterSpec::new("attributes.device_class").operator(">").value(1)));
    }

    #[test]
    fn test_strict_equality_for_non_numeric() {
        assert!(check(FilterSpec::new("attributes.device_class").value("battery")));
        assert!(!check(FilterSpec::new("attributes.device_class").value("Battery")));
    }

    #[test]
    fn test_contains() {
        assert!(check(FilterSpec::new("attributes.labels").operator("contains").value("out")));
        assert!(check(FilterSpec::new("entity_id").operator("contains").value("motion")));
        assert!(!check(FilterSpec::new("attributes.labels").operator("contains").value("indoor")));
    }

    #[test]
    fn test_nested_property_path() {
        assert!(check(FilterSpec::new("device.manufacturer.name").value("IKEA")));
        assert!(check(FilterSpec::new("attributes.battery.type").value("CR2032")));
    }

    #[test]
    fn test_state_override() {
        let sink = MemorySink::new();
        let filter = Filter::compile(&FilterSpec::new("state").operator("<").value(20), &sink);
        assert!(!filter.is_valid(&entity(), None, &sink));
        assert!(filter.is_valid(&entity(), Some("10"), &sink));
    }

    #[test]
    fn test_composites() {
        let spec = FilterSpec {
            and: vec![
                FilterSpec::new("attributes.device_class").value("battery"),
                FilterSpec {
                    or: vec![
                        FilterSpec::new("state").operator("<").value(10),
                        FilterSpec::new("attributes.labels").operator("contains").value("garden"),
                    ],
                    ..FilterSpec::default()
                },
            ],
            ..FilterSpec::default()
        };
        assert!(check(spec));

        let negated = FilterSpec {
            not: Some(Box::new(FilterSpec::new("attributes.device_class").value("battery"))),
            ..FilterSpec::default()
        };
        assert!(!check(negated));
    }

    #[test]
    fn test_unknown_operator_is_false_and_logged() {
        let sink = MemorySink::new();
        let filter = Filter::compile(&FilterSpec::new("state").operator("~=").value(1), &sink);
        assert!(!filter.is_valid(&entity(), None, &sink));
        assert!(sink.contains("Unknown operator '~='"));
    }

    #[test]
    fn test_permanence() {
        let sink = MemorySink::new();
        assert!(!Filter::compile(&FilterSpec::new("state").value(1), &sink).is_permanent());
        assert!(Filter::compile(&FilterSpec::new("entity_id").value("x"), &sink).is_permanent());

        let mut state_with_nested = FilterSpec::new("state").operator("<").value(10);
        state_with_nested.or = vec![FilterSpec::new("entity_id").value("x")];
        assert!(!Filter::compile(&state_with_nested, &sink).is_permanent());
    }

    #[test]
    fn test_nested_state_conditions_do_not_affect_permanence() {
        // only the top-level subject is looked at, a nested state condition is still permanent
        let sink = MemorySink::new();
        let mut named = FilterSpec::new("entity_id").value("sensor.*");
        named.and = vec![FilterSpec::new("state").operator("<").value(10)];
        let filter = Filter::compile(&named, &sink);
        assert_eq!(filter.subject(), Some("entity_id"));
        assert!(filter.is_permanent());

        let data = json!({ "entity_id": "sensor.remote", "state": "5" });
        assert!(filter.is_valid(&data, None, &sink));
        assert!(!filter.is_valid(&data, Some("50"), &sink));

        let nameless = FilterSpec {
            and: vec![FilterSpec::new("state").operator("<").value(10)],
            ..FilterSpec::default()
        };
        let filter = Filter::compile(&nameless, &sink);
        assert_eq!(filter.subject(), None);
        assert!(filter.is_permanent());

        let mixed = FilterSpec {
            or: vec![FilterSpec::new("state").value(1), FilterSpec::new("entity_id").value("x")],
            ..FilterSpec::default()
        };
        assert!(Filter::compile(&mixed, &sink).is_permanent());
    }

    #[test]
    fn test_attribute_filters_count_as_permanent() {
        // attribute values may change over time but are still classified as permanent
        let sink = MemorySink::new();
        let filter = Filter::compile(
            &FilterSpec::new("attributes.battery_level").operator("<").value(10),
            &sink,
        );
        assert!(filter.is_permanent());
    }
}
