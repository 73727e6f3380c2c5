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

//! Keyword template engine.
//!
//! `{path}` is replaced by the value found at `path` in the entity data.
//! `{path|fn(args)|fn(args)}` pipes the value through transform functions.
//! A path starting with an entity domain (`sensor.other.state`) reads another entity.
//! Unresolvable expressions are left verbatim.

use serde_json::Value;
use thiserror::Error;

use crate::context::ResolveContext;
use crate::dates::parse_date;
use crate::number::{format_number, parse_number, to_fixed};
use crate::values::{get_value_from_path, value_to_string};

/// Domains whose entities can be referenced from a template
const ENTITY_DOMAINS: &[&str] = &[
    "sensor",
    "binary_sensor",
    "input_number",
    "input_boolean",
    "input_text",
    "number",
    "switch",
    "light",
    "device_tracker",
    "climate",
];

pub const RELATIVE_TIME_OPEN: &str = "<rt>";
pub const RELATIVE_TIME_CLOSE: &str = "</rt>";

/// Wrap a date string in the relative-time marker understood by the render layer
pub fn relative_time_marker(value: &str) -> String {
    format!("{RELATIVE_TIME_OPEN}{value}{RELATIVE_TIME_CLOSE}")
}

/// Content of a string that consists of exactly one relative-time marker
pub fn strip_relative_time_marker(text: &str) -> Option<&str> {
    text.strip_prefix(RELATIVE_TIME_OPEN)?
        .strip_suffix(RELATIVE_TIME_CLOSE)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Malformed function call '{0}', expected name(args)")]
    Malformed(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("'{name}' function requires {expected} parameter(s), got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("'{name}' function parameter '{arg}' is not a number")]
    InvalidNumber { name: &'static str, arg: String },
}

/// Template pipeline function with its parsed arguments
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineFunction {
    Round { decimals: u32 },
    Replace { from: String, to: String },
    Multiply(f64),
    Add(f64),
    GreaterThan { threshold: f64, result: String },
    LessThan { threshold: f64, result: String },
    Between { low: f64, high: f64, result: String },
    Thresholds(Vec<f64>),
    Abs,
    Equals { value: String, result: String },
    RelTime,
}

impl PipelineFunction {
    /// Parse a single `name(arg1,arg2)` segment
    pub fn parse(command: &str) -> Result<Self, PipelineError> {
        let command = command.trim();
        let (name, params) = command
            .strip_suffix(')')
            .and_then(|c| c.split_once('('))
            .filter(|(name, _)| !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase()))
            .ok_or_else(|| PipelineError::Malformed(command.to_owned()))?;

        let args: Vec<&str> = if params.is_empty() {
            Vec::new()
        } else {
            params.split(',').collect()
        };

        match name {
            "round" => {
                check_arity("round", &args, 0, Some(1))?;
                // invalid precision falls back to whole numbers
                let decimals = args.first().and_then(|a| a.trim().parse().ok()).unwrap_or(0);
                Ok(Self::Round { decimals })
            }
            "replace" => {
                check_arity("replace", &args, 2, Some(2))?;
                Ok(Self::Replace {
                    from: args[0].to_owned(),
                    to: args[1].to_owned(),
                })
            }
            "multiply" => {
                check_arity("multiply", &args, 1, Some(1))?;
                Ok(Self::Multiply(number_arg("multiply", args[0])?))
            }
            "add" => {
                check_arity("add", &args, 1, Some(1))?;
                Ok(Self::Add(number_arg("add", args[0])?))
            }
            "greaterthan" => {
                check_arity("greaterthan", &args, 2, Some(2))?;
                Ok(Self::GreaterThan {
                    threshold: number_arg("greaterthan", args[0])?,
                    result: args[1].to_owned(),
                })
            }
            "lessthan" => {
                check_arity("lessthan", &args, 2, Some(2))?;
                Ok(Self::LessThan {
                    threshold: number_arg("lessthan", args[0])?,
                    result: args[1].to_owned(),
                })
            }
            "between" => {
                check_arity("between", &args, 3, Some(3))?;
                Ok(Self::Between {
                    low: number_arg("between", args[0])?,
                    high: number_arg("between", args[1])?,
                    result: args[2].to_owned(),
                })
            }
            "thresholds" => {
                check_arity("thresholds", &args, 1, None)?;
                let thresholds = args
                    .iter()
                    .map(|arg| number_arg("thresholds", arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Thresholds(thresholds))
            }
            "abs" => {
                check_arity("abs", &args, 0, Some(0))?;
                Ok(Self::Abs)
            }
            "equals" => {
                check_arity("equals", &args, 2, Some(2))?;
                Ok(Self::Equals {
                    value: args[0].to_owned(),
                    result: args[1].to_owned(),
                })
            }
            "reltime" => {
                check_arity("reltime", &args, 0, Some(0))?;
                Ok(Self::RelTime)
            }
            other => Err(PipelineError::UnknownFunction(other.to_owned())),
        }
    }

    /// Apply the function; non-numeric input to numeric functions passes through unchanged
    pub fn apply(&self, value: String) -> String {
        let number = parse_number(&value);
        match (self, number) {
            (Self::Round { decimals }, Some(n)) => to_fixed(n, *decimals),
            (Self::Replace { from, to }, _) => value.replacen(from.as_str(), to, 1),
            (Self::Multiply(factor), Some(n)) => format_number(n * factor),
            (Self::Add(addend), Some(n)) => format_number(n + addend),
            (Self::GreaterThan { threshold, result }, Some(n)) if n > *threshold => result.clone(),
            (Self::LessThan { threshold, result }, Some(n)) if n < *threshold => result.clone(),
            (Self::Between { low, high, result }, Some(n)) if *low <= n && n < *high => {
                result.clone()
            }
            (Self::Thresholds(thresholds), Some(n)) => {
                match thresholds.iter().position(|t| n < *t) {
                    Some(idx) => {
                        let step = 100.0 / thresholds.len() as f64;
                        format_number((step * idx as f64).round())
                    }
                    None => "100".to_owned(),
                }
            }
            (Self::Abs, Some(n)) => format_number(n.abs()),
            (Self::Equals { value: expected, result }, _) => {
                let numeric_match = matches!(
                    (number, parse_number(expected)),
                    (Some(a), Some(b)) if a == b
                );
                if numeric_match || value == *expected {
                    result.clone()
                } else {
                    value
                }
            }
            (Self::RelTime, _) if parse_date(&value).is_some() => relative_time_marker(&value),
            _ => value,
        }
    }
}

fn check_arity(
    name: &'static str,
    args: &[&str],
    min: usize,
    max: Option<usize>,
) -> Result<(), PipelineError> {
    let expected = match (min, max) {
        (0, Some(0)) => "no",
        (0, Some(1)) => "at most one",
        (1, Some(1)) => "one",
        (2, Some(2)) => "two",
        (3, Some(3)) => "three",
        _ => "at least one",
    };
    if args.len() < min || max.is_some_and(|max| args.len() > max) {
        return Err(PipelineError::Arity {
            name,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn number_arg(name: &'static str, arg: &str) -> Result<f64, PipelineError> {
    parse_number(arg).ok_or_else(|| PipelineError::InvalidNumber {
        name,
        arg: arg.to_owned(),
    })
}

/// Resolves `{...}` keywords against one entity's data
#[derive(Debug)]
pub struct KeywordProcessor<'a> {
    data: &'a Value,
    ctx: ResolveContext<'a>,
}

impl<'a> KeywordProcessor<'a> {
    pub fn new(data: &'a Value, ctx: &ResolveContext<'a>) -> Self {
        Self { data, ctx: *ctx }
    }

    /// Replace every resolvable keyword in `text`
    pub fn process(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find(['{', '}']) else {
                break;
            };

            if end > 0 && after[end..].starts_with('}') {
                let keyword = &after[..end];
                output.push_str(&rest[..start]);
                match self.replace_keyword(keyword) {
                    Some(value) => output.push_str(&value),
                    None => {
                        output.push('{');
                        output.push_str(keyword);
                        output.push('}');
                    }
                }
                rest = &after[end + 1..];
            } else {
                // empty braces or a nested opening brace, keep scanning from there
                output.push_str(&rest[..=start + end]);
                rest = &after[end..];
            }
        }

        output.push_str(rest);
        output
    }

    fn replace_keyword(&self, keyword: &str) -> Option<String> {
        let mut segments = keyword.split('|');
        let source = segments.next()?.trim();
        let value = self.resolve_data_source(source)?;

        Some(segments.fold(value, |value, command| {
            match PipelineFunction::parse(command) {
                Ok(function) => function.apply(value),
                Err(e) => {
                    self.ctx
                        .diagnostics
                        .warn(&format!("[TEMPLATE] {e} in '{{{keyword}}}'"));
                    value
                }
            }
        }))
    }

    fn resolve_data_source(&self, source: &str) -> Option<String> {
        let chunks: Vec<&str> = source.split('.').collect();

        if chunks.len() >= 2
            && ENTITY_DOMAINS.contains(&chunks[0])
            && let Some(host) = self.ctx.host
        {
            let entity_id = format!("{}.{}", chunks[0], chunks[1]);
            if let Some(other) = host.state(&entity_id) {
                let data = other.to_entity_data();
                return get_value_from_path(&data, &chunks[2..].join("."))
                    .filter(|v| !v.is_null())
                    .map(value_to_string);
            }
            self.ctx.diagnostics.debug(&format!(
                "[TEMPLATE] Entity '{entity_id}' not found, resolving '{source}' against current entity"
            ));
        }

        get_value_from_path(self.data, source)
            .filter(|v| !v.is_null())
            .map(value_to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::host::StateTable;
    use fluxion_card_types::EntitySnapshot;
    use serde_json::json;

    fn process(text: &str, data: &Value) -> String {
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(None, &sink);
        KeywordProcessor::new(data, &ctx).process(text)
    }

    fn apply(command: &str, value: &str) -> String {
        PipelineFunction::parse(command).unwrap().apply(value.to_owned())
    }

    #[test]
    fn test_plain_keywords() {
        let data = json!({ "state": "45", "attributes": { "friendly_name": "Door", "voltage": 2.9 } });
        assert_eq!(
            process("{attributes.friendly_name}: {state}% ({attributes.voltage}V)", &data),
            "Door: 45% (2.9V)"
        );
        assert_eq!(process("no keywords", &data), "no keywords");
    }

    #[test]
    fn test_undefined_source_is_left_verbatim() {
        let data = json!({ "state": "45" });
        assert_eq!(process("{attributes.missing}", &data), "{attributes.missing}");
        assert_eq!(
            process("Level {nothing|round(2)} of {state}", &data),
            "Level {nothing|round(2)} of 45"
        );
    }

    #[test]
    fn test_braces_edge_cases() {
        let data = json!({ "state": "1" });
        assert_eq!(process("{}", &data), "{}");
        assert_eq!(process("{{state}}", &data), "{1}");
        assert_eq!(process("open { only", &data), "open { only");
    }

    #[test]
    fn test_objects_are_serialized() {
        let data = json!({ "attributes": { "battery": { "level": 5 } } });
        assert_eq!(process("{attributes.battery}", &data), r#"{"level":5}"#);
    }

    #[test]
    fn test_pipeline_chain() {
        let data = json!({ "state": "0.456" });
        assert_eq!(process("{state|multiply(100)|round(1)}", &data), "45.6");
        let data = json!({ "state": "0,25" });
        assert_eq!(process("{state|add(1)|multiply(2)}", &data), "2.5");
    }

    #[test]
    fn test_functions() {
        assert_eq!(apply("round()", "3.6"), "4");
        assert_eq!(apply("round(2)", "3,14159"), "3.14");
        assert_eq!(apply("replace(_, )", "kitchen_door"), "kitchen door");
        assert_eq!(apply("greaterthan(50,high)", "60"), "high");
        assert_eq!(apply("greaterthan(50,high)", "40"), "40");
        assert_eq!(apply("lessthan(20,low)", "10"), "low");
        assert_eq!(apply("between(20,50,mid)", "20"), "mid");
        assert_eq!(apply("between(20,50,mid)", "50"), "50");
        assert_eq!(apply("abs()", "-7.5"), "7.5");
        assert_eq!(apply("equals(on,Charging)", "on"), "Charging");
        assert_eq!(apply("equals(1,yes)", "1.0"), "yes");
        assert_eq!(apply("equals(on,Charging)", "off"), "off");
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(apply("thresholds(10,20,30,40)", "5"), "0");
        assert_eq!(apply("thresholds(10,20,30,40)", "25"), "50");
        assert_eq!(apply("thresholds(10,20,30,40)", "35"), "75");
        assert_eq!(apply("thresholds(10,20,30,40)", "45"), "100");
    }

    #[test]
    fn test_reltime() {
        assert_eq!(
            apply("reltime()", "2025-03-01T10:00:00+00:00"),
            "<rt>2025-03-01T10:00:00+00:00</rt>"
        );
        assert_eq!(apply("reltime()", "yesterday"), "yesterday");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            PipelineFunction::parse("shout()"),
            Err(PipelineError::UnknownFunction(_))
        ));
        assert!(matches!(
            PipelineFunction::parse("replace(a)"),
            Err(PipelineError::Arity { name: "replace", .. })
        ));
        assert!(matches!(
            PipelineFunction::parse("multiply(x)"),
            Err(PipelineError::InvalidNumber { .. })
        ));
        assert!(matches!(
            PipelineFunction::parse("round"),
            Err(PipelineError::Malformed(_))
        ));
    }

    #[test]
    fn test_bad_function_leaves_value_and_logs() {
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(None, &sink);
        let data = json!({ "state": "12" });

        let result = KeywordProcessor::new(&data, &ctx).process("{state|shout()|add(1)}");
        assert_eq!(result, "13");
        assert!(sink.contains("Unknown function 'shout'"));
    }

    #[test]
    fn test_other_entity_lookup() {
        let host = StateTable::from_states([
            EntitySnapshot::new("sensor.outside_temperature", "-3.5")
                .with_attribute("unit_of_measurement", "°C"),
        ]);
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(Some(&host), &sink);
        let data = json!({ "state": "80" });
        let processor = KeywordProcessor::new(&data, &ctx);

        assert_eq!(
            processor.process(
                "{state}% at {sensor.outside_temperature.state|abs()}{sensor.outside_temperature.attributes.unit_of_measurement}"
            ),
            "80% at 3.5°C"
        );
        assert_eq!(
            processor.process("{sensor.missing.state}"),
            "{sensor.missing.state}"
        );
    }
}
