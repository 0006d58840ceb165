use crate::tools::base::{ParamType, ToolDefinition};
use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Why a parameter set was rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamErrors {
    /// Required parameters that were absent or empty.
    pub missing: Vec<String>,
    /// Human-readable problems, including one entry per missing parameter.
    pub problems: Vec<String>,
}

impl ParamErrors {
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Check `params` against the definition's schema and coerce every supplied
/// value to its declared type. Unknown parameters are dropped.
pub fn validate(definition: &ToolDefinition, params: &Value) -> Result<Map<String, Value>, ParamErrors> {
    let mut errors = ParamErrors::default();
    let supplied = match params {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            errors
                .problems
                .push(format!("parameters must be an object, got {}", json_type(other)));
            return Err(errors);
        }
    };

    for name in supplied.keys() {
        if !definition.parameters.contains_key(name) {
            debug!("dropping unknown parameter '{}' for tool '{}'", name, definition.name);
        }
    }

    let mut coerced = Map::new();
    for (name, spec) in &definition.parameters {
        match supplied.get(name).filter(|v| !is_blank(v)) {
            Some(value) => match coerce(spec.param_type, value) {
                Ok(v) => {
                    coerced.insert(name.clone(), v);
                }
                Err(problem) => errors.problems.push(format!("'{}' {}", name, problem)),
            },
            None if spec.required => {
                errors.missing.push(name.clone());
                errors
                    .problems
                    .push(format!("missing required parameter '{}'", name));
            }
            None => {}
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce one value to `ty`. The error is a short phrase completing
/// "'name' ...".
pub fn coerce(ty: ParamType, value: &Value) -> Result<Value, String> {
    let mismatch = || format!("must be {}, got {}", article(ty), json_type(value));
    match ty {
        ParamType::Any => Ok(value.clone()),
        ParamType::String => match value {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => parse_number(s)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ParamType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral))
                .map(Value::from)
                .ok_or_else(mismatch),
            Value::String(s) => parse_number(s)
                .and_then(integral)
                .map(Value::from)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => parse_bool(s).map(Value::Bool).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ParamType::Date => match value {
            Value::String(s) => {
                let ascii = ascii_digits(s.trim());
                NaiveDate::parse_from_str(&ascii, "%Y-%m-%d")
                    .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                    .map_err(|_| format!("must be a date (YYYY-MM-DD), got '{}'", s.trim()))
            }
            _ => Err(mismatch()),
        },
        ParamType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
            _ => Err(mismatch()),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
    }
}

fn article(ty: ParamType) -> String {
    match ty {
        ParamType::Integer | ParamType::Array | ParamType::Object | ParamType::Any => {
            format!("an {}", ty)
        }
        _ => format!("a {}", ty),
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = ascii_digits(s.trim())
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" | "نعم" | "اي" => Some(true),
        "false" | "no" | "n" | "0" | "off" | "لا" => Some(false),
        _ => None,
    }
}

/// Map Arabic-Indic and Extended Arabic-Indic digits to ASCII.
fn ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{066B}' => '.',
            '\u{066C}' => ',',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests;
