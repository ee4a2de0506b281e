//! Parameter coercion, both directions under one policy:
//! CLI strings become typed JSON values on the client side, and wire JSON
//! values are checked against a handler's declared signature on the server
//! side. Expected validation failures are tagged results, never panics, and
//! every position is checked before a verdict so a caller sees all failing
//! positions at once.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ArgumentError, InvalidArgument};
use crate::registry::{ParamDecl, ParamType};
use crate::request::{json_type_name, RequestParams};

/// Target type tag for one CLI/client argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    String,
    Bool,
    Int,
    Float,
    /// Parse the raw text as JSON; fall back to a string literal when the
    /// text is not valid JSON.
    Json,
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" | "string" => Ok(TargetType::String),
            "bool" | "boolean" => Ok(TargetType::Bool),
            "int" | "integer" => Ok(TargetType::Int),
            "float" | "double" => Ok(TargetType::Float),
            "json" => Ok(TargetType::Json),
            other => Err(format!("unknown type tag '{}'", other)),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetType::String => "str",
            TargetType::Bool => "bool",
            TargetType::Int => "int",
            TargetType::Float => "float",
            TargetType::Json => "json",
        };
        write!(f, "{}", name)
    }
}

/// A custom conversion override for one position; wins over the target-type
/// rule when present.
pub type Converter = fn(&str) -> Result<Value, String>;

/// Drives coercion of one untyped caller argument into the value the
/// request's `params` entry should hold.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub position: usize,
    pub target: TargetType,
    pub converter: Option<Converter>,
}

impl ParamSpec {
    pub fn new(position: usize, target: TargetType) -> Self {
        Self {
            position,
            target,
            converter: None,
        }
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }
}

/// Convert one raw string to the tagged target type.
///
/// Booleans accept case-insensitive `true`/`false` only. Integer and float
/// parses cover the full string; `"3.5"` never truncates to an integer.
pub fn coerce_value(target: TargetType, raw: &str) -> Result<Value, String> {
    match target {
        TargetType::String => Ok(Value::String(raw.to_string())),
        TargetType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err("expected true or false".to_string()),
        },
        TargetType::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "not an integer".to_string()),
        TargetType::Float => raw
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| "not a number".to_string()),
        TargetType::Json => Ok(serde_json::from_str(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()))),
    }
}

/// Coerce a full CLI argument list against the given specs. Positions with
/// no spec pass the raw string through as a JSON string literal:
/// under-specification favors the safer, more literal type.
///
/// All positions are checked; any failure aborts with every failing position
/// reported, and no request is built.
pub fn coerce_cli_args(specs: &[ParamSpec], raw_args: &[String]) -> Result<Vec<Value>, InvalidArgument> {
    let mut values = Vec::with_capacity(raw_args.len());
    let mut failures = Vec::new();

    for (position, raw) in raw_args.iter().enumerate() {
        let spec = specs.iter().find(|s| s.position == position);
        let outcome = match spec {
            Some(spec) => match spec.converter {
                Some(converter) => converter(raw),
                None => coerce_value(spec.target, raw),
            },
            None => Ok(Value::String(raw.clone())),
        };
        match outcome {
            Ok(value) => values.push(value),
            Err(reason) => failures.push(ArgumentError {
                position,
                raw: raw.clone(),
                reason,
            }),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(InvalidArgument { failures })
    }
}

/// Wire-side coercion failure: every failing position of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsError {
    pub failures: Vec<String>,
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.failures.join("; "))
    }
}

impl ParamsError {
    fn single(message: String) -> Self {
        Self {
            failures: vec![message],
        }
    }
}

/// Check a wire JSON parameter against a declared type. Exact matches pass;
/// an integer literal where a float is declared widens; narrowing and shape
/// mismatches fail.
fn check_type(declared: ParamType, value: &Value) -> Result<(), String> {
    let ok = match declared {
        ParamType::String => value.is_string(),
        ParamType::Bool => value.is_boolean(),
        ParamType::Int => value.as_i64().is_some() || value.as_u64().is_some(),
        ParamType::Float => value.is_number(),
        ParamType::Value => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "expected {}, got {}",
            declared,
            json_type_name(value)
        ))
    }
}

/// Adapt a request's `params` to a handler's declared positional signature.
///
/// Named params (V2) are mapped onto positions by declared parameter name.
/// Arity must match exactly, every position is validated before dispatch,
/// and a failure on any position aborts the call with all failing positions
/// reported.
pub fn coerce_params(
    decls: &[ParamDecl],
    params: Option<&RequestParams>,
) -> Result<Vec<Value>, ParamsError> {
    let supplied = params.map(RequestParams::len).unwrap_or(0);
    if supplied != decls.len() {
        return Err(ParamsError::single(format!(
            "expected {} parameter(s), got {}",
            decls.len(),
            supplied
        )));
    }

    let mut args = Vec::with_capacity(decls.len());
    let mut failures = Vec::new();

    for (position, decl) in decls.iter().enumerate() {
        let value = match params {
            Some(RequestParams::Array(values)) => Some(&values[position]),
            Some(RequestParams::Object(map)) => map.get(&decl.name),
            None => None,
        };
        match value {
            Some(value) => match check_type(decl.ty, value) {
                Ok(()) => args.push(value.clone()),
                Err(reason) => failures.push(format!(
                    "position {} ('{}'): {}",
                    position, decl.name, reason
                )),
            },
            None => failures.push(format!(
                "position {}: missing named parameter '{}'",
                position, decl.name
            )),
        }
    }

    if failures.is_empty() {
        Ok(args)
    } else {
        Err(ParamsError { failures })
    }
}
