//! Shape check - JSON 値が descriptor に合っているかの検証
//!
//! 未知のフィールドは無視し、省略可能なフィールドは欠けていてもよい。
//! 検証に通らない body から envelope を作ることはありません。

use serde_json::Value;
use thiserror::Error;

use crate::typed::descriptor::{FieldDescriptor, RawType, Scalar, TypeDescriptor};

static ANY: TypeDescriptor = TypeDescriptor::ANY;

/// A value that does not match its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at {path}: expected {expected}, found {found}")]
pub struct ShapeError {
    /// JSON path of the offending value, e.g. `$.param.items[0].qty`.
    pub path: String,
    pub expected: String,
    pub found: &'static str,
}

#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body does not match the declared shape: {0}")]
    Shape(#[from] ShapeError),

    /// The body passed the shape check but not the runner's own types.
    #[error("payload does not convert to the requested type: {0}")]
    Convert(serde_json::Error),
}

/// Parse `body` and check it against `descriptor`.
pub fn decode_value(body: &[u8], descriptor: &TypeDescriptor) -> Result<Value, DecodeFailure> {
    let value: Value = serde_json::from_slice(body)?;
    check(&value, descriptor, "$")?;
    Ok(value)
}

pub fn check(value: &Value, descriptor: &TypeDescriptor, path: &str) -> Result<(), ShapeError> {
    match descriptor {
        TypeDescriptor::Scalar(scalar) => check_scalar(value, *scalar, path),
        TypeDescriptor::Record { name, fields } => check_record(value, name, fields, path),
        TypeDescriptor::Parametric { raw, args } => {
            let arg = |i: usize| args.get(i).unwrap_or(&ANY);
            match raw {
                RawType::Option => {
                    if value.is_null() {
                        Ok(())
                    } else {
                        check(value, arg(0), path)
                    }
                }
                RawType::List => {
                    let items = value
                        .as_array()
                        .ok_or_else(|| mismatch(path, descriptor, value))?;
                    for (i, item) in items.iter().enumerate() {
                        check(item, arg(0), &format!("{path}[{i}]"))?;
                    }
                    Ok(())
                }
                RawType::Map => {
                    let entries = value
                        .as_object()
                        .ok_or_else(|| mismatch(path, descriptor, value))?;
                    let key_range = match arg(0) {
                        TypeDescriptor::Scalar(scalar) => scalar
                            .integer_range()
                            .map(|range| (scalar.name(), range)),
                        _ => None,
                    };
                    for (key, entry) in entries {
                        let entry_path = format!("{path}.{key}");
                        if let Some((name, range)) = key_range {
                            let found = match key.parse::<i128>() {
                                Ok(n) if in_range(n, range) => None,
                                Ok(_) => Some("out-of-range key"),
                                Err(_) => Some("text key"),
                            };
                            if let Some(found) = found {
                                return Err(ShapeError {
                                    path: entry_path,
                                    expected: format!("{name} key"),
                                    found,
                                });
                            }
                        }
                        check(entry, arg(1), &entry_path)?;
                    }
                    Ok(())
                }
                RawType::Envelope => check_envelope(value, arg(0), arg(1), path, descriptor),
                RawType::Record { name, fields } => check_record(value, name, fields, path),
            }
        }
    }
}

fn check_scalar(value: &Value, scalar: Scalar, path: &str) -> Result<(), ShapeError> {
    let mut found = kind(value);
    let ok = match scalar {
        Scalar::Any => true,
        Scalar::Unit => value.is_null(),
        Scalar::Bool => value.is_boolean(),
        Scalar::Integer { .. } => match (integer(value), scalar.integer_range()) {
            (Some(n), Some(range)) if in_range(n, range) => true,
            (Some(_), _) => {
                found = "out-of-range integer";
                false
            }
            (None, _) => false,
        },
        Scalar::Float => value.is_number(),
        Scalar::Char => match value.as_str() {
            Some(text) if text.chars().count() == 1 => true,
            Some(_) => {
                found = "string of other length";
                false
            }
            None => false,
        },
        Scalar::Text => value.is_string(),
    };
    if ok {
        Ok(())
    } else {
        Err(ShapeError {
            path: path.to_string(),
            expected: scalar.name().to_string(),
            found,
        })
    }
}

fn integer(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

fn in_range(n: i128, (min, max): (i128, i128)) -> bool {
    (min..=max).contains(&n)
}

fn check_record(
    value: &Value,
    name: &str,
    fields: &[FieldDescriptor],
    path: &str,
) -> Result<(), ShapeError> {
    let object = value.as_object().ok_or_else(|| ShapeError {
        path: path.to_string(),
        expected: name.to_string(),
        found: kind(value),
    })?;
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        match object.get(&*field.name) {
            Some(v) => check(v, &field.ty, &field_path)?,
            None if field.may_be_absent() => {}
            None => {
                return Err(ShapeError {
                    path: field_path,
                    expected: field.ty.to_string(),
                    found: "nothing",
                });
            }
        }
    }
    Ok(())
}

fn check_envelope(
    value: &Value,
    param: &TypeDescriptor,
    result: &TypeDescriptor,
    path: &str,
    descriptor: &TypeDescriptor,
) -> Result<(), ShapeError> {
    let object = value
        .as_object()
        .ok_or_else(|| mismatch(path, descriptor, value))?;

    if let Some(task_class) = object.get("taskClass") {
        if !(task_class.is_string() || task_class.is_null()) {
            return Err(ShapeError {
                path: format!("{path}.taskClass"),
                expected: Scalar::Text.name().to_string(),
                found: kind(task_class),
            });
        }
    }
    for (key, ty) in [("param", param), ("result", result)] {
        match object.get(key) {
            None | Some(Value::Null) => {}
            Some(v) => check(v, ty, &format!("{path}.{key}"))?,
        }
    }
    Ok(())
}

fn mismatch(path: &str, descriptor: &TypeDescriptor, value: &Value) -> ShapeError {
    ShapeError {
        path: path.to_string(),
        expected: descriptor.to_string(),
        found: kind(value),
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
