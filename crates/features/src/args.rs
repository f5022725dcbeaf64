//! Constructor argument helpers
//!
//! Numeric arguments may be given literally or as a dotted path into the
//! experiment parameters.

use contracts::{FeatureError, Value};
use feature_engine::FeatureContext;

/// A count argument after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count {
    pub value: i64,
    /// Given as a literal number (as opposed to a parameter path)
    pub literal: bool,
}

/// Resolve `args[index]` as a count.
///
/// Arrays and tables count their entries; an unresolvable path falls back to
/// `fallback` with a warning.
pub fn count_arg(
    ctx: &FeatureContext,
    feature: &str,
    args: &[Value],
    index: usize,
    fallback: i64,
) -> Result<Count, FeatureError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(Count {
            value: fallback,
            literal: true,
        }),
        Some(Value::Number(n)) => {
            let value = n.as_i64().ok_or_else(|| {
                FeatureError::invalid_argument(feature, format!("expected an integer, got {}", n))
            })?;
            Ok(Count {
                value,
                literal: true,
            })
        }
        Some(Value::String(path)) => {
            let value = match ctx.lookup(path) {
                Some(Value::Number(n)) => n.as_i64(),
                Some(Value::Array(items)) => Some(items.len() as i64),
                Some(Value::Object(map)) => Some(map.len() as i64),
                _ => None,
            };
            let value = value.unwrap_or_else(|| {
                tracing::warn!(feature, path = %path, fallback, "parameter not found, using fallback");
                fallback
            });
            Ok(Count {
                value,
                literal: false,
            })
        }
        Some(other) => Err(FeatureError::invalid_argument(
            feature,
            format!("expected a number or parameter path, got {}", other),
        )),
    }
}

/// Resolve `args[index]` as a duration in milliseconds (literal or path)
pub fn millis_arg(
    ctx: &FeatureContext,
    feature: &str,
    args: &[Value],
    index: usize,
) -> Result<u64, FeatureError> {
    let value = match args.get(index) {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::String(path)) => ctx.lookup(path).cloned().unwrap_or(Value::Null),
        Some(value) => value.clone(),
    };
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_f64()
            .filter(|ms| *ms >= 0.0)
            .map(|ms| ms as u64)
            .ok_or_else(|| FeatureError::invalid_argument(feature, "duration must be non-negative")),
        other => Err(FeatureError::invalid_argument(
            feature,
            format!("expected a duration in ms, got {}", other),
        )),
    }
}

/// Resolve `args[index]` as a non-empty list of stage positions (literal or path)
pub fn positions_arg(
    ctx: &FeatureContext,
    feature: &str,
    args: &[Value],
    index: usize,
) -> Result<Vec<f64>, FeatureError> {
    let items = match args.get(index) {
        Some(Value::Array(items)) => items,
        Some(Value::String(path)) => match ctx.lookup(path) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FeatureError::invalid_argument(
                    feature,
                    format!("'{}' is not a list of positions: {}", path, other),
                ))
            }
            None => {
                return Err(FeatureError::invalid_argument(
                    feature,
                    format!("parameter '{}' not found", path),
                ))
            }
        },
        None | Some(Value::Null) => {
            return Err(FeatureError::invalid_argument(feature, "missing list of positions"))
        }
        Some(other) => {
            return Err(FeatureError::invalid_argument(
                feature,
                format!("expected a list of positions or parameter path, got {}", other),
            ))
        }
    };
    if items.is_empty() {
        return Err(FeatureError::invalid_argument(feature, "list of positions is empty"));
    }
    items
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| {
                FeatureError::invalid_argument(feature, format!("position {} is not a number", item))
            })
        })
        .collect()
}
