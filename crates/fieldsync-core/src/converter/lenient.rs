//! Forgiving field deserializers.
//!
//! The desk server returns raw SQLite rows: booleans as `0`/`1`, ids and
//! coordinates occasionally as strings, `null` for anything unset.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => return Err(serde::de::Error::custom(format!("expected string, got {}", other))),
    })
}

pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let s = string(d)?;
    Ok(if s.trim().is_empty() { None } else { Some(s) })
}

pub fn flex_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(opt_flex_bool(d)?.unwrap_or(false))
}

pub fn opt_flex_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(true),
            "false" | "0" | "no" | "n" | "" => Some(false),
            other => {
                return Err(serde::de::Error::custom(format!("expected boolean, got '{}'", other)))
            }
        },
        Value::Null => None,
        other => return Err(serde::de::Error::custom(format!("expected boolean, got {}", other))),
    })
}

pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(
            s.trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("expected integer, got '{}'", s)))?,
        ),
        Value::Null => None,
        other => return Err(serde::de::Error::custom(format!("expected integer, got {}", other))),
    })
}

pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(
            s.trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("expected number, got '{}'", s)))?,
        ),
        Value::Null => None,
        other => return Err(serde::de::Error::custom(format!("expected number, got {}", other))),
    })
}

pub fn f64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(opt_f64(d)?.unwrap_or(0.0))
}

pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = opt_f64(d)?.unwrap_or(0.0);
    if value < 0.0 {
        return Err(serde::de::Error::custom(format!("expected non-negative count, got {}", value)));
    }
    Ok(value.round() as u64)
}
