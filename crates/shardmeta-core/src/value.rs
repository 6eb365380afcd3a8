//! Typed Scalar Values
//!
//! Shard boundaries are stored as text in the catalog and converted to typed
//! values with the canonical text conversion of the partition key's type.

use crate::error::{DirectoryError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Scalar types a partition key can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int2,
    Int4,
    Int8,
    Float8,
    Text,
    Bool,
}

impl ValueType {
    /// Canonical type name as stored in the catalog.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int2 => "int2",
            Self::Int4 => "int4",
            Self::Int8 => "int8",
            Self::Float8 => "float8",
            Self::Text => "text",
            Self::Bool => "bool",
        }
    }

    /// Whether values of this type are numeric.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Text | Self::Bool)
    }

    /// Convert text to a value of this type.
    pub fn parse(self, text: &str) -> Result<Value> {
        let invalid = || DirectoryError::invalid_value(self, text);
        let trimmed = text.trim();

        match self {
            Self::Int2 => trimmed.parse().map(Value::Int2).map_err(|_| invalid()),
            Self::Int4 => trimmed.parse().map(Value::Int4).map_err(|_| invalid()),
            Self::Int8 => trimmed.parse().map(Value::Int8).map_err(|_| invalid()),
            Self::Float8 => parse_float(trimmed).map(Value::Float8).ok_or_else(invalid),
            Self::Bool => parse_bool(trimmed).map(Value::Bool).ok_or_else(invalid),
            Self::Text => Ok(Value::Text(text.to_string())),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ValueType {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "int2" | "smallint" => Ok(Self::Int2),
            "int4" | "int" | "integer" => Ok(Self::Int4),
            "int8" | "bigint" => Ok(Self::Int8),
            "float8" | "double precision" | "double" => Ok(Self::Float8),
            "text" | "varchar" | "character varying" => Ok(Self::Text),
            "bool" | "boolean" => Ok(Self::Bool),
            _ => Err(DirectoryError::invalid_value(Self::Text, s)),
        }
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text.to_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        "infinity" | "+infinity" | "inf" | "+inf" => Some(f64::INFINITY),
        "-infinity" | "-inf" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A typed scalar value.
///
/// Values of the same type compare by their natural order (floats use IEEE
/// total order). Values of different types order by type, which only matters
/// for sorting heterogeneous collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float8(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int2(_) => ValueType::Int2,
            Self::Int4(_) => ValueType::Int4,
            Self::Int8(_) => ValueType::Int8,
            Self::Float8(_) => ValueType::Float8,
            Self::Text(_) => ValueType::Text,
            Self::Bool(_) => ValueType::Bool,
        }
    }

    /// Convert this value to another type.
    ///
    /// Numeric conversions round floats to the nearest integer and fail when
    /// the result is out of range. Every type converts to text; text converts
    /// to any type through [`ValueType::parse`].
    pub fn cast(&self, target: ValueType) -> Result<Value> {
        if self.value_type() == target {
            return Ok(self.clone());
        }

        match (self, target) {
            (_, ValueType::Text) => Ok(Value::Text(self.to_string())),
            (Value::Text(text), _) => target.parse(text),
            (Value::Bool(b), ValueType::Int4) => Ok(Value::Int4(i32::from(*b))),
            (Value::Int4(i), ValueType::Bool) => Ok(Value::Bool(*i != 0)),
            _ if self.value_type().is_numeric() && target.is_numeric() => self.cast_numeric(target),
            _ => Err(DirectoryError::invalid_value(target, self.to_string())),
        }
    }

    fn cast_numeric(&self, target: ValueType) -> Result<Value> {
        let out_of_range = || DirectoryError::invalid_value(target, self.to_string());

        let integral: i64 = match self {
            Value::Int2(v) => i64::from(*v),
            Value::Int4(v) => i64::from(*v),
            Value::Int8(v) => *v,
            Value::Float8(v) => {
                if target == ValueType::Float8 {
                    return Ok(Value::Float8(*v));
                }
                let rounded = v.round();
                if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                    return Err(out_of_range());
                }
                rounded as i64
            }
            _ => return Err(out_of_range()),
        };

        match target {
            ValueType::Int2 => i16::try_from(integral)
                .map(Value::Int2)
                .map_err(|_| out_of_range()),
            ValueType::Int4 => i32::try_from(integral)
                .map(Value::Int4)
                .map_err(|_| out_of_range()),
            ValueType::Int8 => Ok(Value::Int8(integral)),
            ValueType::Float8 => Ok(Value::Float8(integral as f64)),
            _ => Err(out_of_range()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Int2(_) => 0,
            Self::Int4(_) => 1,
            Self::Int8(_) => 2,
            Self::Float8(_) => 3,
            Self::Text(_) => 4,
            Self::Bool(_) => 5,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int2(v) => write!(f, "{v}"),
            Self::Int4(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Float8(v) if v.is_nan() => f.write_str("NaN"),
            Self::Float8(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Self::Float8(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Bool(v) => f.write_str(if *v { "t" } else { "f" }),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int2(a), Self::Int2(b)) => a.cmp(b),
            (Self::Int4(a), Self::Int4(b)) => a.cmp(b),
            (Self::Int8(a), Self::Int8(b)) => a.cmp(b),
            (Self::Float8(a), Self::Float8(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}
