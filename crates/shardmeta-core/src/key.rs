//! Partition Key Expressions
//!
//! A distributed table's partition key is either a bare column reference or a
//! scalar expression over the table's columns. Expressions are stored in the
//! catalog as JSON "node strings"; a bare column and a serialized expression
//! holding only that column produce the same node string.

use crate::error::{DirectoryError, Result};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Reference to one column of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub name: String,
    pub attnum: i16,
    pub value_type: ValueType,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>, attnum: i16, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            attnum,
            value_type,
        }
    }
}

/// Scalar expression tree over a relation's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ScalarExpr {
    /// Column value
    Column(ColumnRef),
    /// Type conversion of the inner expression
    Cast {
        arg: Box<ScalarExpr>,
        target: ValueType,
    },
}

impl ScalarExpr {
    /// Wrap an expression in a cast.
    pub fn cast(arg: ScalarExpr, target: ValueType) -> Self {
        Self::Cast {
            arg: Box::new(arg),
            target,
        }
    }

    /// Result type of the expression.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Column(col) => col.value_type,
            Self::Cast { target, .. } => *target,
        }
    }

    /// Innermost column reference.
    pub fn column(&self) -> &ColumnRef {
        match self {
            Self::Column(col) => col,
            Self::Cast { arg, .. } => arg.column(),
        }
    }

    /// Compute the expression over a row whose slots are indexed by `attnum - 1`.
    pub fn evaluate(&self, row: &[Option<Value>]) -> Result<Option<Value>> {
        match self {
            Self::Column(col) => column_value(col, row),
            Self::Cast { arg, target } => match arg.evaluate(row)? {
                Some(value) => value.cast(*target).map(Some),
                None => Ok(None),
            },
        }
    }
}

fn column_value(col: &ColumnRef, row: &[Option<Value>]) -> Result<Option<Value>> {
    let slot = usize::try_from(col.attnum)
        .ok()
        .and_then(|attnum| attnum.checked_sub(1))
        .and_then(|index| row.get(index))
        .ok_or_else(|| DirectoryError::undefined_column("row", col.name.clone()))?;
    Ok(slot.clone())
}

/// A scalar expression in its stored form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedExpression {
    pub expr: ScalarExpr,
}

impl SerializedExpression {
    pub fn new(expr: ScalarExpr) -> Self {
        Self { expr }
    }

    /// Serialize to the catalog's node string form.
    pub fn to_node_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.expr)?)
    }

    /// Decode a node string.
    pub fn from_node_string(node_string: &str) -> Result<Self> {
        let expr = serde_json::from_str(node_string)?;
        Ok(Self { expr })
    }
}

/// The partition key of a distributed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyExpression {
    /// Bare column reference
    Column(ColumnRef),
    /// Serialized scalar expression
    Serialized(SerializedExpression),
}

impl KeyExpression {
    /// Semantic type of the key value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Column(col) => col.value_type,
            Self::Serialized(ser) => ser.expr.value_type(),
        }
    }

    /// Compute the key value for a row whose slots are indexed by `attnum - 1`.
    ///
    /// Returns `None` when the source column is null.
    pub fn evaluate(&self, row: &[Option<Value>]) -> Result<Option<Value>> {
        match self {
            Self::Column(col) => column_value(col, row),
            Self::Serialized(ser) => ser.expr.evaluate(row),
        }
    }

    /// Order two key values under the key's type.
    ///
    /// Fails when either value does not convert to the key type.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Ordering> {
        let ty = self.value_type();
        Ok(a.cast(ty)?.cmp(&b.cast(ty)?))
    }

    /// Underlying column reference.
    pub fn column(&self) -> &ColumnRef {
        match self {
            Self::Column(col) => col,
            Self::Serialized(ser) => ser.expr.column(),
        }
    }

    /// Whether the key is a column without any wrapping expression.
    pub fn is_bare_column(&self) -> bool {
        match self {
            Self::Column(_) => true,
            Self::Serialized(ser) => matches!(ser.expr, ScalarExpr::Column(_)),
        }
    }

    /// The key as a scalar expression tree.
    pub fn to_scalar_expr(&self) -> ScalarExpr {
        match self {
            Self::Column(col) => ScalarExpr::Column(col.clone()),
            Self::Serialized(ser) => ser.expr.clone(),
        }
    }

    /// Serialize to the catalog's node string form.
    pub fn to_node_string(&self) -> Result<String> {
        SerializedExpression::new(self.to_scalar_expr()).to_node_string()
    }
}
