//! Relation registry types.
//!
//! A relation is the host's description of a logical table: its id, name and
//! user columns. Column resolution for partition keys goes through it.

use crate::error::{DirectoryError, Result};
use crate::types::TableId;
use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved system columns carried by every relation, with their attribute numbers.
pub const SYSTEM_COLUMNS: [(&str, i16); 6] = [
    ("ctid", -1),
    ("xmin", -3),
    ("cmin", -4),
    ("xmax", -5),
    ("cmax", -6),
    ("tableoid", -7),
];

/// Attribute number of a system column, if `name` is one.
pub fn system_column_attnum(name: &str) -> Option<i16> {
    SYSTEM_COLUMNS
        .iter()
        .find(|(sys, _)| *sys == name)
        .map(|(_, attnum)| *attnum)
}

/// A user column of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// 1-based attribute number
    pub attnum: i16,
    pub value_type: ValueType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, attnum: i16, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            attnum,
            value_type,
        }
    }
}

/// A logical table known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: TableId,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl Relation {
    /// Build a relation, numbering columns from 1 in the given order.
    pub fn new<N: Into<String>>(
        id: TableId,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (N, ValueType)>,
    ) -> Self {
        let columns = columns
            .into_iter()
            .zip(1i16..)
            .map(|((name, ty), attnum)| ColumnDef::new(name, attnum, ty))
            .collect();
        Self {
            id,
            name: name.into(),
            columns,
        }
    }

    /// Find a user column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find a user column by attribute number.
    pub fn column_by_attnum(&self, attnum: i16) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.attnum == attnum)
    }

    /// Check the definition can be registered.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DirectoryError::InvalidRelation(format!(
                "relation {} has an empty name",
                self.id
            )));
        }

        let mut names = HashSet::new();
        let mut attnums = HashSet::new();
        for column in &self.columns {
            if column.attnum < 1 {
                return Err(DirectoryError::InvalidRelation(format!(
                    "column \"{}\" of \"{}\" has attribute number {}",
                    column.name, self.name, column.attnum
                )));
            }
            if system_column_attnum(&column.name).is_some() {
                return Err(DirectoryError::InvalidRelation(format!(
                    "column name \"{}\" conflicts with a system column",
                    column.name
                )));
            }
            if !names.insert(column.name.as_str()) || !attnums.insert(column.attnum) {
                return Err(DirectoryError::InvalidRelation(format!(
                    "column \"{}\" specified more than once in \"{}\"",
                    column.name, self.name
                )));
            }
        }
        Ok(())
    }
}
