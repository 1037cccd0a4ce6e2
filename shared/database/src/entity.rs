//! Entity metadata shared by every repository backend.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    pub on_delete: OnDelete,
}

impl ForeignKey {
    pub const fn new(column: &'static str, references: &'static str, on_delete: OnDelete) -> Self {
        Self {
            column,
            references,
            on_delete,
        }
    }
}

/// A persisted model.
///
/// `COLUMNS` lists the table columns with `id` first. Serde field names of the model must
/// match the column names; the in-memory backend relies on it. `values` returns one value
/// per column, in `COLUMNS` order.
pub trait Entity: Clone + Send + Sync + Unpin + Serialize + DeserializeOwned + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Columns carrying a unique constraint besides the primary key
    const UNIQUE: &'static [&'static str] = &[];
    const FOREIGN_KEYS: &'static [ForeignKey] = &[];

    fn id(&self) -> Uuid;

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error>;

    /// Value of a single column, `None` for unknown names.
    fn field(&self, name: &str) -> Option<Value> {
        let index = Self::COLUMNS.iter().position(|c| *c == name)?;
        let mut values = self.values();
        if index < values.len() {
            Some(values.swap_remove(index))
        } else {
            None
        }
    }
}

/// Static description of one table, used to resolve delete actions on the in-memory store.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    pub const fn of<E: Entity>() -> Self {
        Self {
            table: E::TABLE,
            foreign_keys: E::FOREIGN_KEYS,
        }
    }
}
