//! Partial-update clause assembly shared by the four record repositories.
//!
//! Each record kind enumerates its updatable columns once, statically, by
//! calling the typed `set_*` methods with the caller's `Option` fields. A
//! field that is `None` never produces a clause, so omitted fields never
//! touch storage; a supplied empty list is a real value and clears the
//! column. When no clause was produced the update must be rejected rather
//! than silently committed, which [`UpdateBuilder::is_empty`] exposes.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use recollect_core::{Error, Result};

/// A value destined for one positional parameter of an UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    TextArray(Vec<String>),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Int(i32),
}

/// Assembles `SET` clauses for the fields a caller actually supplied.
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    clauses: Vec<String>,
    values: Vec<SqlValue>,
    effective: usize,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            clauses: Vec::new(),
            values: Vec::new(),
            effective: 0,
        }
    }

    fn push(&mut self, column: &str, value: SqlValue) {
        self.values.push(value);
        self.clauses.push(format!("{} = ${}", column, self.values.len()));
        self.effective += 1;
    }

    /// Add a text column if the caller supplied a value.
    pub fn set_text(&mut self, column: &str, value: Option<String>) -> &mut Self {
        if let Some(v) = value {
            self.push(column, SqlValue::Text(v));
        }
        self
    }

    /// Add a text-array column if the caller supplied a value. An empty
    /// vector is a deliberate value and clears the column.
    pub fn set_text_array(&mut self, column: &str, value: Option<Vec<String>>) -> &mut Self {
        if let Some(v) = value {
            self.push(column, SqlValue::TextArray(v));
        }
        self
    }

    /// Add a JSONB column if the caller supplied a value.
    pub fn set_json(&mut self, column: &str, value: Option<serde_json::Value>) -> &mut Self {
        if let Some(v) = value {
            self.push(column, SqlValue::Json(v));
        }
        self
    }

    /// Add an integer column if the caller supplied a value.
    pub fn set_int(&mut self, column: &str, value: Option<i32>) -> &mut Self {
        if let Some(v) = value {
            self.push(column, SqlValue::Int(v));
        }
        self
    }

    /// True when no caller-supplied field produced a clause.
    ///
    /// A timestamp added via [`touch`](Self::touch) does not count: it is a
    /// side effect of an effective update, never a reason to run one.
    pub fn is_empty(&self) -> bool {
        self.effective == 0
    }

    /// Refresh a timestamp column, typically `updated_at`. Call only after
    /// confirming at least one effective field is present.
    pub fn touch(&mut self, column: &str, now: DateTime<Utc>) -> &mut Self {
        self.push(column, SqlValue::Timestamp(now));
        self.effective -= 1;
        self
    }

    /// Finalize into SQL and its bind values, with the row id as the last
    /// positional parameter. Fails when no effective field was supplied.
    pub fn into_parts(mut self, id: i32) -> Result<(String, Vec<SqlValue>)> {
        if self.is_empty() {
            return Err(Error::Validation("no valid fields to update".into()));
        }
        self.values.push(SqlValue::Int(id));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ${}",
            self.table,
            self.clauses.join(", "),
            self.values.len()
        );
        Ok((sql, self.values))
    }
}

/// Bind one [`SqlValue`] onto a query.
pub fn bind_value(
    q: Query<'_, Postgres, PgArguments>,
    value: SqlValue,
) -> Query<'_, Postgres, PgArguments> {
    match value {
        SqlValue::Text(v) => q.bind(v),
        SqlValue::TextArray(v) => q.bind(v),
        SqlValue::Json(v) => q.bind(v),
        SqlValue::Timestamp(v) => q.bind(v),
        SqlValue::Int(v) => q.bind(v),
    }
}
