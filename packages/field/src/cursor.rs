use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Alias, ExprTrait, Query};
use sea_orm::{ConnectionTrait, QueryResult, Value};
use tracing::{debug, error};

use crate::error::{FieldError, FieldResult};
use crate::model::{ID_COLUMN, RecordId};
use crate::value::{LoadedValues, RawValue};

/// Default bound on the number of ids in one `IN (...)` list.
pub const DEFAULT_IN_MAX: usize = 1000;

/// Value assigned to a column by [`RecordCursor::update_columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
}

impl ColumnValue {
    fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => text.clone().into(),
            Self::Bytes(bytes) => bytes.clone().into(),
        }
    }
}

/// Relational execution context bound to the caller's transaction.
#[async_trait]
pub trait RecordCursor: Send + Sync {
    /// Largest id list a single statement may carry.
    fn in_max(&self) -> usize;

    /// `(id, key)` for the given ids whose `key_column` is neither null nor empty.
    async fn select_pointers(
        &self,
        table: &str,
        key_column: &str,
        ids: &[RecordId],
    ) -> FieldResult<Vec<(RecordId, String)>>;

    /// Assign `assignments` on every row whose id is in `ids`, in one statement.
    async fn update_columns(
        &self,
        table: &str,
        assignments: &[(&str, ColumnValue)],
        ids: &[RecordId],
    ) -> FieldResult<u64>;

    /// Read raw column values for `ids`, chunked by [`in_max`](Self::in_max).
    async fn load_values(
        &self,
        table: &str,
        columns: &[&str],
        ids: &[RecordId],
    ) -> FieldResult<LoadedValues>;
}

/// [`RecordCursor`] over a sea-orm connection or transaction.
pub struct SqlCursor<'c, C> {
    conn: &'c C,
    in_max: usize,
}

impl<'c, C> SqlCursor<'c, C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: &'c C) -> Self {
        Self::with_in_max(conn, DEFAULT_IN_MAX)
    }

    pub fn with_in_max(conn: &'c C, in_max: usize) -> Self {
        Self {
            conn,
            in_max: in_max.max(1),
        }
    }
}

fn integrity(what: String) -> FieldError {
    error!("{what}");
    FieldError::Integrity(what)
}

fn read_id(row: &QueryResult, table: &str) -> FieldResult<RecordId> {
    row.try_get::<i64>("", ID_COLUMN)
        .map_err(|e| integrity(format!("{table}.{ID_COLUMN} is not an integer id: {e}")))
}

fn read_raw(row: &QueryResult, table: &str, column: &str) -> FieldResult<RawValue> {
    if let Ok(bytes) = row.try_get::<Option<Vec<u8>>>("", column) {
        return Ok(RawValue::from(bytes));
    }
    match row.try_get::<Option<String>>("", column) {
        Ok(text) => Ok(RawValue::from(text)),
        Err(e) => Err(integrity(format!(
            "{table}.{column} holds neither bytes nor text: {e}"
        ))),
    }
}

#[async_trait]
impl<C> RecordCursor for SqlCursor<'_, C>
where
    C: ConnectionTrait + Send + Sync,
{
    fn in_max(&self) -> usize {
        self.in_max
    }

    async fn select_pointers(
        &self,
        table: &str,
        key_column: &str,
        ids: &[RecordId],
    ) -> FieldResult<Vec<(RecordId, String)>> {
        let mut query = Query::select();
        query
            .column(Alias::new(ID_COLUMN))
            .column(Alias::new(key_column))
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new(ID_COLUMN)).is_in(ids.iter().copied()))
            .and_where(Expr::col(Alias::new(key_column)).is_not_null())
            .and_where(Expr::col(Alias::new(key_column)).ne(""));

        let stmt = self.conn.get_database_backend().build(&query);
        let rows = self.conn.query_all_raw(stmt).await?;
        debug!(table, key_column, ids = ids.len(), rows = rows.len(), "Selected pointers");

        rows.iter()
            .map(|row| {
                let id = read_id(row, table)?;
                let key = row.try_get::<String>("", key_column).map_err(|e| {
                    integrity(format!("{table}.{key_column} is not a text key: {e}"))
                })?;
                Ok((id, key))
            })
            .collect()
    }

    async fn update_columns(
        &self,
        table: &str,
        assignments: &[(&str, ColumnValue)],
        ids: &[RecordId],
    ) -> FieldResult<u64> {
        let mut update = Query::update();
        update.table(Alias::new(table));
        for (column, value) in assignments {
            update.value(Alias::new(*column), value.to_value());
        }
        update.and_where(Expr::col(Alias::new(ID_COLUMN)).is_in(ids.iter().copied()));

        let stmt = self.conn.get_database_backend().build(&update);
        let result = self.conn.execute_raw(stmt).await?;
        Ok(result.rows_affected())
    }

    async fn load_values(
        &self,
        table: &str,
        columns: &[&str],
        ids: &[RecordId],
    ) -> FieldResult<LoadedValues> {
        let mut loaded = LoadedValues::new();
        for chunk in ids.chunks(self.in_max) {
            let mut query = Query::select();
            query
                .column(Alias::new(ID_COLUMN))
                .columns(columns.iter().map(|c| Alias::new(*c)))
                .from(Alias::new(table))
                .and_where(Expr::col(Alias::new(ID_COLUMN)).is_in(chunk.iter().copied()));

            let stmt = self.conn.get_database_backend().build(&query);
            for row in self.conn.query_all_raw(stmt).await? {
                let id = read_id(&row, table)?;
                let mut values = HashMap::with_capacity(columns.len());
                for column in columns {
                    values.insert((*column).to_owned(), read_raw(&row, table, column)?);
                }
                loaded.insert(id, values);
            }
        }
        Ok(loaded)
    }
}
