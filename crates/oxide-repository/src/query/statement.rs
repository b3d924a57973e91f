//! SQL statement rendering for repository operations.

use crate::error::{RepositoryError, Result};
use crate::model::ModelMeta;
use crate::params::{QueryOptions, SortOrder, Values};
use crate::query::condition::{render_where, Condition};
use crate::query::quote_ident;
use crate::value::SqlValue;

/// Rendered SQL with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub params: Vec<SqlValue>,
}

/// A filtered view of one table, rendered into SELECT, COUNT, UPDATE or
/// DELETE statements.
///
/// Conditions are combined with AND.
#[derive(Debug, Clone)]
pub struct Query {
    meta: ModelMeta,
    conditions: Vec<Condition>,
    order_by: Option<(&'static str, SortOrder)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Query {
    /// Creates an unfiltered query over the model's table.
    #[must_use]
    pub const fn new(meta: ModelMeta) -> Self {
        Self {
            meta,
            conditions: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Adds conditions.
    #[must_use]
    pub fn filter(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// Sorts by a column of the model.
    pub fn order_by(mut self, column: &str, order: SortOrder) -> Result<Self> {
        let column = self.meta.column(column)?;
        self.order_by = Some((column, order));
        Ok(self)
    }

    /// Limits the number of rows.
    #[must_use]
    pub const fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skips the first `n` rows.
    #[must_use]
    pub const fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Applies sorting and pagination from finder options.
    pub fn with_options(self, options: &QueryOptions) -> Result<Self> {
        let query = self.limit(options.limit).offset(options.offset);
        match &options.sorted_by {
            Some(column) => query.order_by(column, options.sorted_order),
            None => Ok(query),
        }
    }

    fn table(&self) -> String {
        quote_ident(self.meta.table)
    }

    fn push_where(&self, sql: &mut String, params: &mut Vec<SqlValue>) -> Result<()> {
        let where_clause = render_where(&self.conditions, &self.table(), params)?;
        if !where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }
        Ok(())
    }

    /// Builds the SELECT statement.
    pub fn build_select(&self) -> Result<Statement> {
        let table = self.table();
        let columns: Vec<String> = self
            .meta
            .columns
            .iter()
            .map(|c| format!("{table}.{}", quote_ident(c)))
            .collect();

        let mut sql = format!("SELECT {} FROM {table}", columns.join(", "));
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params)?;

        if let Some((column, order)) = self.order_by {
            sql.push_str(&format!(
                " ORDER BY {table}.{} {}",
                quote_ident(column),
                order.as_sql()
            ));
        }

        // SQLite only accepts OFFSET after a LIMIT.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        Ok(Statement { sql, params })
    }

    /// Builds the COUNT statement.
    pub fn build_count(&self) -> Result<Statement> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table());
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params)?;
        Ok(Statement { sql, params })
    }

    /// Builds an UPDATE of every matching row.
    ///
    /// With `returning`, the updated rows are returned with all columns.
    pub fn build_update(&self, values: &Values, returning: bool) -> Result<Statement> {
        let mut params = Vec::new();
        let mut assignments = Vec::with_capacity(values.len());
        for (key, value) in values.iter() {
            let column = self.meta.column(key)?;
            assignments.push(format!("{} = ?", quote_ident(column)));
            params.push(scalar(key, value)?);
        }
        if assignments.is_empty() {
            return Err(RepositoryError::InvalidValue(
                "update needs at least one column".to_string(),
            ));
        }

        let mut sql = format!("UPDATE {} SET {}", self.table(), assignments.join(", "));
        self.push_where(&mut sql, &mut params)?;
        if returning {
            sql.push_str(&returning_clause(&self.meta));
        }
        Ok(Statement { sql, params })
    }

    /// Builds a DELETE of every matching row.
    pub fn build_delete(&self) -> Result<Statement> {
        let mut sql = format!("DELETE FROM {}", self.table());
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params)?;
        Ok(Statement { sql, params })
    }
}

/// Builds an INSERT returning the stored row.
///
/// Model defaults fill the columns `values` leaves unset.
pub fn build_insert(
    meta: &ModelMeta,
    values: &Values,
    defaults: Vec<(&'static str, SqlValue)>,
) -> Result<Statement> {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (key, value) in values.iter() {
        let column = meta.column(key)?;
        if columns.contains(&column) {
            return Err(RepositoryError::InvalidValue(format!(
                "column '{column}' is set more than once"
            )));
        }
        columns.push(column);
        params.push(scalar(key, value)?);
    }
    for (column, value) in defaults {
        if !columns.contains(&column) {
            columns.push(meta.column(column)?);
            params.push(value);
        }
    }

    let table = quote_ident(meta.table);
    let mut sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            names.join(", ")
        )
    };
    sql.push_str(&returning_clause(meta));
    Ok(Statement { sql, params })
}

fn returning_clause(meta: &ModelMeta) -> String {
    let columns: Vec<String> = meta.columns.iter().map(|c| quote_ident(c)).collect();
    format!(" RETURNING {}", columns.join(", "))
}

fn scalar(column: &str, value: &SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::List(_) => Err(RepositoryError::InvalidValue(format!(
            "column '{column}' cannot be set to a list"
        ))),
        other => Ok(other.clone()),
    }
}
