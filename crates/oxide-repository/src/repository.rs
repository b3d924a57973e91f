//! The generic repository.
//!
//! `Repository<M>` wraps a pool and exposes keyword-driven finders and
//! mutations for one model. Every method renders a single parameterized
//! statement (plus one per eagerly loaded relation) and runs it through
//! sqlx in autocommit mode.

use std::marker::PhantomData;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::{RepositoryError, Result};
use crate::loader;
use crate::model::Model;
use crate::params::{QueryOptions, SearchParams, Values};
use crate::query::{build_insert, parse_conditions, Condition, Lookup, Query, Statement};
use crate::value::{bind_all, SqlValue, ToSqlValue};

/// Keyword-driven data access for one model.
///
/// # Example
///
/// ```ignore
/// use oxide_repository::{QueryOptions, Repository, SearchParams};
///
/// let users = Repository::<User>::new(pool.clone())
///     .with_default_scope(SearchParams::new().with("is_active", true));
///
/// let adults = users
///     .where_(
///         &SearchParams::new().with("age__gte", 18),
///         &QueryOptions::new().sorted_by("name").limit(20),
///     )
///     .await?;
///
/// let alice = users
///     .find_by_or_raise(&SearchParams::new().with("email__iexact", "ALICE@example.com"), &QueryOptions::new())
///     .await?;
/// ```
pub struct Repository<M: Model> {
    pool: SqlitePool,
    default_scope: SearchParams,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            default_scope: self.default_scope.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> std::fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("model", &M::NAME)
            .field("default_scope", &self.default_scope)
            .finish_non_exhaustive()
    }
}

impl<M: Model> Repository<M> {
    /// Creates a repository without a default scope.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            default_scope: SearchParams::new(),
            _marker: PhantomData,
        }
    }

    /// Sets the filter merged into finders and counts.
    ///
    /// Scope entries are ANDed with the caller's parameters; a caller key
    /// never replaces a scope key. Use `disable_default_scope` to skip it.
    #[must_use]
    pub fn with_default_scope(mut self, scope: SearchParams) -> Self {
        self.default_scope = scope;
        self
    }

    /// Returns the default scope.
    #[must_use]
    pub const fn default_scope(&self) -> &SearchParams {
        &self.default_scope
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Finds a row by primary key.
    ///
    /// Returns a not-found error when no row matches.
    pub async fn find(&self, id: impl ToSqlValue, options: &QueryOptions) -> Result<M> {
        let id = id.to_sql_value();
        let params = SearchParams::new().with(M::PRIMARY_KEY, &id);
        self.select(&params, &options.single_row())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found::<M>(format!("with id {id}")))
    }

    /// Finds the first row matching `params`, or `None`.
    pub async fn find_by(&self, params: &SearchParams, options: &QueryOptions) -> Result<Option<M>> {
        Ok(self
            .select(params, &options.single_row())
            .await?
            .into_iter()
            .next())
    }

    /// Finds the first row matching `params`.
    ///
    /// Returns a not-found error naming the attributes when no row matches.
    pub async fn find_by_or_raise(&self, params: &SearchParams, options: &QueryOptions) -> Result<M> {
        self.find_by(params, options)
            .await?
            .ok_or_else(|| not_found::<M>(format!("with attributes {params}")))
    }

    /// Returns every row matching `params`, honouring pagination, sorting
    /// and loading options.
    #[doc(alias = "where")]
    pub async fn where_(&self, params: &SearchParams, options: &QueryOptions) -> Result<Vec<M>> {
        self.select(params, options).await
    }

    /// Counts the rows matching `params`.
    pub async fn count(&self, params: &SearchParams, disable_default_scope: bool) -> Result<i64> {
        let stmt = Query::new(M::meta())
            .filter(self.conditions(params, disable_default_scope)?)
            .build_count()?;
        let row = self.fetch_one(stmt).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Returns whether any row matches `params`.
    pub async fn exists(&self, params: &SearchParams, disable_default_scope: bool) -> Result<bool> {
        Ok(self.count(params, disable_default_scope).await? > 0)
    }

    /// Inserts a row and returns it as stored, with its default-joined
    /// relations loaded.
    ///
    /// Columns missing from `values` take the model's column defaults, then
    /// the database defaults.
    pub async fn create(&self, values: &Values) -> Result<M> {
        let stmt = build_insert(&M::meta(), values, M::column_defaults())?;
        let row = self.fetch_one(stmt).await?;
        self.refresh(row).await
    }

    /// Updates the row with this primary key and returns it refreshed, with
    /// its default-joined relations loaded.
    ///
    /// The row must be visible through the default scope. Empty `values`
    /// return the row unchanged.
    pub async fn update(&self, id: impl ToSqlValue, values: &Values) -> Result<M> {
        let id = id.to_sql_value();
        if values.is_empty() {
            return self.find(id, &QueryOptions::new()).await;
        }
        self.ensure_visible(&id).await?;

        let stmt = Query::new(M::meta())
            .filter([Self::pk_condition(&id)])
            .build_update(values, true)?;
        let row = self
            .fetch_optional(stmt)
            .await?
            .ok_or_else(|| not_found::<M>(format!("with id {id}")))?;
        self.refresh(row).await
    }

    /// Updates every row matching `params` in one statement.
    ///
    /// The default scope is not applied. Returns the number of rows
    /// updated; empty `values` update nothing.
    pub async fn update_all(&self, values: &Values, params: &SearchParams) -> Result<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let stmt = Query::new(M::meta())
            .filter(self.conditions(params, true)?)
            .build_update(values, false)?;
        let updated = self.execute(stmt).await?;
        info!(model = M::NAME, rows = updated, "Updated rows");
        Ok(updated)
    }

    /// Deletes the row with this primary key.
    ///
    /// The row must be visible through the default scope.
    pub async fn destroy(&self, id: impl ToSqlValue) -> Result<()> {
        let id = id.to_sql_value();
        self.ensure_visible(&id).await?;

        let stmt = Query::new(M::meta())
            .filter([Self::pk_condition(&id)])
            .build_delete()?;
        self.execute(stmt).await?;
        Ok(())
    }

    /// Deletes every row matching `params` in one statement.
    ///
    /// The default scope is not applied; empty `params` delete every row.
    /// Returns the number of rows deleted.
    pub async fn destroy_all(&self, params: &SearchParams) -> Result<u64> {
        let stmt = Query::new(M::meta())
            .filter(self.conditions(params, true)?)
            .build_delete()?;
        let deleted = self.execute(stmt).await?;
        info!(model = M::NAME, rows = deleted, "Deleted rows");
        Ok(deleted)
    }

    /// Default scope conditions (unless disabled) followed by `params`.
    fn conditions(&self, params: &SearchParams, disable_default_scope: bool) -> Result<Vec<Condition>> {
        let meta = M::meta();
        let mut conditions = if disable_default_scope {
            Vec::new()
        } else {
            parse_conditions(&meta, &self.default_scope)?
        };
        conditions.extend(parse_conditions(&meta, params)?);
        Ok(conditions)
    }

    fn pk_condition(id: &SqlValue) -> Condition {
        Condition::Compare {
            column: M::PRIMARY_KEY,
            lookup: Lookup::Exact,
            value: id.clone(),
        }
    }

    async fn ensure_visible(&self, id: &SqlValue) -> Result<()> {
        let params = SearchParams::new().with(M::PRIMARY_KEY, id);
        if self.exists(&params, false).await? {
            Ok(())
        } else {
            Err(not_found::<M>(format!("with id {id}")))
        }
    }

    /// Decodes a row returned by a mutation and loads its default-joined
    /// relations.
    async fn refresh(&self, row: SqliteRow) -> Result<M> {
        let mut model = M::from_row(&row)?;
        let plan = loader::plan(&M::meta(), &[], &[])?;
        if !plan.is_empty() {
            loader::load_into(
                &self.pool,
                std::slice::from_ref(&row),
                std::slice::from_mut(&mut model),
                &plan,
            )
            .await?;
        }
        Ok(model)
    }

    async fn select(&self, params: &SearchParams, options: &QueryOptions) -> Result<Vec<M>> {
        let meta = M::meta();
        let plan = loader::plan(&meta, &options.joined, &options.lazy)?;
        let stmt = Query::new(meta)
            .filter(self.conditions(params, options.disable_default_scope)?)
            .with_options(options)?
            .build_select()?;

        let rows = self.fetch_all(stmt).await?;
        let mut models = rows
            .iter()
            .map(|row| M::from_row(row))
            .collect::<std::result::Result<Vec<M>, sqlx::Error>>()?;
        if !plan.is_empty() && !models.is_empty() {
            loader::load_into(&self.pool, &rows, &mut models, &plan).await?;
        }
        Ok(models)
    }

    async fn fetch_all(&self, stmt: Statement) -> Result<Vec<SqliteRow>> {
        debug!(model = M::NAME, sql = %stmt.sql, "Executing query");
        let rows = sqlx::query_with(&stmt.sql, bind_all(stmt.params)?)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_one(&self, stmt: Statement) -> Result<SqliteRow> {
        debug!(model = M::NAME, sql = %stmt.sql, "Executing query");
        let row = sqlx::query_with(&stmt.sql, bind_all(stmt.params)?)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn fetch_optional(&self, stmt: Statement) -> Result<Option<SqliteRow>> {
        debug!(model = M::NAME, sql = %stmt.sql, "Executing query");
        let row = sqlx::query_with(&stmt.sql, bind_all(stmt.params)?)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn execute(&self, stmt: Statement) -> Result<u64> {
        debug!(model = M::NAME, sql = %stmt.sql, "Executing statement");
        let result = sqlx::query_with(&stmt.sql, bind_all(stmt.params)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn not_found<M: Model>(detail: String) -> RepositoryError {
    RepositoryError::NotFound {
        model: M::NAME,
        detail,
    }
}
