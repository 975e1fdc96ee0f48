//! QuerySet and Manager: lazy query building with value-level sugar.
//!
//! [`QuerySet`] builds a [`Query`] AST through method chaining and only
//! touches the database when an execution method is called. On top of the
//! usual filtering surface it carries a column projection with an explicit
//! row shape (single values vs named tuples), grouped iteration, aggregate
//! reduction, and update helpers that skip rows already in the desired
//! state. [`Manager`] is the per-model entry point and adds primary-key
//! indexing plus the minimal-write bulk update strategies.
//!
//! Positional access works on materialized rows: `qs.rows(db).await?` is a
//! plain slice, so indexing and subslicing need no extra API.

use super::compiler::{OrderBy, Query, Row, SelectColumn, SqlCompiler, WhereNode};
use super::expressions::{AggregateFunc, Expression};
use super::lookups::{Lookup, Q};
use crate::error::{OrmError, OrmResult};
use crate::executor::DbExecutor;
use crate::model::Model;
use crate::query::compiler::DatabaseBackendType;
use crate::value::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops;
use std::sync::OnceLock;

/// The shape of rows a projected queryset yields.
///
/// A flat queryset yields single values; a tuple queryset yields [`Row`]s.
/// The tag is maintained by [`QuerySet::col`], [`QuerySet::cols`], and
/// [`QuerySet::annotate`] so it always matches the active projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    /// Single-column projection; rows are scalars.
    Flat,
    /// Multi-column (or annotated) projection; rows are named tuples.
    Tuple,
}

/// The entry point for model-level query operations.
///
/// The `Manager` holds no query state; it creates fresh [`QuerySet`]
/// instances and hosts the bulk-update helpers that need primary-key
/// awareness.
#[derive(Debug)]
pub struct Manager<M: Model> {
    _phantom: PhantomData<M>,
}

impl<M: Model> Default for Manager<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Manager<M> {
    /// Creates a new manager.
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }

    /// Returns a new `QuerySet` over all rows.
    pub fn all(&self) -> QuerySet<M> {
        QuerySet::new()
    }

    /// Returns a new `QuerySet` with the given filter applied.
    pub fn filter(&self, q: Q) -> QuerySet<M> {
        self.all().filter(q)
    }

    /// Returns a new `QuerySet` with the given exclusion applied.
    pub fn exclude(&self, q: Q) -> QuerySet<M> {
        self.all().exclude(q)
    }

    /// Returns a `QuerySet` matching a single primary key.
    ///
    /// This is the direct-access idiom: `objects.pk(1).set_col(..)` instead
    /// of fetch-modify-save.
    pub fn pk(&self, pk: impl Into<Value>) -> QuerySet<M> {
        self.filter(Q::filter(M::pk_field_name(), Lookup::Exact(pk.into())))
    }

    /// Deletes the row with the given primary key.
    pub async fn delete_pk(&self, pk: impl Into<Value>, db: &dyn DbExecutor) -> OrmResult<u64> {
        self.pk(pk).remove(db).await
    }

    /// Returns whether a row with the given primary key exists.
    pub async fn contains_pk(&self, pk: impl Into<Value>, db: &dyn DbExecutor) -> OrmResult<bool> {
        self.pk(pk).exists(db).await
    }

    /// Returns the fields whose stored values differ from `desired`.
    ///
    /// Issues a single query which only matches when at least one field
    /// differs, so the common no-change case costs one empty fetch. The
    /// returned map holds the current database values of the differing
    /// fields; an empty map means nothing would change (or no such row).
    pub async fn changed(
        &self,
        pk: impl Into<Value>,
        desired: &[(&str, Value)],
        db: &dyn DbExecutor,
    ) -> OrmResult<HashMap<String, Value>> {
        if desired.is_empty() {
            return Ok(HashMap::new());
        }
        let mut all_match = Q::filter(desired[0].0, Lookup::Exact(desired[0].1.clone()));
        for (field, value) in &desired[1..] {
            all_match = all_match & Q::filter(*field, Lookup::Exact(value.clone()));
        }
        let names: Vec<&str> = desired.iter().map(|(field, _)| *field).collect();
        let row = self
            .pk(pk)
            .exclude(all_match)
            .cols(&names)
            .first(db)
            .await?;

        let mut diff = HashMap::new();
        if let Some(row) = row {
            for (field, value) in desired {
                if let Some(current) = row.get_value(field) {
                    if current != value {
                        diff.insert((*field).to_string(), current.clone());
                    }
                }
            }
        }
        Ok(diff)
    }

    /// Applies per-row updates, writing only rows that would actually change.
    ///
    /// `data` maps primary key to the desired field values for that row. One
    /// select fetches the current values of every referenced field for every
    /// referenced key; rows already in the desired state are skipped, and one
    /// update is issued per changed row. Worth the extra read when the
    /// changed fraction is small.
    ///
    /// The read and the writes are separate statements with no transaction
    /// around them; a concurrent writer can interleave.
    ///
    /// Returns the primary keys that were updated.
    pub async fn update_rows(
        &self,
        data: &[(Value, Vec<(&str, Value)>)],
        db: &dyn DbExecutor,
    ) -> OrmResult<Vec<Value>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let pk_col = M::pk_field_name();
        let mut fields: Vec<&str> = Vec::new();
        for (_, values) in data {
            for (field, _) in values {
                if !fields.contains(field) {
                    fields.push(field);
                }
            }
        }
        let pks: Vec<Value> = data.iter().map(|(pk, _)| pk.clone()).collect();
        let mut select: Vec<&str> = vec![pk_col];
        select.extend(&fields);

        let current = self
            .filter(Q::filter(pk_col, Lookup::In(pks)))
            .cols(&select);
        let mut changed: Vec<Value> = Vec::new();
        for row in current.rows(db).await? {
            let Some(pk) = row.get_value(pk_col) else {
                continue;
            };
            let Some((_, desired)) = data.iter().find(|(candidate, _)| candidate == pk) else {
                continue;
            };
            if desired
                .iter()
                .any(|(field, value)| row.get_value(field) != Some(value))
            {
                changed.push(pk.clone());
            }
        }

        for pk in &changed {
            if let Some((_, payload)) = data.iter().find(|(candidate, _)| candidate == pk) {
                self.pk(pk.clone()).update(payload, db).await?;
            }
        }
        Ok(changed)
    }

    /// Applies single-column updates batched by desired value.
    ///
    /// Primary keys are grouped by their target value and one bulk update is
    /// issued per distinct value, so a boolean column costs at most two
    /// statements regardless of row count. Faster than [`Manager::update_rows`]
    /// when the value domain is small.
    ///
    /// Returns each distinct value with the number of rows targeted.
    pub async fn update_columns(
        &self,
        field: &str,
        data: &[(Value, Value)],
        db: &dyn DbExecutor,
    ) -> OrmResult<Vec<(Value, u64)>> {
        let pk_col = M::pk_field_name();
        let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
        for (pk, value) in data {
            match groups.iter_mut().find(|(candidate, _)| candidate == value) {
                Some((_, pks)) => pks.push(pk.clone()),
                None => groups.push((value.clone(), vec![pk.clone()])),
            }
        }
        let mut counts = Vec::new();
        for (value, pks) in groups {
            let targeted = pks.len() as u64;
            self.filter(Q::filter(pk_col, Lookup::In(pks)))
                .update(&[(field, value.clone())], db)
                .await?;
            counts.push((value, targeted));
        }
        Ok(counts)
    }
}

/// A lazy, composable database query over a model's table.
///
/// Builder methods consume `self` and return a modified queryset, so the
/// original is never mutated in place. Execution methods take a
/// [`DbExecutor`] and run exactly the SQL the builders accumulated.
pub struct QuerySet<M: Model> {
    model: PhantomData<M>,
    query: Query,
    /// The projected columns; empty means all columns.
    fields: Vec<String>,
    shape: RowShape,
    /// Fields set by `groupby()`, consumed by `groups()`/`reduce()`.
    group_fields: Vec<String>,
    cache: OnceLock<Vec<Row>>,
}

impl<M: Model> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            model: PhantomData,
            query: self.query.clone(),
            fields: self.fields.clone(),
            shape: self.shape,
            group_fields: self.group_fields.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<M: Model> Default for QuerySet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> QuerySet<M> {
    /// Creates a new queryset over all rows of the model's table.
    pub fn new() -> Self {
        Self {
            model: PhantomData,
            query: Query::new(M::table_name()),
            fields: Vec::new(),
            shape: RowShape::Tuple,
            group_fields: Vec::new(),
            cache: OnceLock::new(),
        }
    }

    /// Returns a reference to the underlying query AST.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the projected column names (empty when selecting all).
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the current row shape.
    pub const fn shape(&self) -> RowShape {
        self.shape
    }

    // ── Builders (lazy) ──────────────────────────────────────────────

    /// Adds a filter condition. Returns a new queryset of the same shape.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        let new_node = WhereNode::from_q(&q);
        self.query.where_clause = Some(match self.query.where_clause.take() {
            Some(existing) => WhereNode::And(vec![existing, new_node]),
            None => new_node,
        });
        self.cache = OnceLock::new();
        self
    }

    /// Adds an exclusion condition (NOT). Returns a new queryset.
    #[must_use]
    pub fn exclude(mut self, q: Q) -> Self {
        let new_node = WhereNode::Not(Box::new(WhereNode::from_q(&q)));
        self.query.where_clause = Some(match self.query.where_clause.take() {
            Some(existing) => WhereNode::And(vec![existing, new_node]),
            None => new_node,
        });
        self.cache = OnceLock::new();
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn order_by(mut self, fields: Vec<OrderBy>) -> Self {
        self.query.order_by = fields;
        self.cache = OnceLock::new();
        self
    }

    /// Sets the LIMIT.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self.cache = OnceLock::new();
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub fn offset(mut self, n: usize) -> Self {
        self.query.offset = Some(n);
        self.cache = OnceLock::new();
        self
    }

    /// Adds DISTINCT to the query.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self.cache = OnceLock::new();
        self
    }

    /// Projects a single column; rows become scalars.
    #[must_use]
    pub fn col(mut self, field: &str) -> Self {
        self.query.select = vec![SelectColumn::Column(field.to_string())];
        self.fields = vec![field.to_string()];
        self.shape = RowShape::Flat;
        self.cache = OnceLock::new();
        self
    }

    /// Projects multiple columns; rows become fixed-shape named tuples.
    #[must_use]
    pub fn cols(mut self, fields: &[&str]) -> Self {
        self.query.select = fields
            .iter()
            .map(|f| SelectColumn::Column((*f).to_string()))
            .collect();
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self.shape = RowShape::Tuple;
        self.cache = OnceLock::new();
        self
    }

    /// Marks the queryset for grouped iteration over the given fields.
    ///
    /// Nothing is re-ordered or re-projected until [`QuerySet::groups`] or
    /// [`QuerySet::reduce`] runs.
    #[must_use]
    pub fn groupby(mut self, fields: &[&str]) -> Self {
        self.group_fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Adds a computed column under the given alias.
    ///
    /// Annotating always switches the queryset to tuple shape, since the row
    /// now carries more than the plain projection. Aggregate annotations
    /// group by the projected columns.
    #[must_use]
    pub fn annotate(mut self, alias: impl Into<String>, expr: Expression) -> Self {
        if matches!(expr, Expression::Aggregate { .. }) {
            for field in &self.fields {
                if !self.query.group_by.contains(field) {
                    self.query.group_by.push(field.clone());
                }
            }
        }
        self.query.annotations.push((alias.into(), expr));
        self.shape = RowShape::Tuple;
        self.cache = OnceLock::new();
        self
    }

    /// Annotates a count over the projected column: grouped value counting.
    pub fn value_counts(self) -> OrmResult<Self> {
        let field = self.fields.first().cloned().ok_or_else(|| {
            OrmError::FieldError("value_counts requires a column projection".to_string())
        })?;
        let alias = AggregateFunc::Count.default_alias(&field);
        Ok(self.annotate(alias, Expression::aggregate(AggregateFunc::Count, Expression::col(field))))
    }

    /// Filters every projected column by equality to the given value.
    ///
    /// With a single projected column this is "rows whose value is `v`",
    /// which with [`QuerySet::exists`] answers membership in one query.
    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        let mut seen: Vec<String> = Vec::new();
        for field in &self.fields {
            if !seen.contains(field) {
                seen.push(field.clone());
            }
        }
        let mut combined: Option<Q> = None;
        for field in seen {
            let cond = Q::filter(field, Lookup::Exact(value.clone()));
            combined = Some(match combined {
                Some(acc) => acc & cond,
                None => cond,
            });
        }
        match combined {
            Some(q) => self.filter(q),
            None => self,
        }
    }

    /// Returns the projected column as a computable expression.
    ///
    /// This is what the arithmetic operators delegate to: `&qs + 1` is
    /// "the projected field, incremented", usable as an update payload
    /// source or annotation.
    pub fn f(&self) -> Expression {
        let field = self
            .fields
            .first()
            .cloned()
            .unwrap_or_else(|| M::pk_field_name().to_string());
        Expression::F(field)
    }

    /// Raises the projected column to the given power as an expression.
    pub fn pow(&self, value: impl Into<Value>) -> Expression {
        self.f().pow(Expression::value(value))
    }

    // ── SQL generation ───────────────────────────────────────────────

    /// Compiles the queryset to a SELECT for the given backend.
    pub fn to_sql(&self, backend: DatabaseBackendType) -> (String, Vec<Value>) {
        SqlCompiler::new(backend).compile_select(&self.query)
    }

    fn where_clause(&self) -> WhereNode {
        self.query
            .where_clause
            .clone()
            .unwrap_or_else(|| WhereNode::And(vec![]))
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Fetches and caches the result rows.
    ///
    /// The cache makes repeated iteration free and lets positional/slice
    /// access work on the returned slice. Any builder call on a clone
    /// starts cold again.
    pub async fn rows(&self, db: &dyn DbExecutor) -> OrmResult<&[Row]> {
        if self.cache.get().is_none() {
            let (sql, params) = self.to_sql(db.backend_type());
            tracing::debug!(sql = %sql, "running query");
            let fetched = db.query(&sql, &params).await?;
            let _ = self.cache.set(fetched);
        }
        Ok(self.cache.get().map_or(&[], Vec::as_slice))
    }

    /// Fetches all rows and hydrates them into model instances.
    pub async fn execute(&self, db: &dyn DbExecutor) -> OrmResult<Vec<M>> {
        self.rows(db).await?.iter().map(M::from_row).collect()
    }

    /// Returns the number of matching rows.
    pub async fn count(&self, db: &dyn DbExecutor) -> OrmResult<i64> {
        if let Some(rows) = self.cache.get() {
            return Ok(rows.len() as i64);
        }
        let mut query = self.query.clone();
        query.select = vec![SelectColumn::Expression(
            Expression::aggregate(AggregateFunc::Count, Expression::col("*")),
            "count".to_string(),
        )];
        query.annotations.clear();
        query.order_by.clear();
        query.limit = None;
        query.offset = None;
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_select(&query);
        tracing::debug!(sql = %sql, "running count query");
        let row = db.query_one(&sql, &params).await?;
        row.get_by_index(0)
    }

    /// Returns the first matching row, or `None`.
    pub async fn first(&self, db: &dyn DbExecutor) -> OrmResult<Option<Row>> {
        if let Some(rows) = self.cache.get() {
            return Ok(rows.first().cloned());
        }
        let mut query = self.query.clone();
        query.limit = Some(1);
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_select(&query);
        tracing::debug!(sql = %sql, "running query");
        let rows = db.query(&sql, &params).await?;
        Ok(rows.into_iter().next())
    }

    /// Returns the single matching model instance.
    ///
    /// Fails with `DoesNotExist` when nothing matches and
    /// `MultipleObjectsReturned` when more than one row does.
    pub async fn get(&self, db: &dyn DbExecutor) -> OrmResult<M> {
        let mut query = self.query.clone();
        query.limit = Some(2);
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_select(&query);
        tracing::debug!(sql = %sql, "running query");
        let rows = db.query(&sql, &params).await?;
        match rows.len() {
            0 => Err(OrmError::DoesNotExist(format!(
                "{} matching query does not exist.",
                M::table_name()
            ))),
            1 => M::from_row(&rows[0]),
            n => Err(OrmError::MultipleObjectsReturned(format!(
                "get() returned more than one {} -- it returned {n}!",
                M::table_name()
            ))),
        }
    }

    /// Returns whether any rows match.
    pub async fn exists(&self, db: &dyn DbExecutor) -> OrmResult<bool> {
        if let Some(rows) = self.cache.get() {
            return Ok(!rows.is_empty());
        }
        let mut query = self.query.clone();
        query.select = vec![SelectColumn::Expression(
            Expression::value(1),
            "a".to_string(),
        )];
        query.annotations.clear();
        query.order_by.clear();
        query.limit = Some(1);
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_select(&query);
        tracing::debug!(sql = %sql, "running existence query");
        Ok(!db.query(&sql, &params).await?.is_empty())
    }

    /// Returns whether at least `count` rows match.
    ///
    /// When results are not materialized this fetches at most `count`
    /// primary keys rather than counting the whole table.
    pub async fn exists_at_least(&self, count: usize, db: &dyn DbExecutor) -> OrmResult<bool> {
        if let Some(rows) = self.cache.get() {
            return Ok(rows.len() >= count);
        }
        if count == 1 {
            return self.exists(db).await;
        }
        let mut query = self.query.clone();
        query.select = vec![SelectColumn::Column(M::pk_field_name().to_string())];
        query.annotations.clear();
        query.order_by.clear();
        query.limit = Some(count);
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_select(&query);
        tracing::debug!(sql = %sql, "running bounded existence query");
        Ok(db.query(&sql, &params).await?.len() >= count)
    }

    /// Returns whether `value` is present among the projected values.
    ///
    /// With a cold cache and a flat projection this runs a single
    /// existence-filtered query; otherwise it scans the materialized rows.
    /// Against a tuple projection pass a `Value::List` matching the row.
    pub async fn contains(&self, value: impl Into<Value>, db: &dyn DbExecutor) -> OrmResult<bool> {
        let value = value.into();
        if self.cache.get().is_none() && self.shape == RowShape::Flat {
            return self.clone().eq(value).exists(db).await;
        }
        let rows = self.rows(db).await?;
        Ok(rows.iter().any(|row| match self.shape {
            RowShape::Flat => row.values().first() == Some(&value),
            RowShape::Tuple => Value::List(row.values().to_vec()) == value,
        }))
    }

    /// Iterates grouped rows.
    ///
    /// Re-projects to (group fields + value fields), orders by the group
    /// fields so equal keys are contiguous, and yields one
    /// `(key, values)` pair per run of equal keys, preserving row order
    /// within each group.
    pub async fn groups(&self, db: &dyn DbExecutor) -> OrmResult<Groups> {
        let mut query = self.query.clone();
        query.select = self
            .group_fields
            .iter()
            .chain(&self.fields)
            .map(|f| SelectColumn::Column(f.clone()))
            .collect();
        query.order_by = self.group_fields.iter().map(OrderBy::asc).collect();
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_select(&query);
        tracing::debug!(sql = %sql, "running grouped query");
        let rows = db.query(&sql, &params).await?;
        Ok(Groups::new(
            rows,
            self.group_fields.len(),
            self.shape == RowShape::Flat,
        ))
    }

    /// Reduces the projected columns with aggregate functions.
    ///
    /// The functions cycle across the projection, so two fields with one
    /// function aggregate both, and two fields with `[Min, Max]` pair up
    /// positionally. With a group-by active the result is an annotated
    /// queryset of per-group aggregates; otherwise one aggregate query runs
    /// and the result is a scalar (flat projection) or a named row.
    pub async fn reduce(
        self,
        funcs: &[AggregateFunc],
        db: &dyn DbExecutor,
    ) -> OrmResult<Reduced<M>> {
        if funcs.is_empty() {
            return Err(OrmError::FieldError(
                "reduce requires at least one aggregate function".to_string(),
            ));
        }
        if self.fields.is_empty() {
            return Err(OrmError::FieldError(
                "reduce requires a column projection".to_string(),
            ));
        }
        let aggregates: Vec<(String, Expression)> = self
            .fields
            .iter()
            .zip(funcs.iter().cycle())
            .map(|(field, func)| {
                (
                    func.default_alias(field),
                    Expression::aggregate(*func, Expression::col(field.clone())),
                )
            })
            .collect();

        if !self.group_fields.is_empty() {
            let group = self.group_fields.clone();
            let mut qs = self;
            qs.query.select = group
                .iter()
                .map(|f| SelectColumn::Column(f.clone()))
                .collect();
            qs.query.group_by = group.clone();
            qs.query.annotations = aggregates;
            qs.fields = group;
            qs.shape = RowShape::Tuple;
            qs.group_fields.clear();
            qs.cache = OnceLock::new();
            return Ok(Reduced::Grouped(qs));
        }

        let mut query = self.query.clone();
        query.select = aggregates
            .into_iter()
            .map(|(alias, expr)| SelectColumn::Expression(expr, alias))
            .collect();
        query.annotations.clear();
        query.group_by.clear();
        query.order_by.clear();
        query.limit = None;
        query.offset = None;
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_select(&query);
        tracing::debug!(sql = %sql, "running aggregate query");
        let row = db.query_one(&sql, &params).await?;
        if self.shape == RowShape::Flat {
            Ok(Reduced::Scalar(row.get_by_index(0)?))
        } else {
            Ok(Reduced::Row(row))
        }
    }

    /// [`QuerySet::reduce`] with MIN.
    pub async fn min(self, db: &dyn DbExecutor) -> OrmResult<Reduced<M>> {
        self.reduce(&[AggregateFunc::Min], db).await
    }

    /// [`QuerySet::reduce`] with MAX.
    pub async fn max(self, db: &dyn DbExecutor) -> OrmResult<Reduced<M>> {
        self.reduce(&[AggregateFunc::Max], db).await
    }

    /// [`QuerySet::reduce`] with SUM.
    pub async fn sum(self, db: &dyn DbExecutor) -> OrmResult<Reduced<M>> {
        self.reduce(&[AggregateFunc::Sum], db).await
    }

    /// [`QuerySet::reduce`] with AVG.
    pub async fn mean(self, db: &dyn DbExecutor) -> OrmResult<Reduced<M>> {
        self.reduce(&[AggregateFunc::Avg], db).await
    }

    /// Runs a bulk UPDATE over the matched rows.
    ///
    /// Returns the number of rows affected.
    pub async fn update(self, fields: &[(&str, Value)], db: &dyn DbExecutor) -> OrmResult<u64> {
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_update(
            &self.query.table,
            fields,
            &self.where_clause(),
        );
        tracing::debug!(sql = %sql, "running update");
        db.execute_sql(&sql, &params).await
    }

    /// Sets a single column across all matched rows.
    pub async fn set_col(
        self,
        field: &str,
        value: impl Into<Value>,
        db: &dyn DbExecutor,
    ) -> OrmResult<u64> {
        self.update(&[(field, value.into())], db).await
    }

    /// Updates the matched rows, skipping those already in the desired state.
    ///
    /// Rows matching all of `changes` are excluded first, so the returned
    /// count is the number of rows that actually changed; use it to trigger
    /// on-change side effects without a prior fetch. `defaults` ride along
    /// in the payload but do not affect the exclusion, the usual case being
    /// a last-modified timestamp that should only move when something
    /// meaningful does.
    pub async fn modify(
        self,
        defaults: &[(&str, Value)],
        changes: &[(&str, Value)],
        db: &dyn DbExecutor,
    ) -> OrmResult<u64> {
        let mut qs = self;
        if !changes.is_empty() {
            let mut all_match = Q::filter(changes[0].0, Lookup::Exact(changes[0].1.clone()));
            for (field, value) in &changes[1..] {
                all_match = all_match & Q::filter(*field, Lookup::Exact(value.clone()));
            }
            qs = qs.exclude(all_match);
        }
        let mut payload: Vec<(&str, Value)> = defaults
            .iter()
            .filter(|(field, _)| !changes.iter().any(|(changed, _)| changed == field))
            .map(|(field, value)| (*field, value.clone()))
            .collect();
        payload.extend(changes.iter().map(|(field, value)| (*field, value.clone())));
        qs.update(&payload, db).await
    }

    /// Deletes the matched rows with a single DELETE statement.
    ///
    /// Returns the number of rows deleted.
    pub async fn remove(self, db: &dyn DbExecutor) -> OrmResult<u64> {
        let (sql, params) = SqlCompiler::new(db.backend_type())
            .compile_delete(&self.query.table, &self.where_clause());
        tracing::debug!(sql = %sql, "running delete");
        db.execute_sql(&sql, &params).await
    }
}

impl<M: Model, V: Into<Value>> ops::Add<V> for &QuerySet<M> {
    type Output = Expression;
    fn add(self, rhs: V) -> Expression {
        self.f() + Expression::value(rhs)
    }
}

impl<M: Model, V: Into<Value>> ops::Sub<V> for &QuerySet<M> {
    type Output = Expression;
    fn sub(self, rhs: V) -> Expression {
        self.f() - Expression::value(rhs)
    }
}

impl<M: Model, V: Into<Value>> ops::Mul<V> for &QuerySet<M> {
    type Output = Expression;
    fn mul(self, rhs: V) -> Expression {
        self.f() * Expression::value(rhs)
    }
}

impl<M: Model, V: Into<Value>> ops::Div<V> for &QuerySet<M> {
    type Output = Expression;
    fn div(self, rhs: V) -> Expression {
        self.f() / Expression::value(rhs)
    }
}

impl<M: Model, V: Into<Value>> ops::Rem<V> for &QuerySet<M> {
    type Output = Expression;
    fn rem(self, rhs: V) -> Expression {
        self.f() % Expression::value(rhs)
    }
}

/// The result of [`QuerySet::reduce`].
pub enum Reduced<M: Model> {
    /// Per-group aggregates as an annotated, still-lazy queryset.
    Grouped(QuerySet<M>),
    /// A single aggregate over a flat projection.
    Scalar(Value),
    /// Named aggregates over a multi-column projection.
    Row(Row),
}

impl<M: Model> Reduced<M> {
    /// Returns the scalar result, if this reduction produced one.
    pub fn into_scalar(self) -> Option<Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the named-tuple result, if this reduction produced one.
    pub fn into_row(self) -> Option<Row> {
        match self {
            Self::Row(row) => Some(row),
            _ => None,
        }
    }

    /// Returns the per-group queryset, if a group-by was active.
    pub fn into_grouped(self) -> Option<QuerySet<M>> {
        match self {
            Self::Grouped(qs) => Some(qs),
            _ => None,
        }
    }
}

/// The values of one contiguous group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupValues {
    /// Scalar values (flat projection).
    Flat(Vec<Value>),
    /// Named-tuple rows (multi-column projection).
    Rows(Vec<Row>),
}

/// Iterator over contiguous groups of pre-sorted rows.
///
/// Produced by [`QuerySet::groups`]. Each item pairs the group-key values
/// with the value columns of every row in that run.
#[derive(Debug)]
pub struct Groups {
    rows: Vec<Row>,
    pos: usize,
    key_len: usize,
    flat: bool,
}

impl Groups {
    fn new(rows: Vec<Row>, key_len: usize, flat: bool) -> Self {
        Self {
            rows,
            pos: 0,
            key_len,
            flat,
        }
    }
}

impl Iterator for Groups {
    type Item = (Vec<Value>, GroupValues);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.rows.len() {
            return None;
        }
        let start = self.pos;
        let key: Vec<Value> = self.rows[start].values()[..self.key_len].to_vec();
        let mut end = start + 1;
        while end < self.rows.len() && self.rows[end].values()[..self.key_len] == key[..] {
            end += 1;
        }
        self.pos = end;

        let members = &self.rows[start..end];
        let values = if self.flat {
            GroupValues::Flat(
                members
                    .iter()
                    .map(|row| {
                        row.values()
                            .get(self.key_len)
                            .cloned()
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
            )
        } else {
            GroupValues::Rows(
                members
                    .iter()
                    .map(|row| {
                        Row::new(
                            row.columns()[self.key_len..].to_vec(),
                            row.values()[self.key_len..].to_vec(),
                        )
                    })
                    .collect(),
            )
        };
        Some((key, values))
    }
}
