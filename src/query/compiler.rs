//! SQL query AST and compiler.
//!
//! [`Query`] is the AST a [`QuerySet`](crate::query::queryset::QuerySet)
//! accumulates lazily; [`SqlCompiler`] renders it as parameterized SQL.
//! PostgreSQL gets `$1, $2, ...` placeholders, SQLite and MySQL get `?`.

use super::expressions::Expression;
use super::lookups::{Lookup, Q};
use crate::error::OrmError;
use crate::value::Value;

/// The database dialect to compile for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackendType {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    PostgreSQL,
    /// SQLite (uses `?` placeholders).
    SQLite,
    /// MySQL (uses `?` placeholders).
    MySQL,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The column to order by.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl OrderBy {
    /// An ascending term.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// A descending term.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// A plain column name.
    Column(String),
    /// An aliased expression.
    Expression(Expression, String),
    /// All columns (`*`).
    Star,
}

/// A node of the WHERE tree.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    /// A single condition.
    Condition {
        /// The column name.
        column: String,
        /// The lookup type.
        lookup: Lookup,
    },
    /// Logical AND of conditions.
    And(Vec<WhereNode>),
    /// Logical OR of conditions.
    Or(Vec<WhereNode>),
    /// Logical NOT of a condition.
    Not(Box<WhereNode>),
}

impl WhereNode {
    /// Lowers a [`Q`] filter tree into the compiler's representation.
    pub fn from_q(q: &Q) -> Self {
        match q {
            Q::Filter { field, lookup } => Self::Condition {
                column: field.clone(),
                lookup: lookup.clone(),
            },
            Q::And(children) => Self::And(children.iter().map(Self::from_q).collect()),
            Q::Or(children) => Self::Or(children.iter().map(Self::from_q).collect()),
            Q::Not(inner) => Self::Not(Box::new(Self::from_q(inner))),
        }
    }
}

/// The AST of a SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The main table name.
    pub table: String,
    /// Columns to select.
    pub select: Vec<SelectColumn>,
    /// WHERE clause.
    pub where_clause: Option<WhereNode>,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// GROUP BY columns.
    pub group_by: Vec<String>,
    /// LIMIT.
    pub limit: Option<usize>,
    /// OFFSET.
    pub offset: Option<usize>,
    /// DISTINCT flag.
    pub distinct: bool,
    /// Computed columns, emitted after the select list in registration
    /// order so generated SQL is stable.
    pub annotations: Vec<(String, Expression)>,
}

impl Query {
    /// A `SELECT * FROM table` query with nothing else set.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: vec![SelectColumn::Star],
            where_clause: None,
            order_by: Vec::new(),
            group_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            annotations: Vec::new(),
        }
    }
}

/// A result row: column names paired with values.
///
/// Also serves as the "named tuple" shape for multi-column projections and
/// aggregate results.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Pairs column names with values.
    ///
    /// # Panics
    ///
    /// Panics when the two lengths disagree.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// The column names, in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The raw values, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Extracts a typed value by column name.
    ///
    /// # Errors
    ///
    /// Fails when the column is absent or the value does not convert.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, OrmError> {
        let value = self
            .get_value(column)
            .ok_or_else(|| OrmError::DatabaseError(format!("Column '{column}' not found in row")))?;
        T::from_value(value)
    }

    /// Extracts a typed value by position.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range or the value does not convert.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> Result<T, OrmError> {
        let value = self.values.get(idx).ok_or_else(|| {
            OrmError::DatabaseError(format!(
                "Column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }

    /// The raw value under the given column name, if present.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Conversion from a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts the conversion from a borrowed value.
    fn from_value(value: &Value) -> Result<Self, OrmError>;
}

fn type_mismatch(expected: &str, got: &Value) -> OrmError {
    OrmError::DatabaseError(format!("Expected {expected}, got {got:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        value.as_int().ok_or_else(|| type_mismatch("Int", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        let wide = value.as_int().ok_or_else(|| type_mismatch("Int", value))?;
        Self::try_from(wide)
            .map_err(|e| OrmError::DatabaseError(format!("Int value out of i32 range: {e}")))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        match value {
            Value::Float(x) => Ok(*x),
            Value::Int(i) => Ok(*i as Self),
            other => Err(type_mismatch("Float", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        value.as_bool().ok_or_else(|| type_mismatch("Bool", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        value
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| type_mismatch("String", value))
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        match value {
            Value::Uuid(u) => Ok(*u),
            other => Err(type_mismatch("Uuid", other)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, OrmError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

fn quote(name: &str) -> String {
    format!("\"{name}\"")
}

/// Renders a [`Query`] AST as parameterized SQL.
pub struct SqlCompiler {
    backend: DatabaseBackendType,
}

impl SqlCompiler {
    /// A compiler for the given dialect.
    pub const fn new(backend: DatabaseBackendType) -> Self {
        Self { backend }
    }

    fn placeholder(&self, index: usize) -> String {
        match self.backend {
            DatabaseBackendType::PostgreSQL => format!("${index}"),
            DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => "?".to_string(),
        }
    }

    /// Appends `value` to the parameter list and returns its placeholder.
    fn bind(&self, value: Value, params: &mut Vec<Value>) -> String {
        params.push(value);
        self.placeholder(params.len())
    }

    /// Compiles a SELECT statement.
    pub fn compile_select(&self, query: &Query) -> (String, Vec<Value>) {
        let mut params: Vec<Value> = Vec::new();
        let mut sql = String::from("SELECT ");

        if query.distinct {
            sql.push_str("DISTINCT ");
        }

        let mut select_parts: Vec<String> = if query.select.is_empty() {
            vec!["*".to_string()]
        } else {
            query
                .select
                .iter()
                .map(|entry| match entry {
                    SelectColumn::Column(name) => quote(name),
                    SelectColumn::Expression(expr, alias) => {
                        let rendered = self.compile_expression(expr, &mut params);
                        format!("{rendered} AS {}", quote(alias))
                    }
                    SelectColumn::Star => "*".to_string(),
                })
                .collect()
        };
        for (alias, expr) in &query.annotations {
            let rendered = self.compile_expression(expr, &mut params);
            select_parts.push(format!("{rendered} AS {}", quote(alias)));
        }
        sql.push_str(&select_parts.join(", "));

        sql.push_str(&format!(" FROM {}", quote(&query.table)));

        if let Some(ref node) = query.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_where_node(node, &mut params));
        }

        if !query.group_by.is_empty() {
            let cols: Vec<String> = query.group_by.iter().map(|c| quote(c)).collect();
            sql.push_str(&format!(" GROUP BY {}", cols.join(", ")));
        }

        if !query.order_by.is_empty() {
            let terms: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let direction = if o.descending { "DESC" } else { "ASC" };
                    format!("{} {direction}", quote(&o.column))
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        (sql, params)
    }

    /// Compiles an UPDATE statement.
    pub fn compile_update(
        &self,
        table: &str,
        fields: &[(&str, Value)],
        where_clause: &WhereNode,
    ) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let assignments: Vec<String> = fields
            .iter()
            .map(|(name, val)| {
                let ph = self.bind(val.clone(), &mut params);
                format!("{} = {ph}", quote(name))
            })
            .collect();

        let predicate = self.compile_where_node(where_clause, &mut params);
        let sql = format!(
            "UPDATE {} SET {} WHERE {predicate}",
            quote(table),
            assignments.join(", ")
        );
        (sql, params)
    }

    /// Compiles a DELETE statement.
    pub fn compile_delete(&self, table: &str, where_clause: &WhereNode) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let predicate = self.compile_where_node(where_clause, &mut params);
        let sql = format!("DELETE FROM {} WHERE {predicate}", quote(table));
        (sql, params)
    }

    fn compile_where_node(&self, node: &WhereNode, params: &mut Vec<Value>) -> String {
        match node {
            WhereNode::Condition { column, lookup } => {
                self.compile_lookup(column, lookup, params)
            }
            WhereNode::And(children) if children.is_empty() => "1=1".to_string(),
            WhereNode::Or(children) if children.is_empty() => "1=0".to_string(),
            WhereNode::And(children) => {
                let parts: Vec<String> = children
                    .iter()
                    .map(|child| self.compile_where_node(child, params))
                    .collect();
                format!("({})", parts.join(" AND "))
            }
            WhereNode::Or(children) => {
                let parts: Vec<String> = children
                    .iter()
                    .map(|child| self.compile_where_node(child, params))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            WhereNode::Not(inner) => {
                format!("NOT ({})", self.compile_where_node(inner, params))
            }
        }
    }

    /// Renders `column op placeholder` for the simple comparison lookups.
    fn comparison(&self, column: &str, op: &str, value: &Value, params: &mut Vec<Value>) -> String {
        let ph = self.bind(value.clone(), params);
        format!("{} {op} {ph}", quote(column))
    }

    /// Renders a LIKE (or dialect-appropriate case-insensitive LIKE) match.
    fn like(
        &self,
        column: &str,
        pattern: String,
        case_insensitive: bool,
        params: &mut Vec<Value>,
    ) -> String {
        let ph = self.bind(Value::String(pattern), params);
        if !case_insensitive {
            format!("{} LIKE {ph}", quote(column))
        } else if self.backend == DatabaseBackendType::PostgreSQL {
            format!("{} ILIKE {ph}", quote(column))
        } else {
            format!("LOWER({}) LIKE LOWER({ph})", quote(column))
        }
    }

    fn compile_lookup(&self, column: &str, lookup: &Lookup, params: &mut Vec<Value>) -> String {
        match lookup {
            Lookup::Exact(val) if val.is_null() => format!("{} IS NULL", quote(column)),
            Lookup::Exact(val) => self.comparison(column, "=", val, params),
            Lookup::Gt(val) => self.comparison(column, ">", val, params),
            Lookup::Gte(val) => self.comparison(column, ">=", val, params),
            Lookup::Lt(val) => self.comparison(column, "<", val, params),
            Lookup::Lte(val) => self.comparison(column, "<=", val, params),
            Lookup::IExact(val) => {
                let ph = self.bind(val.clone(), params);
                format!("LOWER({}) = LOWER({ph})", quote(column))
            }
            Lookup::Contains(s) => self.like(column, format!("%{s}%"), false, params),
            Lookup::IContains(s) => self.like(column, format!("%{s}%"), true, params),
            Lookup::StartsWith(s) => self.like(column, format!("{s}%"), false, params),
            Lookup::IStartsWith(s) => self.like(column, format!("{s}%"), true, params),
            Lookup::EndsWith(s) => self.like(column, format!("%{s}"), false, params),
            Lookup::IEndsWith(s) => self.like(column, format!("%{s}"), true, params),
            Lookup::In(vals) => {
                let placeholders: Vec<String> = vals
                    .iter()
                    .map(|v| self.bind(v.clone(), params))
                    .collect();
                format!("{} IN ({})", quote(column), placeholders.join(", "))
            }
            Lookup::Range(low, high) => {
                let ph_low = self.bind(low.clone(), params);
                let ph_high = self.bind(high.clone(), params);
                format!("{} BETWEEN {ph_low} AND {ph_high}", quote(column))
            }
            Lookup::IsNull(true) => format!("{} IS NULL", quote(column)),
            Lookup::IsNull(false) => format!("{} IS NOT NULL", quote(column)),
            Lookup::Search(term) => match self.backend {
                DatabaseBackendType::PostgreSQL => {
                    let ph = self.bind(Value::String(term.clone()), params);
                    format!("to_tsvector({}) @@ plainto_tsquery({ph})", quote(column))
                }
                DatabaseBackendType::MySQL => {
                    let ph = self.bind(Value::String(term.clone()), params);
                    format!("MATCH ({}) AGAINST ({ph})", quote(column))
                }
                // No full-text engine to lean on; degrade to substring match.
                DatabaseBackendType::SQLite => self.like(column, format!("%{term}%"), false, params),
            },
            Lookup::Regex(pattern) => {
                let ph = self.bind(Value::String(pattern.clone()), params);
                match self.backend {
                    DatabaseBackendType::PostgreSQL => format!("{} ~ {ph}", quote(column)),
                    _ => format!("{} REGEXP {ph}", quote(column)),
                }
            }
            Lookup::IRegex(pattern) => {
                let ph = self.bind(Value::String(pattern.clone()), params);
                match self.backend {
                    DatabaseBackendType::PostgreSQL => format!("{} ~* {ph}", quote(column)),
                    _ => format!("{} REGEXP {ph}", quote(column)),
                }
            }
            Lookup::Custom { template, value } => {
                let ph = self.bind(value.clone(), params);
                template
                    .replace("{column}", &quote(column))
                    .replace("{value}", &ph)
            }
        }
    }

    fn compile_expression(&self, expr: &Expression, params: &mut Vec<Value>) -> String {
        match expr {
            Expression::Col(name) if name == "*" => "*".to_string(),
            Expression::Col(name) | Expression::F(name) => quote(name),
            Expression::Value(val) => self.bind(val.clone(), params),
            Expression::Func { name, args } => {
                let rendered: Vec<String> = args
                    .iter()
                    .map(|a| self.compile_expression(a, params))
                    .collect();
                format!("{name}({})", rendered.join(", "))
            }
            Expression::Aggregate {
                func,
                field,
                distinct,
            } => {
                let inner = self.compile_expression(field, params);
                let prefix = if *distinct { "DISTINCT " } else { "" };
                format!("{}({prefix}{inner})", func.sql_name())
            }
            Expression::Add(l, r) => self.binary_expression(l, "+", r, params),
            Expression::Sub(l, r) => self.binary_expression(l, "-", r, params),
            Expression::Mul(l, r) => self.binary_expression(l, "*", r, params),
            Expression::Div(l, r) => self.binary_expression(l, "/", r, params),
            Expression::Mod(l, r) => self.binary_expression(l, "%", r, params),
            Expression::Pow(l, r) => {
                let lhs = self.compile_expression(l, params);
                let rhs = self.compile_expression(r, params);
                format!("POWER({lhs}, {rhs})")
            }
        }
    }

    fn binary_expression(
        &self,
        left: &Expression,
        op: &str,
        right: &Expression,
        params: &mut Vec<Value>,
    ) -> String {
        let lhs = self.compile_expression(left, params);
        let rhs = self.compile_expression(right, params);
        format!("({lhs} {op} {rhs})")
    }
}
