// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Parameterized predicate AST and its PostgreSQL rendering.
//!
//! Predicates never carry raw SQL. Table, alias and column names come from
//! the static [`crate::relation::Catalog`]; every filter value is a [`Value`]
//! bound as a `$n` parameter by [`SqlWriter`]. The rendered text therefore
//! never contains a byte supplied by the request.
//!
//! Null handling follows SQL three-valued logic. Negation is expressed as
//! [`Predicate::NotTrue`] (`(p) IS NOT TRUE`) so that rows where `p` is
//! NULL land on the negated side instead of disappearing from both.

use std::fmt::{self, Write as _};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A value bound to a placeholder, or stored in an in-memory row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Date(NaiveDate),
    TextArray(Vec<String>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::TextArray(v) => write!(f, "{:?}", v),
        }
    }
}

// ---------------------------------------------------------------------------
// Column references and joins
// ---------------------------------------------------------------------------

/// A column qualified by the alias of the table it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(&self.alias), quote_ident(&self.column))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
}

/// `<kind> JOIN "table" AS "alias" ON "alias"."on_column" = <other>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    pub on_column: String,
    pub other: ColumnRef,
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        write!(
            f,
            "{} {} AS {} ON {} = {}",
            kind,
            quote_ident(&self.table),
            quote_ident(&self.alias),
            ColumnRef::new(&self.alias, &self.on_column),
            self.other
        )
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean expression over the columns of one domain query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// No constraint.
    Always,
    /// Matches no rows.
    Never,
    Equals { column: ColumnRef, value: Value },
    /// Set membership; the explicit form of "any of these values".
    OneOf { column: ColumnRef, values: Vec<Value> },
    Compare { column: ColumnRef, op: CompareOp, value: Value },
    Between { column: ColumnRef, low: Value, high: Value },
    /// Case-insensitive pattern match (`ILIKE`).
    Like { column: ColumnRef, pattern: String },
    /// The array column shares at least one element with `values`.
    Overlaps { column: ColumnRef, values: Vec<String> },
    /// The array column holds exactly the elements of `values`, in any order.
    SameElements { column: ColumnRef, values: Vec<String> },
    IsNull { column: ColumnRef },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    /// `(p) IS NOT TRUE`: true when `p` is false or NULL.
    NotTrue(Box<Predicate>),
    /// `column IN (subquery)`.
    InSet { column: ColumnRef, subquery: Box<Subquery> },
}

impl Predicate {
    /// Conjunction, flattened; `Always` operands vanish and any `Never` wins.
    pub fn and(parts: Vec<Predicate>) -> Predicate {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::Always => {}
                Predicate::Never => return Predicate::Never,
                Predicate::All(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::Always,
            1 => flat.remove(0),
            _ => Predicate::All(flat),
        }
    }

    /// Disjunction, flattened; `Never` operands vanish and any `Always` wins.
    pub fn or(parts: Vec<Predicate>) -> Predicate {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::Never => {}
                Predicate::Always => return Predicate::Always,
                Predicate::Any(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::Never,
            1 => flat.remove(0),
            _ => Predicate::Any(flat),
        }
    }

    /// Null-safe complement.
    pub fn not_true(inner: Predicate) -> Predicate {
        match inner {
            Predicate::Always => Predicate::Never,
            Predicate::Never => Predicate::Always,
            other => Predicate::NotTrue(Box::new(other)),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// Render into `writer`, binding values as parameters.
    pub fn write_sql(&self, w: &mut SqlWriter) {
        match self {
            Predicate::Always => w.push("TRUE"),
            Predicate::Never => w.push("FALSE"),
            Predicate::Equals { column, value } => {
                w.push_display(column);
                w.push(" = ");
                w.bind(value.clone());
            }
            Predicate::OneOf { column, values } => {
                if values.is_empty() {
                    w.push("FALSE");
                    return;
                }
                w.push_display(column);
                w.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.bind(value.clone());
                }
                w.push(")");
            }
            Predicate::Compare { column, op, value } => {
                w.push_display(column);
                w.push(" ");
                w.push(op.symbol());
                w.push(" ");
                w.bind(value.clone());
            }
            Predicate::Between { column, low, high } => {
                w.push_display(column);
                w.push(" BETWEEN ");
                w.bind(low.clone());
                w.push(" AND ");
                w.bind(high.clone());
            }
            Predicate::Like { column, pattern } => {
                w.push_display(column);
                w.push(" ILIKE ");
                w.bind(Value::Text(pattern.clone()));
            }
            Predicate::Overlaps { column, values } => {
                w.push_display(column);
                w.push(" && ");
                w.bind(Value::TextArray(values.clone()));
                w.push("::text[]");
            }
            Predicate::SameElements { column, values } => {
                w.push("(");
                w.push_display(column);
                w.push(" @> ");
                w.bind(Value::TextArray(values.clone()));
                w.push("::text[] AND ");
                w.push_display(column);
                w.push(" <@ ");
                w.bind(Value::TextArray(values.clone()));
                w.push("::text[])");
            }
            Predicate::IsNull { column } => {
                w.push_display(column);
                w.push(" IS NULL");
            }
            Predicate::All(parts) => write_joined(w, parts, " AND "),
            Predicate::Any(parts) => write_joined(w, parts, " OR "),
            Predicate::NotTrue(inner) => {
                w.push("(");
                inner.write_sql(w);
                w.push(") IS NOT TRUE");
            }
            Predicate::InSet { column, subquery } => {
                w.push_display(column);
                w.push(" IN (");
                subquery.write_sql(w);
                w.push(")");
            }
        }
    }
}

fn write_joined(w: &mut SqlWriter, parts: &[Predicate], separator: &str) {
    w.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            w.push(separator);
        }
        part.write_sql(w);
    }
    w.push(")");
}

// ---------------------------------------------------------------------------
// Subqueries
// ---------------------------------------------------------------------------

/// Aggregate condition evaluated per root key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Having {
    /// `COALESCE(BOOL_OR(p), FALSE) = FALSE`: no related row satisfies `p`,
    /// including the case of no related rows at all.
    NoneMatch(Predicate),
    /// `COUNT(DISTINCT column) <op> value`.
    Count {
        column: ColumnRef,
        op: CompareOp,
        value: i64,
    },
}

/// A subquery projecting the distinct primary keys of a root table.
///
/// Without `having` it renders `SELECT DISTINCT`; with `having` it groups by
/// the key. Either way each key appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subquery {
    pub table: String,
    pub alias: String,
    pub key: String,
    pub joins: Vec<JoinClause>,
    pub filter: Predicate,
    pub having: Option<Having>,
}

impl Subquery {
    pub fn key_column(&self) -> ColumnRef {
        ColumnRef::new(&self.alias, &self.key)
    }

    pub fn write_sql(&self, w: &mut SqlWriter) {
        let key = self.key_column();
        if self.having.is_some() {
            w.push("SELECT ");
        } else {
            w.push("SELECT DISTINCT ");
        }
        w.push_display(&key);
        w.push(" FROM ");
        w.push(&quote_ident(&self.table));
        w.push(" AS ");
        w.push(&quote_ident(&self.alias));
        for join in &self.joins {
            w.push(" ");
            w.push_display(join);
        }
        if !self.filter.is_always() {
            w.push(" WHERE ");
            self.filter.write_sql(w);
        }
        if let Some(having) = &self.having {
            w.push(" GROUP BY ");
            w.push_display(&key);
            w.push(" HAVING ");
            match having {
                Having::NoneMatch(p) => {
                    w.push("COALESCE(BOOL_OR(");
                    p.write_sql(w);
                    w.push("), FALSE) = FALSE");
                }
                Having::Count { column, op, value } => {
                    w.push("COUNT(DISTINCT ");
                    w.push_display(column);
                    w.push(") ");
                    w.push(op.symbol());
                    w.push(" ");
                    w.bind(Value::Int(*value));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Accumulates SQL text and the parameters bound to its `$n` placeholders.
#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn push_display(&mut self, item: &impl fmt::Display) {
        // Writing into a String cannot fail.
        let _ = write!(self.sql, "{}", item);
    }

    /// Append a placeholder for `value`.
    pub fn bind(&mut self, value: Value) {
        self.params.push(value);
        let _ = write!(self.sql, "${}", self.params.len());
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
