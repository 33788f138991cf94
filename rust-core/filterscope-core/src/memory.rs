// SPDX-License-Identifier: PMPL-1.0-or-later
//! In-memory reference executor.
//!
//! Evaluates a compiled [`Scope`] against rows held in memory with the same
//! semantics PostgreSQL applies to the rendered SQL:
//!
//! - extra joins are real nested-loop LEFT JOINs, so a join that fans out
//!   shows up as repeated root keys
//! - predicates use three-valued logic (`None` is SQL NULL)
//! - subqueries honor DISTINCT, GROUP BY and HAVING
//! - `ILIKE` is case-insensitive with `%`, `_` and backslash escapes

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ScopeError;
use crate::scope::Scope;
use crate::sql::{ColumnRef, CompareOp, Having, JoinClause, JoinKind, Predicate, Subquery, Value};
use crate::Domain;

/// One stored row, keyed by column name. Absent columns read as NULL.
pub type Row = BTreeMap<String, Value>;

/// Alias bindings of one joined row; `None` is a NULL-extended LEFT JOIN side.
type Env<'a> = BTreeMap<&'a str, Option<&'a Row>>;

/// Tables of rows, for tests and tooling that need to execute scopes.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: BTreeMap<String, Vec<Row>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to `table`.
    pub fn insert<I, K>(&mut self, table: &str, columns: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let row: Row = columns.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of the root rows of `domain` the scope selects, one entry per
    /// output row of `SELECT root.id FROM root <extra joins> WHERE <predicate>`.
    pub fn select(&self, domain: Domain, scope: &Scope) -> Result<Vec<i64>, ScopeError> {
        let root = domain.root_table();
        let envs = self.joined(root, root, &scope.extra_joins)?;
        let mut ids = Vec::new();
        for env in &envs {
            if self.eval(&scope.predicate, env)? == Some(true) {
                match lookup(env, &ColumnRef::new(root, "id"))? {
                    Value::Int(id) => ids.push(id),
                    other => {
                        return Err(ScopeError::Configuration(format!(
                            "{} row has non-integer id {}",
                            root, other
                        )))
                    }
                }
            }
        }
        Ok(ids)
    }

    /// FROM `table` AS `alias` followed by `joins`.
    fn joined<'a>(
        &'a self,
        table: &str,
        alias: &'a str,
        joins: &'a [JoinClause],
    ) -> Result<Vec<Env<'a>>, ScopeError> {
        let mut envs: Vec<Env<'a>> = self
            .rows(table)
            .iter()
            .map(|row| {
                let mut env = Env::new();
                env.insert(alias, Some(row));
                env
            })
            .collect();

        for join in joins {
            let mut next = Vec::with_capacity(envs.len());
            for env in envs {
                let outer = lookup(&env, &join.other)?;
                let matches: Vec<&'a Row> = if outer.is_null() {
                    Vec::new()
                } else {
                    self.rows(&join.table)
                        .iter()
                        .filter(|row| row.get(&join.on_column) == Some(&outer))
                        .collect()
                };
                if matches.is_empty() {
                    if join.kind == JoinKind::Left {
                        let mut extended = env.clone();
                        extended.insert(join.alias.as_str(), None);
                        next.push(extended);
                    }
                    continue;
                }
                for row in matches {
                    let mut extended = env.clone();
                    extended.insert(join.alias.as_str(), Some(row));
                    next.push(extended);
                }
            }
            envs = next;
        }
        Ok(envs)
    }

    fn eval(&self, predicate: &Predicate, env: &Env<'_>) -> Result<Option<bool>, ScopeError> {
        Ok(match predicate {
            Predicate::Always => Some(true),
            Predicate::Never => Some(false),
            Predicate::Equals { column, value } => {
                compare(&lookup(env, column)?, value).map(|o| o == Ordering::Equal)
            }
            Predicate::OneOf { column, values } => {
                let v = lookup(env, column)?;
                any(values.iter().map(|candidate| {
                    compare(&v, candidate).map(|o| o == Ordering::Equal)
                }))
            }
            Predicate::Compare { column, op, value } => {
                compare(&lookup(env, column)?, value).map(|o| holds(*op, o))
            }
            Predicate::Between { column, low, high } => {
                let v = lookup(env, column)?;
                all([
                    compare(&v, low).map(|o| o != Ordering::Less),
                    compare(&v, high).map(|o| o != Ordering::Greater),
                ])
            }
            Predicate::Like { column, pattern } => match lookup(env, column)? {
                Value::Text(s) => Some(ilike(&s, pattern)),
                _ => None,
            },
            Predicate::Overlaps { column, values } => match lookup(env, column)? {
                Value::TextArray(items) => Some(items.iter().any(|i| values.contains(i))),
                _ => None,
            },
            Predicate::SameElements { column, values } => match lookup(env, column)? {
                Value::TextArray(items) => Some(
                    items.iter().all(|i| values.contains(i))
                        && values.iter().all(|v| items.contains(v)),
                ),
                _ => None,
            },
            Predicate::IsNull { column } => Some(lookup(env, column)?.is_null()),
            Predicate::All(parts) => {
                let mut results = Vec::with_capacity(parts.len());
                for part in parts {
                    results.push(self.eval(part, env)?);
                }
                all(results)
            }
            Predicate::Any(parts) => {
                let mut results = Vec::with_capacity(parts.len());
                for part in parts {
                    results.push(self.eval(part, env)?);
                }
                any(results)
            }
            Predicate::NotTrue(inner) => Some(self.eval(inner, env)? != Some(true)),
            Predicate::InSet { column, subquery } => {
                let v = lookup(env, column)?;
                if v.is_null() {
                    None
                } else {
                    Some(self.subquery_keys(subquery)?.contains(&v))
                }
            }
        })
    }

    fn subquery_keys(&self, subquery: &Subquery) -> Result<BTreeSet<Value>, ScopeError> {
        let key = subquery.key_column();
        let envs = self.joined(&subquery.table, &subquery.alias, &subquery.joins)?;

        let mut groups: BTreeMap<Value, Vec<Env<'_>>> = BTreeMap::new();
        for env in envs {
            if self.eval(&subquery.filter, &env)? == Some(true) {
                let k = lookup(&env, &key)?;
                groups.entry(k).or_default().push(env);
            }
        }

        let mut keys = BTreeSet::new();
        for (k, members) in groups {
            let keep = match &subquery.having {
                None => true,
                Some(Having::NoneMatch(p)) => {
                    let mut matched = false;
                    for env in &members {
                        if self.eval(p, env)? == Some(true) {
                            matched = true;
                            break;
                        }
                    }
                    !matched
                }
                Some(Having::Count { column, op, value }) => {
                    let mut distinct = BTreeSet::new();
                    for env in &members {
                        let v = lookup(env, column)?;
                        if !v.is_null() {
                            distinct.insert(v);
                        }
                    }
                    holds(*op, (distinct.len() as i64).cmp(value))
                }
            };
            if keep && !k.is_null() {
                keys.insert(k);
            }
        }
        Ok(keys)
    }
}

fn lookup(env: &Env<'_>, column: &ColumnRef) -> Result<Value, ScopeError> {
    match env.get(column.alias.as_str()) {
        Some(Some(row)) => Ok(row.get(&column.column).cloned().unwrap_or(Value::Null)),
        Some(None) => Ok(Value::Null),
        None => Err(ScopeError::Configuration(format!(
            "predicate references unbound alias {}",
            column.alias
        ))),
    }
}

/// SQL comparison; NULL or mismatched types compare as unknown.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::TextArray(x), Value::TextArray(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn holds(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

/// Three-valued AND.
fn all(results: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for r in results {
        match r {
            Some(false) => return Some(false),
            None => unknown = true,
            Some(true) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(true)
    }
}

/// Three-valued OR.
fn any(results: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for r in results {
        match r {
            Some(true) => return Some(true),
            None => unknown = true,
            Some(false) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Any,
    One,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        });
    }
    tokens
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Case-insensitive `LIKE`.
fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(fold).collect();
    let tokens = tokenize(pattern);
    // matches[i] is true when tokens[..t] can match text[..i].
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Any => {
                let mut reachable = false;
                for i in 0..=text.len() {
                    reachable |= matches[i];
                    next[i] = reachable;
                }
            }
            Token::One => {
                for i in 0..text.len() {
                    next[i + 1] = matches[i];
                }
            }
            Token::Literal(c) => {
                let c = fold(c);
                for i in 0..text.len() {
                    next[i + 1] = matches[i] && text[i] == c;
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(id: i64, region: i64) -> Vec<(&'static str, Value)> {
        vec![("id", Value::Int(id)), ("regionId", Value::Int(region))]
    }

    fn goal(id: i64, grant_id: i64, name: &str) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Int(id)),
            ("grantId", Value::Int(grant_id)),
            ("name", Value::text(name)),
        ]
    }

    #[test]
    fn test_ilike() {
        assert!(ilike("Eat the PIG", "%pig%"));
        assert!(ilike("a pig", "%_pig%"));
        assert!(!ilike("pig", "%_pig%"));
        assert!(ilike("50% off", r"%50\%%"));
        assert!(!ilike("500 off", r"%50\%%"));
        assert!(ilike("", "%"));
        assert!(!ilike("abc", "ab"));
    }

    #[test]
    fn test_three_valued_connectives() {
        assert_eq!(all([Some(true), None]), None);
        assert_eq!(all([None, Some(false)]), Some(false));
        assert_eq!(any([Some(false), None]), None);
        assert_eq!(any([None, Some(true)]), Some(true));
    }

    #[test]
    fn test_fan_out_join_duplicates_rows() {
        let mut db = MemoryDatabase::new();
        db.insert("Grants", grant(1, 1));
        db.insert("Goals", goal(10, 1, "a"));
        db.insert("Goals", goal(11, 1, "b"));
        let scope = Scope {
            predicate: Predicate::Always,
            extra_joins: vec![JoinClause {
                kind: JoinKind::Left,
                table: "Goals".to_string(),
                alias: "goals".to_string(),
                on_column: "grantId".to_string(),
                other: ColumnRef::new("Grants", "id"),
            }],
        };
        assert_eq!(db.select(Domain::Grant, &scope).unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_null_comparison_is_unknown() {
        let mut db = MemoryDatabase::new();
        db.insert("Grants", grant(1, 1));
        db.insert("Grants", vec![("id", Value::Int(2))]);
        let equals = Predicate::Equals {
            column: ColumnRef::new("Grants", "regionId"),
            value: Value::Int(1),
        };
        let include = Scope {
            predicate: equals.clone(),
            extra_joins: vec![],
        };
        let exclude = Scope {
            predicate: Predicate::not_true(equals),
            extra_joins: vec![],
        };
        assert_eq!(db.select(Domain::Grant, &include).unwrap(), vec![1]);
        assert_eq!(db.select(Domain::Grant, &exclude).unwrap(), vec![2]);
    }

    #[test]
    fn test_unbound_alias_is_an_error() {
        let mut db = MemoryDatabase::new();
        db.insert("Grants", grant(1, 1));
        let scope = Scope {
            predicate: Predicate::IsNull {
                column: ColumnRef::new("nowhere", "x"),
            },
            extra_joins: vec![],
        };
        assert!(db.select(Domain::Grant, &scope).is_err());
    }
}
