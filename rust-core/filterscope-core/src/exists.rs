// SPDX-License-Identifier: PMPL-1.0-or-later
//! Association existence predicates.
//!
//! Turns a value predicate over the terminal table of a [`RelationPath`]
//! into a predicate over the root table that never multiplies root rows:
//!
//! - zero hops: the comparison itself
//! - many-to-one hops only: the comparison on the joined alias, with the
//!   joins handed back as `extra_joins`
//! - any one-to-many hop: `root.pk IN (subquery)` where the subquery yields
//!   each qualifying key once
//!
//! Include and exclude are exact complements over the root table. A root row
//! with no related rows is excluded by include and kept by exclude.

use serde::{Deserialize, Serialize};

use crate::relation::RelationPath;
use crate::sql::{ColumnRef, CompareOp, Having, JoinClause, JoinKind, Predicate, Subquery};

/// Alias of the root table inside generated subqueries.
pub const SUBQUERY_ROOT: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Root rows with at least one related row satisfying the predicate.
    Include,
    /// Root rows with no related row satisfying the predicate.
    Exclude,
}

/// A root-level predicate and the joins it reads through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub predicate: Predicate,
    /// LEFT JOINs the outer query must add; each is many-to-one so the row
    /// count is unchanged.
    pub extra_joins: Vec<JoinClause>,
}

impl Association {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            extra_joins: Vec::new(),
        }
    }

    pub fn with_joins(predicate: Predicate, extra_joins: Vec<JoinClause>) -> Self {
        Self {
            predicate,
            extra_joins,
        }
    }
}

/// Append `joins` to `into`, skipping aliases already present.
pub fn merge_joins(into: &mut Vec<JoinClause>, joins: impl IntoIterator<Item = JoinClause>) {
    for join in joins {
        if !into.iter().any(|j| j.alias == join.alias) {
            into.push(join);
        }
    }
}

fn outer_key(path: &RelationPath) -> ColumnRef {
    ColumnRef::new(path.root_table(), path.root_key())
}

fn key_subquery(
    path: &RelationPath,
    kind: JoinKind,
    filter: Predicate,
    having: Option<Having>,
) -> Subquery {
    Subquery {
        table: path.root_table().to_string(),
        alias: SUBQUERY_ROOT.to_string(),
        key: path.root_key().to_string(),
        joins: path.joins(SUBQUERY_ROOT, kind),
        filter,
        having,
    }
}

/// Root-level predicate for "some related row along `path` satisfies
/// `value`" or its complement.
pub fn exists_along_path(path: &RelationPath, value: Predicate, mode: Mode) -> Association {
    if !path.fans_out() {
        let predicate = match mode {
            Mode::Include => value,
            Mode::Exclude => Predicate::not_true(value),
        };
        // Zero hops yield no joins.
        let joins = path.joins(path.root_table(), JoinKind::Left);
        return Association::with_joins(predicate, joins);
    }

    let subquery = match mode {
        Mode::Include => key_subquery(path, JoinKind::Inner, value, None),
        Mode::Exclude => key_subquery(
            path,
            JoinKind::Left,
            Predicate::Always,
            Some(Having::NoneMatch(value)),
        ),
    };
    Association::new(Predicate::InSet {
        column: outer_key(path),
        subquery: Box::new(subquery),
    })
}

/// Existence along any of several `(path, value predicate)` targets.
///
/// Include is the OR of the per-path includes; exclude is the AND of the
/// per-path excludes, its complement.
pub fn exists_along_any<'p, I>(targets: I, mode: Mode) -> Association
where
    I: IntoIterator<Item = (&'p RelationPath, Predicate)>,
{
    let mut predicates = Vec::new();
    let mut extra_joins = Vec::new();
    for (path, value) in targets {
        let association = exists_along_path(path, value, mode);
        predicates.push(association.predicate);
        merge_joins(&mut extra_joins, association.extra_joins);
    }
    let predicate = match mode {
        Mode::Include => Predicate::or(predicates),
        Mode::Exclude => Predicate::and(predicates),
    };
    Association::with_joins(predicate, extra_joins)
}

/// Root rows whose number of distinct related rows along `path` compares to
/// `n` with `op`. Rows with no related rows count zero.
pub fn count_along_path(path: &RelationPath, op: CompareOp, n: i64) -> Association {
    let having = Having::Count {
        column: path.terminal_key(),
        op,
        value: n,
    };
    let subquery = key_subquery(path, JoinKind::Left, Predicate::Always, Some(having));
    Association::new(Predicate::InSet {
        column: outer_key(path),
        subquery: Box::new(subquery),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Catalog;
    use crate::sql::{SqlWriter, Value};

    fn render(p: &Predicate) -> String {
        let mut w = SqlWriter::new();
        p.write_sql(&mut w);
        w.finish().0
    }

    fn catalog() -> Catalog {
        Catalog::standard().unwrap()
    }

    fn like(column: ColumnRef) -> Predicate {
        Predicate::Like {
            column,
            pattern: "%pig%".to_string(),
        }
    }

    #[test]
    fn test_zero_hop_is_plain_comparison() {
        let path = catalog().path("Goals", &[]).unwrap();
        let value = like(path.terminal_column("name"));
        let include = exists_along_path(&path, value.clone(), Mode::Include);
        assert_eq!(include.predicate, value);
        assert!(include.extra_joins.is_empty());
        let exclude = exists_along_path(&path, value.clone(), Mode::Exclude);
        assert_eq!(exclude.predicate, Predicate::NotTrue(Box::new(value)));
    }

    #[test]
    fn test_many_to_one_uses_left_joins() {
        let path = catalog().path("Grants", &["recipient"]).unwrap();
        let value = like(path.terminal_column("name"));
        let include = exists_along_path(&path, value, Mode::Include);
        assert_eq!(include.extra_joins.len(), 1);
        assert_eq!(
            include.extra_joins[0].to_string(),
            r#"LEFT JOIN "Recipients" AS "recipient" ON "recipient"."id" = "Grants"."recipientId""#
        );
        assert_eq!(render(&include.predicate), r#""recipient"."name" ILIKE $1"#);
    }

    #[test]
    fn test_fan_out_include_projects_distinct_keys() {
        let path = catalog().path("Grants", &["goals"]).unwrap();
        let value = like(path.terminal_column("name"));
        let include = exists_along_path(&path, value, Mode::Include);
        assert!(include.extra_joins.is_empty());
        assert_eq!(
            render(&include.predicate),
            r#""Grants"."id" IN (SELECT DISTINCT "root"."id" FROM "Grants" AS "root" INNER JOIN "Goals" AS "goals" ON "goals"."grantId" = "root"."id" WHERE "goals"."name" ILIKE $1)"#
        );
    }

    #[test]
    fn test_fan_out_exclude_never_uses_not_in() {
        let path = catalog().path("Grants", &["goals"]).unwrap();
        let value = like(path.terminal_column("name"));
        let exclude = exists_along_path(&path, value, Mode::Exclude);
        let sql = render(&exclude.predicate);
        assert!(!sql.contains("NOT IN"));
        assert_eq!(
            sql,
            r#""Grants"."id" IN (SELECT "root"."id" FROM "Grants" AS "root" LEFT JOIN "Goals" AS "goals" ON "goals"."grantId" = "root"."id" GROUP BY "root"."id" HAVING COALESCE(BOOL_OR("goals"."name" ILIKE $1), FALSE) = FALSE)"#
        );
    }

    #[test]
    fn test_any_combines_with_or_and_and() {
        let catalog = catalog();
        let author = catalog.path("ActivityReports", &["author"]).unwrap();
        let collaborators = catalog
            .path("ActivityReports", &["collaborators", "user"])
            .unwrap();
        let targets = || {
            [&author, &collaborators]
                .into_iter()
                .map(|p| (p, like(p.terminal_column("name"))))
        };

        let include = exists_along_any(targets(), Mode::Include);
        assert!(matches!(include.predicate, Predicate::Any(ref v) if v.len() == 2));
        assert_eq!(include.extra_joins.len(), 1);

        let exclude = exists_along_any(targets(), Mode::Exclude);
        match exclude.predicate {
            Predicate::All(parts) => {
                assert!(matches!(parts[0], Predicate::NotTrue(_)));
                assert!(matches!(parts[1], Predicate::InSet { .. }));
            }
            other => panic!("expected conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_count_groups_by_root_key() {
        let path = catalog()
            .path("ActivityReports", &["activityRecipients"])
            .unwrap();
        let association = count_along_path(&path, CompareOp::Gt, 1);
        let mut w = SqlWriter::new();
        association.predicate.write_sql(&mut w);
        let (sql, params) = w.finish();
        assert_eq!(
            sql,
            r#""ActivityReports"."id" IN (SELECT "root"."id" FROM "ActivityReports" AS "root" LEFT JOIN "ActivityRecipients" AS "activityRecipients" ON "activityRecipients"."activityReportId" = "root"."id" GROUP BY "root"."id" HAVING COUNT(DISTINCT "activityRecipients"."id") > $1)"#
        );
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_merge_joins_dedupes_by_alias() {
        let path = catalog().path("Goals", &["grant"]).unwrap();
        let mut joins = path.joins("Goals", JoinKind::Left);
        merge_joins(&mut joins, path.joins("Goals", JoinKind::Left));
        assert_eq!(joins.len(), 1);
    }
}
