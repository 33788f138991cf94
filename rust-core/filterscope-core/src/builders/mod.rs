// SPDX-License-Identifier: PMPL-1.0-or-later
//! Predicate builders.
//!
//! One builder per `(domain, topic)`, registered per domain through
//! `rules()`. A builder reads only its [`FilterArgs`] and the immutable
//! [`BuildContext`]; it sanitizes the value, picks a relation path and hands
//! the value predicate to [`crate::exists`].
//!
//! Builders return [`Built`], so sanitization failures propagate with `?`
//! as a [`Rejection`] carrying the policy that decides its effect.

pub mod activity_report;
pub mod goal;
pub mod grant;
pub mod recipient;
pub mod training_report;

use crate::compile::CompileOptions;
use crate::config::{CompilerConfig, RejectionPolicy, Vocabulary};
use crate::dispatch::Condition;
use crate::exists::{exists_along_any, exists_along_path, Association, Mode};
use crate::filters::FilterValue;
use crate::relation::{RelationPath, RelationPaths};
use crate::sanitize::{sanitize, DateWindow, RejectReason, Rejected, SafeValue, ValueKind};
use crate::sql::{ColumnRef, CompareOp, Predicate, Value};

/// Signature shared by every registered builder.
pub type BuilderFn = fn(&BuildContext<'_>, &FilterArgs<'_>) -> Contribution;

/// Immutable inputs shared by all builders of one compile.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a CompilerConfig,
    pub paths: &'a RelationPaths,
    pub options: &'a CompileOptions,
}

/// The per-triple part of a builder call.
#[derive(Debug, Clone, Copy)]
pub struct FilterArgs<'a> {
    pub condition: Condition,
    pub value: &'a FilterValue,
}

impl FilterArgs<'_> {
    pub fn mode(&self) -> Mode {
        self.condition.mode()
    }
}

/// A sanitization failure and what it should do to the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub rejected: Rejected,
    pub policy: RejectionPolicy,
}

impl Rejection {
    fn ignored(rejected: Rejected) -> Self {
        Self {
            rejected,
            policy: RejectionPolicy::Ignore,
        }
    }
}

/// Result type of the helpers builders compose.
pub type Built = Result<Association, Rejection>;

/// What one triple contributes to its domain's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    Constrain(Association),
    Reject(Rejection),
}

impl From<Built> for Contribution {
    fn from(built: Built) -> Self {
        match built {
            Ok(association) => Contribution::Constrain(association),
            Err(rejection) => Contribution::Reject(rejection),
        }
    }
}

// ---------------------------------------------------------------------------
// Value extraction
// ---------------------------------------------------------------------------

fn patterns(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Result<Vec<String>, Rejection> {
    let kind = ValueKind::FreeText {
        escape_wildcards: ctx.config.escape_like_wildcards,
    };
    match sanitize(args.value, kind) {
        Ok(SafeValue::Patterns(p)) => Ok(p),
        Ok(_) => Err(malformed()),
        Err(rejected) => Err(Rejection::ignored(rejected)),
    }
}

fn texts(args: &FilterArgs<'_>) -> Result<Vec<String>, Rejection> {
    match sanitize(args.value, ValueKind::ExactText) {
        Ok(SafeValue::Tokens(t)) => Ok(t),
        Ok(_) => Err(malformed()),
        Err(rejected) => Err(Rejection::ignored(rejected)),
    }
}

fn integers(args: &FilterArgs<'_>) -> Result<Vec<i64>, Rejection> {
    match sanitize(args.value, ValueKind::IntegerList) {
        Ok(SafeValue::Integers(i)) => Ok(i),
        Ok(_) => Err(malformed()),
        Err(rejected) => Err(Rejection::ignored(rejected)),
    }
}

/// Allow-listed tokens. Only a vocabulary miss follows the vocabulary's
/// policy; an empty value is always ignored.
pub(crate) fn tokens(
    args: &FilterArgs<'_>,
    vocabulary: &Vocabulary,
) -> Result<Vec<String>, Rejection> {
    match sanitize(args.value, ValueKind::ClosedVocabulary(vocabulary)) {
        Ok(SafeValue::Tokens(t)) => Ok(t),
        Ok(_) => Err(malformed()),
        Err(rejected) if rejected.reason == RejectReason::NotInVocabulary => Err(Rejection {
            rejected,
            policy: vocabulary.on_reject,
        }),
        Err(rejected) => Err(Rejection::ignored(rejected)),
    }
}

fn window(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Result<DateWindow, Rejection> {
    let kind = ValueKind::DateWindow {
        condition: args.condition,
        format: &ctx.config.date_format,
    };
    match sanitize(args.value, kind) {
        Ok(SafeValue::Dates(w)) => Ok(w),
        Ok(_) => Err(malformed()),
        Err(rejected) => Err(Rejection::ignored(rejected)),
    }
}

fn malformed() -> Rejection {
    unusable(0)
}

/// No entry mapped onto anything the builder understands.
pub(crate) fn unusable(dropped: usize) -> Rejection {
    Rejection::ignored(Rejected::new(RejectReason::Malformed, dropped))
}

// ---------------------------------------------------------------------------
// Value predicates
// ---------------------------------------------------------------------------

pub(crate) fn like_any(column: &ColumnRef, patterns: &[String]) -> Predicate {
    Predicate::or(
        patterns
            .iter()
            .map(|pattern| Predicate::Like {
                column: column.clone(),
                pattern: pattern.clone(),
            })
            .collect(),
    )
}

pub(crate) fn one_of_ints(column: ColumnRef, values: &[i64]) -> Predicate {
    match values {
        [single] => Predicate::Equals {
            column,
            value: Value::Int(*single),
        },
        _ => Predicate::OneOf {
            column,
            values: values.iter().map(|v| Value::Int(*v)).collect(),
        },
    }
}

pub(crate) fn one_of_texts(column: ColumnRef, values: &[String]) -> Predicate {
    match values {
        [single] => Predicate::Equals {
            column,
            value: Value::text(single.as_str()),
        },
        _ => Predicate::OneOf {
            column,
            values: values.iter().map(|v| Value::text(v.as_str())).collect(),
        },
    }
}

pub(crate) fn date_predicate(column: ColumnRef, window: DateWindow) -> Predicate {
    match window {
        DateWindow::Before(d) => Predicate::Compare {
            column,
            op: CompareOp::Le,
            value: Value::Date(d),
        },
        DateWindow::After(d) => Predicate::Compare {
            column,
            op: CompareOp::Ge,
            value: Value::Date(d),
        },
        DateWindow::Within(start, end) => Predicate::Between {
            column,
            low: Value::Date(start),
            high: Value::Date(end),
        },
    }
}

// ---------------------------------------------------------------------------
// Path-level helpers
// ---------------------------------------------------------------------------

/// Free-text contains on one column of `path`'s terminal table.
pub(crate) fn contains(
    ctx: &BuildContext<'_>,
    args: &FilterArgs<'_>,
    path: &RelationPath,
    column: &str,
) -> Built {
    contains_any(ctx, args, &[(path, column)])
}

/// Free-text contains on any of several `(path, column)` targets.
pub(crate) fn contains_any(
    ctx: &BuildContext<'_>,
    args: &FilterArgs<'_>,
    targets: &[(&RelationPath, &str)],
) -> Built {
    let patterns = patterns(ctx, args)?;
    Ok(exists_along_any(
        targets
            .iter()
            .map(|(path, column)| (*path, like_any(&path.terminal_column(column), &patterns))),
        args.mode(),
    ))
}

pub(crate) fn integer_in(args: &FilterArgs<'_>, path: &RelationPath, column: &str) -> Built {
    let values = integers(args)?;
    Ok(exists_along_path(
        path,
        one_of_ints(path.terminal_column(column), &values),
        args.mode(),
    ))
}

pub(crate) fn text_in(args: &FilterArgs<'_>, path: &RelationPath, column: &str) -> Built {
    let values = texts(args)?;
    Ok(exists_along_path(
        path,
        one_of_texts(path.terminal_column(column), &values),
        args.mode(),
    ))
}

pub(crate) fn vocabulary_in(
    args: &FilterArgs<'_>,
    vocabulary: &Vocabulary,
    path: &RelationPath,
    column: &str,
) -> Built {
    let values = tokens(args, vocabulary)?;
    Ok(exists_along_path(
        path,
        one_of_texts(path.terminal_column(column), &values),
        args.mode(),
    ))
}

/// Array column sharing at least one allow-listed token, along any target.
pub(crate) fn vocabulary_overlaps(
    args: &FilterArgs<'_>,
    vocabulary: &Vocabulary,
    targets: &[(&RelationPath, &str)],
) -> Built {
    let values = tokens(args, vocabulary)?;
    Ok(exists_along_any(
        targets.iter().map(|(path, column)| {
            let overlaps = Predicate::Overlaps {
                column: path.terminal_column(column),
                values: values.clone(),
            };
            (*path, overlaps)
        }),
        args.mode(),
    ))
}

/// Array column sharing at least one of the given values, which need not
/// come from a configured vocabulary.
pub(crate) fn text_overlaps(args: &FilterArgs<'_>, path: &RelationPath, column: &str) -> Built {
    let values = texts(args)?;
    Ok(exists_along_path(
        path,
        Predicate::Overlaps {
            column: path.terminal_column(column),
            values,
        },
        args.mode(),
    ))
}

pub(crate) fn date_in(
    ctx: &BuildContext<'_>,
    args: &FilterArgs<'_>,
    path: &RelationPath,
    column: &str,
) -> Built {
    let window = window(ctx, args)?;
    Ok(exists_along_path(
        path,
        date_predicate(path.terminal_column(column), window),
        Mode::Include,
    ))
}

/// Window test for rows that are active over `[start_column, end_column]`:
/// started on or before the window closes and ended on or after it opens.
pub(crate) fn active_within(
    ctx: &BuildContext<'_>,
    args: &FilterArgs<'_>,
    path: &RelationPath,
    start_column: &str,
    end_column: &str,
) -> Built {
    let window = window(ctx, args)?;
    let started_by = |d| Predicate::Compare {
        column: path.terminal_column(start_column),
        op: CompareOp::Le,
        value: Value::Date(d),
    };
    let ended_after = |d| Predicate::Compare {
        column: path.terminal_column(end_column),
        op: CompareOp::Ge,
        value: Value::Date(d),
    };
    let predicate = match window {
        DateWindow::Before(d) => started_by(d),
        DateWindow::After(d) => ended_after(d),
        DateWindow::Within(start, end) => Predicate::and(vec![started_by(end), ended_after(start)]),
    };
    Ok(exists_along_path(path, predicate, Mode::Include))
}

/// Group names, restricted to groups the requesting user owns or that are
/// public. Without a user only public groups match.
pub(crate) fn group_name_in(
    ctx: &BuildContext<'_>,
    args: &FilterArgs<'_>,
    path: &RelationPath,
) -> Built {
    let names = texts(args)?;
    let matching = one_of_texts(path.terminal_column("name"), &names);
    Ok(visible_groups(ctx, args, path, matching))
}

/// Group ids, with the same visibility rule as [`group_name_in`].
pub(crate) fn group_id_in(
    ctx: &BuildContext<'_>,
    args: &FilterArgs<'_>,
    path: &RelationPath,
) -> Built {
    let ids = integers(args)?;
    let matching = one_of_ints(path.terminal_column("id"), &ids);
    Ok(visible_groups(ctx, args, path, matching))
}

fn visible_groups(
    ctx: &BuildContext<'_>,
    args: &FilterArgs<'_>,
    path: &RelationPath,
    matching: Predicate,
) -> Association {
    let public = Predicate::Equals {
        column: path.terminal_column("isPublic"),
        value: Value::Bool(true),
    };
    let visible = match ctx.options.user_id {
        Some(user) => Predicate::or(vec![
            Predicate::Equals {
                column: path.terminal_column("userId"),
                value: Value::Int(user),
            },
            public,
        ]),
        None => public,
    };
    exists_along_path(path, Predicate::and(vec![matching, visible]), args.mode())
}
