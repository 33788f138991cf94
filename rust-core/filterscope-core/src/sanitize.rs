// SPDX-License-Identifier: PMPL-1.0-or-later
//! Value sanitizer.
//!
//! Normalizes raw filter values before any predicate is built from them:
//! - free text becomes `%value%` contains-patterns
//! - exact text keeps each distinct entry as an equality operand
//! - closed vocabularies keep only exact allow-list members
//! - integer lists keep only entries that parse
//! - date conditions parse to a [`DateWindow`]
//!
//! Everything here is a pure function of its inputs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Vocabulary;
use crate::dispatch::Condition;
use crate::filters::FilterValue;

/// How a raw value must be interpreted.
#[derive(Debug, Clone, Copy)]
pub enum ValueKind<'a> {
    FreeText { escape_wildcards: bool },
    /// Open-ended names compared for equality.
    ExactText,
    ClosedVocabulary(&'a Vocabulary),
    IntegerList,
    DateWindow { condition: Condition, format: &'a str },
}

/// A date constraint parsed from `bef`, `aft` or `win` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    /// On or before the date.
    Before(NaiveDate),
    /// On or after the date.
    After(NaiveDate),
    /// Inclusive range.
    Within(NaiveDate, NaiveDate),
}

/// A value that passed sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeValue {
    /// `%value%` patterns, one per non-empty entry.
    Patterns(Vec<String>),
    /// Distinct tokens in input order; allow-listed for closed vocabularies.
    Tokens(Vec<String>),
    Integers(Vec<i64>),
    Dates(DateWindow),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No entry was a member of the closed vocabulary.
    NotInVocabulary,
    /// No entry could be parsed into the expected shape.
    Malformed,
    /// The value had no usable entries at all.
    Empty,
}

/// A value that contributes nothing because it failed sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejected {
    pub reason: RejectReason,
    /// Entries dropped on the way to the rejection.
    pub dropped: usize,
}

impl Rejected {
    pub fn new(reason: RejectReason, dropped: usize) -> Self {
        Self { reason, dropped }
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            RejectReason::NotInVocabulary => {
                write!(f, "{} value(s) outside the allowed vocabulary", self.dropped)
            }
            RejectReason::Malformed => write!(f, "{} malformed value(s)", self.dropped),
            RejectReason::Empty => write!(f, "empty value"),
        }
    }
}

/// Sanitize `value` as `kind`.
pub fn sanitize(value: &FilterValue, kind: ValueKind<'_>) -> Result<SafeValue, Rejected> {
    let entries: Vec<&str> = value
        .entries()
        .into_iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect();
    if entries.is_empty() {
        return Err(Rejected::new(RejectReason::Empty, 0));
    }

    match kind {
        ValueKind::FreeText { escape_wildcards } => {
            let patterns: Vec<String> = entries
                .iter()
                .map(|e| contains_pattern(e, escape_wildcards))
                .filter(|p| p.as_str() != "%%")
                .collect();
            if patterns.is_empty() {
                Err(Rejected::new(RejectReason::Empty, entries.len()))
            } else {
                Ok(SafeValue::Patterns(patterns))
            }
        }
        ValueKind::ExactText => {
            let mut kept: Vec<String> = Vec::new();
            for entry in &entries {
                let clean: String = entry.chars().filter(|c| *c != '\0').collect();
                if !clean.is_empty() && !kept.contains(&clean) {
                    kept.push(clean);
                }
            }
            if kept.is_empty() {
                Err(Rejected::new(RejectReason::Empty, entries.len()))
            } else {
                Ok(SafeValue::Tokens(kept))
            }
        }
        ValueKind::ClosedVocabulary(vocabulary) => {
            let mut kept: Vec<String> = Vec::new();
            for entry in &entries {
                if vocabulary.contains(entry) && !kept.iter().any(|k| k == entry) {
                    kept.push((*entry).to_string());
                }
            }
            let dropped = entries.iter().filter(|e| !vocabulary.contains(e)).count();
            if kept.is_empty() {
                Err(Rejected::new(RejectReason::NotInVocabulary, dropped))
            } else {
                Ok(SafeValue::Tokens(kept))
            }
        }
        ValueKind::IntegerList => {
            let parsed: Vec<i64> = entries.iter().filter_map(|e| e.parse().ok()).collect();
            if parsed.is_empty() {
                Err(Rejected::new(RejectReason::Malformed, entries.len()))
            } else {
                Ok(SafeValue::Integers(parsed))
            }
        }
        ValueKind::DateWindow { condition, format } => {
            // Only the first entry is meaningful for a date condition.
            parse_window(entries[0], condition, format)
                .map(SafeValue::Dates)
                .ok_or_else(|| Rejected::new(RejectReason::Malformed, 1))
        }
    }
}

/// Wrap `entry` in `%` for a contains-match, stripping NUL bytes that the
/// database would refuse.
fn contains_pattern(entry: &str, escape_wildcards: bool) -> String {
    let mut pattern = String::with_capacity(entry.len() + 2);
    pattern.push('%');
    for ch in entry.chars() {
        match ch {
            '\0' => {}
            '%' | '_' | '\\' if escape_wildcards => {
                pattern.push('\\');
                pattern.push(ch);
            }
            _ => pattern.push(ch),
        }
    }
    pattern.push('%');
    pattern
}

fn parse_window(raw: &str, condition: Condition, format: &str) -> Option<DateWindow> {
    let date = |s: &str| NaiveDate::parse_from_str(s.trim(), format).ok();
    match condition {
        Condition::Bef => date(raw).map(DateWindow::Before),
        Condition::Aft => date(raw).map(DateWindow::After),
        Condition::Win => {
            let (start, end) = raw.split_once('-')?;
            let (start, end) = (date(start)?, date(end)?);
            if start <= end {
                Some(DateWindow::Within(start, end))
            } else {
                Some(DateWindow::Within(end, start))
            }
        }
        _ => None,
    }
}
