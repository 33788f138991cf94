// SPDX-License-Identifier: PMPL-1.0-or-later
//! FilterScope Core
//!
//! Compiles declarative `(topic, condition, value)` filter triples into
//! parameterized relational predicates, one scope per entity domain.
//! Association filters that cross one-to-many joins are compiled into
//! distinct-key subqueries so the outer list query keeps exactly one row
//! per primary entity.

pub mod builders;
pub mod compile;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exists;
pub mod filters;
pub mod memory;
pub mod relation;
pub mod sanitize;
pub mod scope;
pub mod sql;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use compile::{CompileOptions, ScopeCompiler};
pub use config::{CompilerConfig, RejectionPolicy, Vocabulary};
pub use dispatch::{Condition, DispatchTable, Topic};
pub use error::ScopeError;
pub use exists::{Association, Mode};
pub use filters::{FilterKey, FilterSet, FilterTriple, FilterValue};
pub use memory::MemoryDatabase;
pub use relation::{Catalog, RelationPath, RelationPaths};
pub use sanitize::{sanitize, RejectReason, Rejected, SafeValue, ValueKind};
pub use scope::{RenderedSql, Scope, ScopeResult};
pub use sql::{ColumnRef, JoinClause, Predicate, Subquery, Value};

/// The primary entity roots a compiled scope can be applied to.
///
/// One filter set is compiled against every domain at once; a topic such as
/// `region` constrains each domain that registers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    Grant,
    ActivityReport,
    Goal,
    TrainingReport,
    Recipient,
}

impl Domain {
    /// All domains in canonical order.
    pub const ALL: [Domain; 5] = [
        Domain::Grant,
        Domain::ActivityReport,
        Domain::Goal,
        Domain::TrainingReport,
        Domain::Recipient,
    ];

    /// Root table the domain's list query selects from.
    pub fn root_table(self) -> &'static str {
        match self {
            Domain::Grant => "Grants",
            Domain::ActivityReport => "ActivityReports",
            Domain::Goal => "Goals",
            Domain::TrainingReport => "EventReportPilots",
            Domain::Recipient => "Recipients",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Grant => write!(f, "grant"),
            Domain::ActivityReport => write!(f, "activityReport"),
            Domain::Goal => write!(f, "goal"),
            Domain::TrainingReport => write!(f, "trainingReport"),
            Domain::Recipient => write!(f, "recipient"),
        }
    }
}

impl FromStr for Domain {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grant" => Ok(Domain::Grant),
            "activityreport" => Ok(Domain::ActivityReport),
            "goal" => Ok(Domain::Goal),
            "trainingreport" => Ok(Domain::TrainingReport),
            "recipient" => Ok(Domain::Recipient),
            _ => Err(ScopeError::UnknownDomain(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_display_roundtrip() {
        for d in Domain::ALL {
            let s = d.to_string();
            let parsed: Domain = s.parse().unwrap();
            assert_eq!(d, parsed);
        }
    }

    #[test]
    fn test_domain_case_insensitive_parse() {
        assert_eq!("GRANT".parse::<Domain>().unwrap(), Domain::Grant);
        assert_eq!(
            "ActivityReport".parse::<Domain>().unwrap(),
            Domain::ActivityReport
        );
    }

    #[test]
    fn test_unknown_domain_error() {
        assert!("widget".parse::<Domain>().is_err());
    }

    #[test]
    fn test_domain_serde_matches_display() {
        for d in Domain::ALL {
            let json = serde_json::to_string(&d).unwrap();
            assert_eq!(json, format!("\"{}\"", d));
        }
    }

    #[test]
    fn test_root_tables_are_distinct() {
        let mut tables: Vec<_> = Domain::ALL.iter().map(|d| d.root_table()).collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), Domain::ALL.len());
    }
}
