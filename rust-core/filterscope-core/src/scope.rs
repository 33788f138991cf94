// SPDX-License-Identifier: PMPL-1.0-or-later
//! Compiled scopes.
//!
//! A [`Scope`] is what the list query of one domain has to merge: a
//! predicate for its WHERE clause and many-to-one LEFT JOINs for its FROM
//! clause. The outer query must alias its root table by the table name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::exists::{merge_joins, Association};
use crate::sql::{JoinClause, Predicate, SqlWriter, Value};
use crate::Domain;

/// The constraint compiled for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub predicate: Predicate,
    pub extra_joins: Vec<JoinClause>,
}

/// A scope rendered to PostgreSQL text with its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSql {
    /// Boolean expression using `$1..$n` placeholders.
    pub where_clause: String,
    /// One `LEFT JOIN ...` clause per extra join, in order.
    pub joins: Vec<String>,
    pub params: Vec<Value>,
}

impl Scope {
    /// No additional constraint.
    pub fn identity() -> Self {
        Self {
            predicate: Predicate::Always,
            extra_joins: Vec::new(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.predicate.is_always() && self.extra_joins.is_empty()
    }

    /// AND `association` into the scope, merging its joins by alias.
    pub fn constrain(&mut self, association: Association) {
        let current = std::mem::replace(&mut self.predicate, Predicate::Always);
        self.predicate = Predicate::and(vec![current, association.predicate]);
        merge_joins(&mut self.extra_joins, association.extra_joins);
    }

    pub fn to_sql(&self) -> RenderedSql {
        let mut w = SqlWriter::new();
        self.predicate.write_sql(&mut w);
        let (where_clause, params) = w.finish();
        RenderedSql {
            where_clause,
            joins: self.extra_joins.iter().map(ToString::to_string).collect(),
            params,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::identity()
    }
}

/// One scope per domain; unconstrained domains hold the identity scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeResult {
    scopes: BTreeMap<Domain, Scope>,
}

impl ScopeResult {
    /// Identity scopes for every domain.
    pub fn identity() -> Self {
        Self {
            scopes: Domain::ALL.iter().map(|d| (*d, Scope::identity())).collect(),
        }
    }

    pub fn insert(&mut self, domain: Domain, scope: Scope) {
        self.scopes.insert(domain, scope);
    }

    pub fn get(&self, domain: Domain) -> Option<&Scope> {
        self.scopes.get(&domain)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Domain, &Scope)> {
        self.scopes.iter()
    }

    /// Domains that received at least one constraint.
    pub fn constrained_domains(&self) -> Vec<Domain> {
        self.scopes
            .iter()
            .filter(|(_, scope)| !scope.is_identity())
            .map(|(domain, _)| *domain)
            .collect()
    }

    /// Deterministic SHA-256 over every domain's rendered SQL and
    /// parameters, as lowercase hex. Equal results have equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (domain, scope) in &self.scopes {
            let rendered = scope.to_sql();
            hasher.update(domain.to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(rendered.where_clause.as_bytes());
            for join in &rendered.joins {
                hasher.update([0u8]);
                hasher.update(join.as_bytes());
            }
            for param in &rendered.params {
                hasher.update([1u8]);
                // Value serialization is total over its variants.
                if let Ok(bytes) = serde_json::to_vec(param) {
                    hasher.update(&bytes);
                }
            }
            hasher.update([2u8]);
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>()
    }

    pub fn to_json(&self) -> Result<String, crate::ScopeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, crate::ScopeError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for ScopeResult {
    fn default() -> Self {
        Self::identity()
    }
}
