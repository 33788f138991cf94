// SPDX-License-Identifier: PMPL-1.0-or-later
//! Compiler configuration.
//!
//! Closed vocabularies are supplied by the surrounding application as static
//! configuration. Defaults mirror the application's constants:
//! - roles: specialist role names, rejected values are ignored
//! - topics and reasons: rejected values match nothing
//! - goal statuses: rejected values are ignored

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ScopeError;
use crate::filters::FilterKey;

/// What a triple contributes when every value fails allow-list validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// The triple contributes no predicate.
    Ignore,
    /// The triple contributes a predicate that matches no rows.
    MatchNothing,
}

/// A closed set of accepted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub values: BTreeSet<String>,
    pub on_reject: RejectionPolicy,
}

impl Vocabulary {
    pub fn new<I, S>(values: I, on_reject: RejectionPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            on_reject,
        }
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }
}

/// The allow-listed vocabularies consumed by predicate builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabularies {
    pub roles: Vocabulary,
    pub topics: Vocabulary,
    pub reasons: Vocabulary,
    pub goal_statuses: Vocabulary,
}

/// Configuration for the scope compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub vocabularies: Vocabularies,
    /// `topic.condition` keys whose rejection fails the compile instead of
    /// being dropped.
    pub mandatory_filters: Vec<String>,
    /// chrono format for single dates; windows are two dates joined by `-`.
    pub date_format: String,
    /// Treat `%` and `_` in free text literally instead of as pattern wildcards.
    pub escape_like_wildcards: bool,
}

/// Goal status value selecting goals whose status was never set.
pub const NEEDS_STATUS: &str = "Needs Status";

const ROLES: [&str; 11] = [
    "Central Office: TTA and Comprehensive Services Division",
    "Central Office: Other Divisions",
    "TTAC",
    "Admin. Assistant",
    "Early Childhood Manager",
    "Early Childhood Specialist",
    "Family Engagement Specialist",
    "Grantee Specialist Manager",
    "Grantee Specialist",
    "Health Specialist",
    "System Specialist",
];

const TOPICS: [&str; 42] = [
    "Behavioral / Mental Health / Trauma",
    "Child Screening and Assessment",
    "CLASS: Classroom Organization",
    "CLASS: Emotional Support",
    "CLASS: Instructional Support",
    "Coaching",
    "Communication",
    "Community and Self-Assessment",
    "Culture & Language",
    "Curriculum (Instructional or Parenting)",
    "Data and Evaluation",
    "Disabilities Services",
    "ERSEA",
    "Emergency Preparedness, Response, and Recovery (EPRR)",
    "Environmental Health and Safety / EPRR",
    "Environmental Health and Safety",
    "Facilities",
    "Family Support Services",
    "Fatherhood / Male Caregiving",
    "Fiscal / Budget",
    "Five-Year Grant",
    "Home Visiting",
    "Human Resources",
    "Leadership / Governance",
    "Learning Environments",
    "Nutrition",
    "Ongoing Monitoring and Continuous Improvement",
    "Oral Health",
    "Parent and Family Engagement",
    "Partnerships and Community Engagement",
    "Physical Health and Screenings",
    "Pregnancy Services / Expectant Families",
    "Program Planning and Services",
    "Quality Improvement Plan / QIP",
    "Recordkeeping and Reporting",
    "Safety Practices",
    "Staff Wellness",
    "Teaching / Caregiving Practices",
    "Technology and Information Systems",
    "Training and Professional Development",
    "Transition Practices",
    "Transportation",
];

const REASONS: [&str; 16] = [
    "Below Competitive Threshold (CLASS)",
    "Below Quality Threshold (CLASS)",
    "Change in Scope",
    "Child Incident",
    "Complaint",
    "Full Enrollment",
    "New Recipient",
    "New Director or Management",
    "New Program Option",
    "New Staff / Turnover",
    "Ongoing Quality Improvement",
    "Planning/Coordination",
    "School Readiness Goals",
    "Monitoring | Area of Concern",
    "Monitoring | Noncompliance",
    "Monitoring | Deficiency",
];

const GOAL_STATUSES: [&str; 6] = [
    "Draft",
    "Not Started",
    "In Progress",
    "Suspended",
    "Closed",
    NEEDS_STATUS,
];

impl Default for Vocabularies {
    fn default() -> Self {
        Self {
            roles: Vocabulary::new(ROLES, RejectionPolicy::Ignore),
            topics: Vocabulary::new(TOPICS, RejectionPolicy::MatchNothing),
            reasons: Vocabulary::new(REASONS, RejectionPolicy::MatchNothing),
            goal_statuses: Vocabulary::new(GOAL_STATUSES, RejectionPolicy::Ignore),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            vocabularies: Vocabularies::default(),
            mandatory_filters: Vec::new(),
            date_format: "%Y/%m/%d".to_string(),
            escape_like_wildcards: false,
        }
    }
}

impl CompilerConfig {
    /// Parse a configuration from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ScopeError> {
        let config: CompilerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before a compiler is built from it.
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.date_format.trim().is_empty() {
            return Err(ScopeError::InvalidConfig("date_format is empty".to_string()));
        }
        if self.date_format.contains('-') {
            return Err(ScopeError::InvalidConfig(format!(
                "date_format {:?} must not contain '-', it separates window bounds",
                self.date_format
            )));
        }
        for key in &self.mandatory_filters {
            if FilterKey::parse(key).is_none() {
                return Err(ScopeError::InvalidConfig(format!(
                    "mandatory filter {:?} is not a topic.condition key",
                    key
                )));
            }
        }
        let vocabularies = [
            ("roles", &self.vocabularies.roles),
            ("topics", &self.vocabularies.topics),
            ("reasons", &self.vocabularies.reasons),
            ("goal_statuses", &self.vocabularies.goal_statuses),
        ];
        for (name, vocabulary) in vocabularies {
            if vocabulary.values.is_empty() {
                return Err(ScopeError::InvalidConfig(format!(
                    "vocabulary {} is empty",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Whether rejection of `key` must fail the compile.
    pub fn is_mandatory(&self, key: &FilterKey) -> bool {
        self.mandatory_filters
            .iter()
            .filter_map(|k| FilterKey::parse(k))
            .any(|k| &k == key)
    }
}
