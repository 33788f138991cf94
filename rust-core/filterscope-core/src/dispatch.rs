// SPDX-License-Identifier: PMPL-1.0-or-later
//! Topic dispatch table.
//!
//! Maps `(Domain, Topic, Condition)` to the predicate builder for it. The
//! table is built once from per-domain rule lists and is read-only
//! afterwards. Names that do not parse into a [`Topic`] or [`Condition`], or
//! combinations no domain registers, resolve to `None` and the caller drops
//! the filter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builders::{self, BuilderFn};
use crate::error::ScopeError;
use crate::exists::Mode;
use crate::Domain;

/// The logical field a filter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    Region,
    Recipient,
    RecipientId,
    ProgramSpecialist,
    ProgramType,
    GrantNumber,
    StateCode,
    StartDate,
    Group,
    GoalName,
    ReportId,
    SingleOrMultiRecipients,
    LastSaved,
    Creator,
    /// Report topics; the wire name is `topic`.
    #[serde(rename = "topic")]
    ReportTopic,
    Reason,
    Collaborators,
    Role,
    Status,
    ResourceAttachment,
    CreateDate,
    ReportText,
    ResourceUrl,
    EventId,
    GoalType,
    EndDate,
    OtherEntities,
    DeliveryMethod,
    Participants,
    TtaType,
    TargetPopulations,
    MyReports,
}

impl Topic {
    pub const ALL: [Topic; 32] = [
        Topic::Region,
        Topic::Recipient,
        Topic::RecipientId,
        Topic::ProgramSpecialist,
        Topic::ProgramType,
        Topic::GrantNumber,
        Topic::StateCode,
        Topic::StartDate,
        Topic::Group,
        Topic::GoalName,
        Topic::ReportId,
        Topic::SingleOrMultiRecipients,
        Topic::LastSaved,
        Topic::Creator,
        Topic::ReportTopic,
        Topic::Reason,
        Topic::Collaborators,
        Topic::Role,
        Topic::Status,
        Topic::ResourceAttachment,
        Topic::CreateDate,
        Topic::ReportText,
        Topic::ResourceUrl,
        Topic::EventId,
        Topic::GoalType,
        Topic::EndDate,
        Topic::OtherEntities,
        Topic::DeliveryMethod,
        Topic::Participants,
        Topic::TtaType,
        Topic::TargetPopulations,
        Topic::MyReports,
    ];

    /// Wire name as it appears in `topic.condition` keys.
    pub fn name(self) -> &'static str {
        match self {
            Topic::Region => "region",
            Topic::Recipient => "recipient",
            Topic::RecipientId => "recipientId",
            Topic::ProgramSpecialist => "programSpecialist",
            Topic::ProgramType => "programType",
            Topic::GrantNumber => "grantNumber",
            Topic::StateCode => "stateCode",
            Topic::StartDate => "startDate",
            Topic::Group => "group",
            Topic::GoalName => "goalName",
            Topic::ReportId => "reportId",
            Topic::SingleOrMultiRecipients => "singleOrMultiRecipients",
            Topic::LastSaved => "lastSaved",
            Topic::Creator => "creator",
            Topic::ReportTopic => "topic",
            Topic::Reason => "reason",
            Topic::Collaborators => "collaborators",
            Topic::Role => "role",
            Topic::Status => "status",
            Topic::ResourceAttachment => "resourceAttachment",
            Topic::CreateDate => "createDate",
            Topic::ReportText => "reportText",
            Topic::ResourceUrl => "resourceUrl",
            Topic::EventId => "eventId",
            Topic::GoalType => "goalType",
            Topic::EndDate => "endDate",
            Topic::OtherEntities => "otherEntities",
            Topic::DeliveryMethod => "deliveryMethod",
            Topic::Participants => "participants",
            Topic::TtaType => "ttaType",
            Topic::TargetPopulations => "targetPopulations",
            Topic::MyReports => "myReports",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Topic {
    type Err = ScopeError;

    /// Exact, case-sensitive match on the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ScopeError::UnknownFilter(s.to_string()))
    }
}

/// The comparison operator tag of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Contains.
    Ctn,
    /// Does not contain.
    Nctn,
    In,
    Nin,
    /// Before (inclusive).
    Bef,
    /// After (inclusive).
    Aft,
    /// Within an inclusive window.
    Win,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Condition::Ctn,
        Condition::Nctn,
        Condition::In,
        Condition::Nin,
        Condition::Bef,
        Condition::Aft,
        Condition::Win,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Condition::Ctn => "ctn",
            Condition::Nctn => "nctn",
            Condition::In => "in",
            Condition::Nin => "nin",
            Condition::Bef => "bef",
            Condition::Aft => "aft",
            Condition::Win => "win",
        }
    }

    /// Negated conditions build the exclude flavor.
    pub fn mode(self) -> Mode {
        match self {
            Condition::Nctn | Condition::Nin => Mode::Exclude,
            _ => Mode::Include,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Condition {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ScopeError::UnknownFilter(s.to_string()))
    }
}

/// Registration of one builder for a topic under a set of conditions.
#[derive(Clone, Copy)]
pub struct TopicRule {
    pub topic: Topic,
    pub conditions: &'static [Condition],
    pub build: BuilderFn,
}

impl TopicRule {
    pub const fn new(topic: Topic, conditions: &'static [Condition], build: BuilderFn) -> Self {
        Self {
            topic,
            conditions,
            build,
        }
    }
}

/// Condition sets shared by most rules.
pub const CONTAINS: &[Condition] = &[Condition::Ctn, Condition::Nctn];
pub const MEMBERSHIP: &[Condition] = &[Condition::In, Condition::Nin];
pub const DATES: &[Condition] = &[Condition::Bef, Condition::Aft, Condition::Win];
/// Partial-match topics that also accept the older `in`/`nin` keys.
pub const TEXT_MATCH: &[Condition] = &[Condition::Ctn, Condition::Nctn, Condition::In, Condition::Nin];

/// Immutable `(Domain, Topic, Condition)` lookup.
#[derive(Clone)]
pub struct DispatchTable {
    entries: BTreeMap<(Domain, Topic, Condition), BuilderFn>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl DispatchTable {
    /// Build from per-domain rule lists; a repeated key is a startup error.
    pub fn from_rules<I>(rules: I) -> Result<Self, ScopeError>
    where
        I: IntoIterator<Item = (Domain, Vec<TopicRule>)>,
    {
        let mut entries = BTreeMap::new();
        for (domain, domain_rules) in rules {
            for rule in domain_rules {
                for &condition in rule.conditions {
                    let key = (domain, rule.topic, condition);
                    if entries.insert(key, rule.build).is_some() {
                        return Err(ScopeError::DuplicateRegistration {
                            domain,
                            topic: rule.topic,
                            condition,
                        });
                    }
                }
            }
        }
        Ok(Self { entries })
    }

    /// The registrations of every domain.
    pub fn standard() -> Result<Self, ScopeError> {
        Self::from_rules([
            (Domain::Grant, builders::grant::rules()),
            (Domain::ActivityReport, builders::activity_report::rules()),
            (Domain::Goal, builders::goal::rules()),
            (Domain::TrainingReport, builders::training_report::rules()),
            (Domain::Recipient, builders::recipient::rules()),
        ])
    }

    pub fn resolve(&self, domain: Domain, topic: Topic, condition: Condition) -> Option<BuilderFn> {
        self.entries.get(&(domain, topic, condition)).copied()
    }

    /// Domains that register `topic.condition`, in canonical order.
    pub fn domains_for(&self, topic: Topic, condition: Condition) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|d| self.entries.contains_key(&(*d, topic, condition)))
            .collect()
    }

    /// Resolve wire names; anything unrecognized is `None`.
    pub fn parse_key(topic: &str, condition: &str) -> Option<(Topic, Condition)> {
        Some((topic.parse().ok()?, condition.parse().ok()?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
