// SPDX-License-Identifier: PMPL-1.0-or-later
//! Relation catalog and join paths.
//!
//! The catalog is the only source of identifiers that appear in rendered SQL.
//! A [`RelationPath`] is a fixed chain of join steps from a domain's root
//! table to a descendant table. Every path a predicate builder uses is
//! resolved once, at startup, into [`RelationPaths`] together with the
//! terminal columns read through it; an unknown table, hop or column fails
//! construction instead of a request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ScopeError;
use crate::sql::{ColumnRef, JoinClause, JoinKind};

/// PostgreSQL truncates identifiers beyond this many bytes.
const MAX_IDENT_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one target row per source row; joining cannot multiply rows.
    ManyToOne,
    /// Any number of target rows per source row.
    OneToMany,
}

#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: &'static str,
    pub key: &'static str,
    pub columns: &'static [&'static str],
}

impl TableDef {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

/// A named, directed join step: `from.from_column = to.to_column`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: &'static str,
    pub name: &'static str,
    pub from_column: &'static str,
    pub to: &'static str,
    pub to_column: &'static str,
    pub cardinality: Cardinality,
}

/// Tables and join edges known to the compiler.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<&'static str, TableDef>,
    edges: BTreeMap<(&'static str, &'static str), Edge>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: TableDef) -> Result<(), ScopeError> {
        if !table.has_column(table.key) {
            return Err(ScopeError::Configuration(format!(
                "table {} does not list its key column {}",
                table.name, table.key
            )));
        }
        if self.tables.contains_key(table.name) {
            return Err(ScopeError::Configuration(format!(
                "table {} registered twice",
                table.name
            )));
        }
        self.tables.insert(table.name, table);
        Ok(())
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), ScopeError> {
        let from = self.require_table(edge.from)?;
        let to = self.require_table(edge.to)?;
        if !from.has_column(edge.from_column) {
            return Err(ScopeError::Configuration(format!(
                "edge {}.{} joins on unknown column {}.{}",
                edge.from, edge.name, edge.from, edge.from_column
            )));
        }
        if !to.has_column(edge.to_column) {
            return Err(ScopeError::Configuration(format!(
                "edge {}.{} joins on unknown column {}.{}",
                edge.from, edge.name, edge.to, edge.to_column
            )));
        }
        let key = (edge.from, edge.name);
        if self.edges.contains_key(&key) {
            return Err(ScopeError::Configuration(format!(
                "edge {}.{} registered twice",
                edge.from, edge.name
            )));
        }
        self.edges.insert(key, edge);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    fn require_table(&self, name: &str) -> Result<&TableDef, ScopeError> {
        self.tables
            .get(name)
            .ok_or_else(|| ScopeError::Configuration(format!("unknown table {}", name)))
    }

    /// Resolve a path from `root` following `hops`, each named relative to
    /// the table reached so far.
    pub fn path(&self, root: &str, hops: &[&str]) -> Result<RelationPath, ScopeError> {
        let root_def = self.require_table(root)?;
        let mut current = root_def;
        let mut resolved: Vec<Hop> = Vec::with_capacity(hops.len());
        for name in hops {
            let edge = self.edges.get(&(current.name, *name)).ok_or_else(|| {
                ScopeError::Configuration(format!(
                    "path from {} references undefined join {}.{}",
                    root, current.name, name
                ))
            })?;
            let target = self.require_table(edge.to)?;
            let alias = match resolved.last() {
                Some(prev) => format!("{}.{}", prev.alias, edge.name),
                None => edge.name.to_string(),
            };
            if alias.len() > MAX_IDENT_LEN {
                return Err(ScopeError::Configuration(format!(
                    "alias {} exceeds {} bytes",
                    alias, MAX_IDENT_LEN
                )));
            }
            resolved.push(Hop {
                table: target.name.to_string(),
                key: target.key.to_string(),
                alias,
                on_column: edge.to_column.to_string(),
                parent_column: edge.from_column.to_string(),
                cardinality: edge.cardinality,
            });
            current = target;
        }
        Ok(RelationPath {
            root: root_def.name.to_string(),
            root_key: root_def.key.to_string(),
            hops: resolved,
            terminal_columns: current.columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// The application schema.
    pub fn standard() -> Result<Self, ScopeError> {
        let mut catalog = Catalog::new();
        for table in standard_tables() {
            catalog.add_table(table)?;
        }
        for edge in standard_edges() {
            catalog.add_edge(edge)?;
        }
        Ok(catalog)
    }
}

/// One resolved join step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub table: String,
    pub key: String,
    pub alias: String,
    /// Column of this hop's table used in the join condition.
    pub on_column: String,
    /// Column of the previous table (or root) used in the join condition.
    pub parent_column: String,
    pub cardinality: Cardinality,
}

/// An immutable join chain from a root table to a terminal table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPath {
    root: String,
    root_key: String,
    hops: Vec<Hop>,
    terminal_columns: Vec<String>,
}

impl RelationPath {
    pub fn root_table(&self) -> &str {
        &self.root
    }

    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Whether following the path can multiply root rows.
    pub fn fans_out(&self) -> bool {
        self.hops
            .iter()
            .any(|h| h.cardinality == Cardinality::OneToMany)
    }

    pub fn terminal_table(&self) -> &str {
        self.hops.last().map_or(&self.root, |hop| &hop.table)
    }

    pub fn has_terminal_column(&self, column: &str) -> bool {
        self.terminal_columns.iter().any(|c| c == column)
    }

    /// Fail unless the terminal table defines every one of `columns`.
    pub fn require(self, columns: &[&str]) -> Result<Self, ScopeError> {
        match columns.iter().find(|c| !self.has_terminal_column(c)) {
            Some(missing) => Err(ScopeError::Configuration(format!(
                "column {}.{} read through a path from {} is not defined",
                self.terminal_table(),
                missing,
                self.root
            ))),
            None => Ok(self),
        }
    }

    /// A column of the terminal table. With zero hops the terminal table is
    /// the root, referenced by its own name. Columns are checked by
    /// [`RelationPath::require`] when the paths are resolved.
    pub fn terminal_column(&self, column: &str) -> ColumnRef {
        match self.hops.last() {
            Some(hop) => ColumnRef::new(&hop.alias, column),
            None => ColumnRef::new(&self.root, column),
        }
    }

    /// Primary key of the terminal table.
    pub fn terminal_key(&self) -> ColumnRef {
        match self.hops.last() {
            Some(hop) => ColumnRef::new(&hop.alias, &hop.key),
            None => ColumnRef::new(&self.root, &self.root_key),
        }
    }

    /// Join clauses for every hop, the first one attached to `root_alias`.
    pub fn joins(&self, root_alias: &str, kind: JoinKind) -> Vec<JoinClause> {
        let mut parent_alias = root_alias;
        let mut joins = Vec::with_capacity(self.hops.len());
        for hop in &self.hops {
            joins.push(JoinClause {
                kind,
                table: hop.table.clone(),
                alias: hop.alias.clone(),
                on_column: hop.on_column.clone(),
                other: ColumnRef::new(parent_alias, &hop.parent_column),
            });
            parent_alias = &hop.alias;
        }
        joins
    }
}

// ---------------------------------------------------------------------------
// Paths used by the predicate builders
// ---------------------------------------------------------------------------

/// Every relation path a predicate builder reads, resolved at startup.
#[derive(Debug, Clone)]
pub struct RelationPaths {
    pub grant: RelationPath,
    pub grant_recipient: RelationPath,
    pub grant_programs: RelationPath,
    pub grant_groups: RelationPath,
    pub grant_goals: RelationPath,

    pub report: RelationPath,
    pub report_grants: RelationPath,
    pub report_recipients: RelationPath,
    pub report_other_entities: RelationPath,
    pub report_programs: RelationPath,
    pub report_author: RelationPath,
    pub report_collaborators: RelationPath,
    pub report_collaborator_links: RelationPath,
    pub report_approvers: RelationPath,
    pub report_objective_topics: RelationPath,
    pub report_files: RelationPath,
    pub report_goals: RelationPath,
    pub report_objectives: RelationPath,
    pub report_next_steps: RelationPath,
    pub report_groups: RelationPath,

    pub goal: RelationPath,
    pub goal_grant: RelationPath,
    pub goal_groups: RelationPath,
    pub goal_reports: RelationPath,
    pub goal_report_goals: RelationPath,
    pub goal_objective_topics: RelationPath,
    pub goal_report_objectives: RelationPath,
    pub goal_next_steps: RelationPath,
    pub goal_report_resources: RelationPath,
    pub goal_report_goal_resources: RelationPath,
    pub goal_report_objective_resources: RelationPath,
    pub goal_next_step_resources: RelationPath,
    pub goal_report_files: RelationPath,

    pub recipient: RelationPath,
    pub recipient_grants: RelationPath,
    pub recipient_programs: RelationPath,

    pub training_report: RelationPath,
    pub training_report_collaborator_centers: RelationPath,
    pub training_report_owner_centers: RelationPath,
}

impl RelationPaths {
    /// Resolve every path and check the terminal columns each one is read
    /// through.
    pub fn resolve(catalog: &Catalog) -> Result<Self, ScopeError> {
        const GRANTS: &str = "Grants";
        const REPORTS: &str = "ActivityReports";
        const GOALS: &str = "Goals";
        const RECIPIENTS: &str = "Recipients";
        const EVENTS: &str = "EventReportPilots";
        const GROUP: &[&str] = &["id", "name", "userId", "isPublic"];
        const GRANT_ATTRIBUTES: &[&str] = &["regionId", "programSpecialistName", "number", "stateCode"];
        const OBJECTIVE_TEXT: &[&str] = &["title", "ttaProvided"];

        let path = |root: &str, hops: &[&str], columns: &[&str]| -> Result<RelationPath, ScopeError> {
            catalog.path(root, hops)?.require(columns)
        };

        Ok(Self {
            grant: path(
                GRANTS,
                &[],
                &[
                    "regionId",
                    "programSpecialistName",
                    "number",
                    "stateCode",
                    "startDate",
                    "endDate",
                ],
            )?,
            grant_recipient: path(GRANTS, &["recipient"], &["name"])?,
            grant_programs: path(GRANTS, &["programs"], &["programType"])?,
            grant_groups: path(GRANTS, &["groupGrants", "group"], GROUP)?,
            grant_goals: path(GRANTS, &["goals"], &["name"])?,

            report: path(
                REPORTS,
                &[],
                &[
                    "id",
                    "regionId",
                    "userId",
                    "calculatedStatus",
                    "startDate",
                    "endDate",
                    "updatedAt",
                    "topics",
                    "reason",
                    "context",
                    "additionalNotes",
                    "deliveryMethod",
                    "participants",
                    "ttaType",
                    "targetPopulations",
                ],
            )?,
            report_grants: path(
                REPORTS,
                &["activityRecipients", "grant"],
                &["recipientId", "number", "programSpecialistName", "stateCode"],
            )?,
            report_recipients: path(
                REPORTS,
                &["activityRecipients", "grant", "recipient"],
                &["name"],
            )?,
            report_other_entities: path(
                REPORTS,
                &["activityRecipients", "otherEntity"],
                &["name"],
            )?,
            report_programs: path(
                REPORTS,
                &["activityRecipients", "grant", "programs"],
                &["programType"],
            )?,
            report_author: path(REPORTS, &["author"], &["name", "role"])?,
            report_collaborators: path(REPORTS, &["collaborators", "user"], &["name", "role"])?,
            report_collaborator_links: path(REPORTS, &["collaborators"], &["userId"])?,
            report_approvers: path(REPORTS, &["approvers"], &["userId"])?,
            report_objective_topics: path(
                REPORTS,
                &["reportObjectives", "topics", "topic"],
                &["name"],
            )?,
            report_files: path(REPORTS, &["files", "file"], &["originalFileName"])?,
            report_goals: path(REPORTS, &["reportGoals"], &["name"])?,
            report_objectives: path(REPORTS, &["reportObjectives"], OBJECTIVE_TEXT)?,
            report_next_steps: path(REPORTS, &["nextSteps"], &["note"])?,
            report_groups: path(
                REPORTS,
                &["activityRecipients", "grant", "groupGrants", "group"],
                GROUP,
            )?,

            goal: path(GOALS, &[], &["name", "status", "createdAt", "isRttapa"])?,
            goal_grant: path(GOALS, &["grant"], &["regionId", "recipientId", "number"])?,
            goal_groups: path(GOALS, &["grant", "groupGrants", "group"], GROUP)?,
            goal_reports: path(
                GOALS,
                &["reportGoals", "report"],
                &["reason", "context", "additionalNotes"],
            )?,
            goal_report_goals: path(GOALS, &["reportGoals"], &["name"])?,
            goal_objective_topics: path(
                GOALS,
                &["objectives", "objectiveTopics", "topic"],
                &["name"],
            )?,
            goal_report_objectives: path(
                GOALS,
                &["objectives", "reportObjectives"],
                OBJECTIVE_TEXT,
            )?,
            goal_next_steps: path(GOALS, &["reportGoals", "report", "nextSteps"], &["note"])?,
            goal_report_resources: path(
                GOALS,
                &["reportGoals", "report", "resources", "resource"],
                &["url"],
            )?,
            goal_report_goal_resources: path(
                GOALS,
                &["reportGoals", "resources", "resource"],
                &["url"],
            )?,
            goal_report_objective_resources: path(
                GOALS,
                &["objectives", "reportObjectives", "resources", "resource"],
                &["url"],
            )?,
            goal_next_step_resources: path(
                GOALS,
                &["reportGoals", "report", "nextSteps", "resources", "resource"],
                &["url"],
            )?,
            goal_report_files: path(
                GOALS,
                &["reportGoals", "report", "files", "file"],
                &["originalFileName"],
            )?,

            recipient: path(RECIPIENTS, &[], &["name"])?,
            recipient_grants: path(RECIPIENTS, &["grants"], GRANT_ATTRIBUTES)?,
            recipient_programs: path(RECIPIENTS, &["grants", "programs"], &["programType"])?,

            training_report: path(EVENTS, &[], &["regionId", "startDate", "eventId"])?,
            training_report_collaborator_centers: path(
                EVENTS,
                &["nationalCenterUsers"],
                &["nationalCenterName"],
            )?,
            training_report_owner_centers: path(
                EVENTS,
                &["owner", "nationalCenterUsers", "nationalCenter"],
                &["name"],
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// Standard schema
// ---------------------------------------------------------------------------

fn table(name: &'static str, columns: &'static [&'static str]) -> TableDef {
    TableDef {
        name,
        key: "id",
        columns,
    }
}

fn standard_tables() -> Vec<TableDef> {
    vec![
        table(
            "Grants",
            &[
                "id",
                "number",
                "regionId",
                "recipientId",
                "programSpecialistName",
                "stateCode",
                "startDate",
                "endDate",
            ],
        ),
        table("Recipients", &["id", "name"]),
        table("Programs", &["id", "grantId", "programType"]),
        table("Groups", &["id", "name", "userId", "isPublic"]),
        table("GroupGrants", &["id", "groupId", "grantId"]),
        table(
            "Goals",
            &["id", "name", "status", "createdAt", "grantId", "isRttapa"],
        ),
        table("Objectives", &["id", "goalId", "title"]),
        table("ObjectiveTopics", &["id", "objectiveId", "topicId"]),
        table("Topics", &["id", "name"]),
        table(
            "ActivityReports",
            &[
                "id",
                "regionId",
                "userId",
                "calculatedStatus",
                "startDate",
                "updatedAt",
                "topics",
                "reason",
                "context",
                "additionalNotes",
                "endDate",
                "deliveryMethod",
                "participants",
                "ttaType",
                "targetPopulations",
            ],
        ),
        table("ActivityReportGoals", &["id", "activityReportId", "goalId", "name"]),
        table(
            "ActivityReportGoalResources",
            &["id", "activityReportGoalId", "resourceId"],
        ),
        table(
            "ActivityReportObjectives",
            &["id", "activityReportId", "objectiveId", "title", "ttaProvided"],
        ),
        table(
            "ActivityReportObjectiveTopics",
            &["id", "activityReportObjectiveId", "topicId"],
        ),
        table(
            "ActivityReportObjectiveResources",
            &["id", "activityReportObjectiveId", "resourceId"],
        ),
        table(
            "ActivityRecipients",
            &["id", "activityReportId", "grantId", "otherEntityId"],
        ),
        table("OtherEntities", &["id", "name"]),
        table("ActivityReportCollaborators", &["id", "activityReportId", "userId"]),
        table("ActivityReportApprovers", &["id", "activityReportId", "userId"]),
        table("Users", &["id", "name", "role"]),
        table("ActivityReportFiles", &["id", "activityReportId", "fileId"]),
        table("Files", &["id", "originalFileName"]),
        table("ActivityReportResources", &["id", "activityReportId", "resourceId"]),
        table("NextSteps", &["id", "activityReportId", "note"]),
        table("NextStepResources", &["id", "nextStepId", "resourceId"]),
        table("Resources", &["id", "url"]),
        table(
            "EventReportPilots",
            &["id", "eventId", "regionId", "startDate", "ownerId"],
        ),
        table(
            "EventReportPilotNationalCenterUsers",
            &["id", "eventReportPilotId", "nationalCenterName"],
        ),
        table("NationalCenterUsers", &["id", "userId", "nationalCenterId"]),
        table("NationalCenters", &["id", "name"]),
    ]
}

fn belongs_to(
    from: &'static str,
    name: &'static str,
    foreign_key: &'static str,
    to: &'static str,
) -> Edge {
    Edge {
        from,
        name,
        from_column: foreign_key,
        to,
        to_column: "id",
        cardinality: Cardinality::ManyToOne,
    }
}

fn has_many(
    from: &'static str,
    name: &'static str,
    to: &'static str,
    foreign_key: &'static str,
) -> Edge {
    Edge {
        from,
        name,
        from_column: "id",
        to,
        to_column: foreign_key,
        cardinality: Cardinality::OneToMany,
    }
}

fn standard_edges() -> Vec<Edge> {
    vec![
        belongs_to("Grants", "recipient", "recipientId", "Recipients"),
        has_many("Grants", "programs", "Programs", "grantId"),
        has_many("Grants", "groupGrants", "GroupGrants", "grantId"),
        has_many("Grants", "goals", "Goals", "grantId"),
        belongs_to("GroupGrants", "group", "groupId", "Groups"),
        has_many("Recipients", "grants", "Grants", "recipientId"),
        belongs_to("Goals", "grant", "grantId", "Grants"),
        has_many("Goals", "objectives", "Objectives", "goalId"),
        has_many("Goals", "reportGoals", "ActivityReportGoals", "goalId"),
        has_many("Objectives", "objectiveTopics", "ObjectiveTopics", "objectiveId"),
        has_many(
            "Objectives",
            "reportObjectives",
            "ActivityReportObjectives",
            "objectiveId",
        ),
        belongs_to("ObjectiveTopics", "topic", "topicId", "Topics"),
        belongs_to("ActivityReportGoals", "report", "activityReportId", "ActivityReports"),
        has_many(
            "ActivityReportGoals",
            "resources",
            "ActivityReportGoalResources",
            "activityReportGoalId",
        ),
        belongs_to("ActivityReportGoalResources", "resource", "resourceId", "Resources"),
        belongs_to("ActivityReports", "author", "userId", "Users"),
        has_many(
            "ActivityReports",
            "collaborators",
            "ActivityReportCollaborators",
            "activityReportId",
        ),
        has_many(
            "ActivityReports",
            "activityRecipients",
            "ActivityRecipients",
            "activityReportId",
        ),
        has_many(
            "ActivityReports",
            "reportObjectives",
            "ActivityReportObjectives",
            "activityReportId",
        ),
        has_many("ActivityReports", "files", "ActivityReportFiles", "activityReportId"),
        has_many(
            "ActivityReports",
            "resources",
            "ActivityReportResources",
            "activityReportId",
        ),
        has_many("ActivityReports", "nextSteps", "NextSteps", "activityReportId"),
        has_many(
            "ActivityReports",
            "approvers",
            "ActivityReportApprovers",
            "activityReportId",
        ),
        has_many(
            "ActivityReports",
            "reportGoals",
            "ActivityReportGoals",
            "activityReportId",
        ),
        belongs_to("ActivityReportCollaborators", "user", "userId", "Users"),
        belongs_to("ActivityRecipients", "grant", "grantId", "Grants"),
        belongs_to("ActivityRecipients", "otherEntity", "otherEntityId", "OtherEntities"),
        has_many(
            "ActivityReportObjectives",
            "topics",
            "ActivityReportObjectiveTopics",
            "activityReportObjectiveId",
        ),
        has_many(
            "ActivityReportObjectives",
            "resources",
            "ActivityReportObjectiveResources",
            "activityReportObjectiveId",
        ),
        belongs_to("ActivityReportObjectiveTopics", "topic", "topicId", "Topics"),
        belongs_to(
            "ActivityReportObjectiveResources",
            "resource",
            "resourceId",
            "Resources",
        ),
        belongs_to("ActivityReportFiles", "file", "fileId", "Files"),
        belongs_to("ActivityReportResources", "resource", "resourceId", "Resources"),
        has_many("NextSteps", "resources", "NextStepResources", "nextStepId"),
        belongs_to("NextStepResources", "resource", "resourceId", "Resources"),
        has_many(
            "EventReportPilots",
            "nationalCenterUsers",
            "EventReportPilotNationalCenterUsers",
            "eventReportPilotId",
        ),
        belongs_to("EventReportPilots", "owner", "ownerId", "Users"),
        has_many("Users", "nationalCenterUsers", "NationalCenterUsers", "userId"),
        belongs_to(
            "NationalCenterUsers",
            "nationalCenter",
            "nationalCenterId",
            "NationalCenters",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_resolves_all_paths() {
        let catalog = Catalog::standard().unwrap();
        let paths = RelationPaths::resolve(&catalog).unwrap();
        assert!(!paths.grant.fans_out());
        assert!(paths.goal_report_files.fans_out());
        assert_eq!(paths.goal_report_files.hops().len(), 4);
    }

    #[test]
    fn test_aliases_follow_the_chain() {
        let catalog = Catalog::standard().unwrap();
        let path = catalog
            .path("Goals", &["reportGoals", "report", "files", "file"])
            .unwrap();
        let aliases: Vec<_> = path.hops().iter().map(|h| h.alias.as_str()).collect();
        assert_eq!(
            aliases,
            vec![
                "reportGoals",
                "reportGoals.report",
                "reportGoals.report.files",
                "reportGoals.report.files.file"
            ]
        );
        assert_eq!(
            path.terminal_column("originalFileName"),
            ColumnRef::new("reportGoals.report.files.file", "originalFileName")
        );
    }

    #[test]
    fn test_zero_hop_terminal_is_root() {
        let catalog = Catalog::standard().unwrap();
        let path = catalog.path("Grants", &[]).unwrap();
        assert_eq!(path.terminal_column("number"), ColumnRef::new("Grants", "number"));
        assert!(path.joins("root", JoinKind::Inner).is_empty());
    }

    #[test]
    fn test_joins_chain_parent_aliases() {
        let catalog = Catalog::standard().unwrap();
        let path = catalog.path("Grants", &["groupGrants", "group"]).unwrap();
        let joins = path.joins("root", JoinKind::Left);
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].other, ColumnRef::new("root", "id"));
        assert_eq!(joins[0].on_column, "grantId");
        assert_eq!(joins[1].other, ColumnRef::new("groupGrants", "groupId"));
        assert_eq!(joins[1].on_column, "id");
    }

    #[test]
    fn test_undefined_hop_is_configuration_error() {
        let catalog = Catalog::standard().unwrap();
        let err = catalog.path("Grants", &["nonsense"]).unwrap_err();
        assert!(matches!(err, ScopeError::Configuration(_)));
        assert!(catalog.path("Widgets", &[]).is_err());
    }

    #[test]
    fn test_edge_to_unknown_column_rejected() {
        let mut catalog = Catalog::new();
        catalog.add_table(table("A", &["id"])).unwrap();
        catalog.add_table(table("B", &["id"])).unwrap();
        let err = catalog.add_edge(has_many("A", "bs", "B", "aId")).unwrap_err();
        assert!(matches!(err, ScopeError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_table_and_edge_rejected() {
        let mut catalog = Catalog::new();
        catalog.add_table(table("A", &["id", "bId"])).unwrap();
        assert!(catalog.add_table(table("A", &["id"])).is_err());
        catalog.add_table(table("B", &["id"])).unwrap();
        catalog.add_edge(belongs_to("A", "b", "bId", "B")).unwrap();
        assert!(catalog.add_edge(belongs_to("A", "b", "bId", "B")).is_err());
    }

    #[test]
    fn test_require_rejects_undefined_column() {
        let catalog = Catalog::standard().unwrap();
        let path = catalog.path("Grants", &["recipient"]).unwrap();
        assert!(path.clone().require(&["name"]).is_ok());
        let err = path.require(&["name", "nickname"]).unwrap_err();
        assert!(err.to_string().contains("Recipients.nickname"));
    }

    fn catalog_without_goal_status() -> Catalog {
        let mut catalog = Catalog::new();
        for def in standard_tables() {
            let def = if def.name == "Goals" {
                table("Goals", &["id", "name", "createdAt", "grantId", "isRttapa"])
            } else {
                def
            };
            catalog.add_table(def).unwrap();
        }
        for edge in standard_edges() {
            catalog.add_edge(edge).unwrap();
        }
        catalog
    }

    #[test]
    fn test_missing_builder_column_fails_resolution() {
        let err = RelationPaths::resolve(&catalog_without_goal_status()).unwrap_err();
        assert!(matches!(err, ScopeError::Configuration(_)));
        assert!(err.to_string().contains("Goals.status"));
    }

    #[test]
    fn test_injected_catalog_missing_column_fails_construction() {
        let result = crate::ScopeCompiler::from_parts(
            crate::CompilerConfig::default(),
            catalog_without_goal_status(),
            crate::dispatch::DispatchTable::standard().unwrap(),
        );
        assert!(matches!(result, Err(ScopeError::Configuration(_))));
    }

    #[test]
    fn test_table_without_key_column_rejected() {
        let mut catalog = Catalog::new();
        let def = TableDef {
            name: "A",
            key: "id",
            columns: &["name"],
        };
        assert!(catalog.add_table(def).is_err());
    }
}
