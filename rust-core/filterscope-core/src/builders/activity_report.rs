// SPDX-License-Identifier: PMPL-1.0-or-later
//! Activity-report-rooted filters.

use super::{
    contains, contains_any, date_in, group_id_in, integer_in, one_of_texts, text_in,
    text_overlaps, tokens, unusable, vocabulary_overlaps, BuildContext, Built, Contribution,
    FilterArgs,
};
use crate::dispatch::{Condition, Topic, TopicRule, CONTAINS, DATES, MEMBERSHIP, TEXT_MATCH};
use crate::exists::{count_along_path, exists_along_any, exists_along_path, Association};
use crate::relation::RelationPath;
use crate::sql::{CompareOp, Predicate, Value};

/// `singleOrMultiRecipients` values.
pub const SINGLE_RECIPIENT: &str = "single-recipient";
pub const MULTI_RECIPIENTS: &str = "multi-recipients";

/// TTA types; a `ttaType` entry joins them with commas.
pub const TRAINING: &str = "training";
pub const TECHNICAL_ASSISTANCE: &str = "technical-assistance";

/// `myReports` parts.
pub const CREATOR: &str = "Creator";
pub const COLLABORATOR: &str = "Collaborator";
pub const APPROVER: &str = "Approver";

pub fn rules() -> Vec<TopicRule> {
    vec![
        TopicRule::new(Topic::ReportId, MEMBERSHIP, report_id),
        TopicRule::new(Topic::Region, MEMBERSHIP, region),
        TopicRule::new(Topic::Recipient, CONTAINS, recipient_name),
        TopicRule::new(Topic::RecipientId, &[Condition::Ctn, Condition::In], recipient_id),
        TopicRule::new(Topic::GrantNumber, CONTAINS, grant_number),
        TopicRule::new(Topic::StateCode, &[Condition::Ctn], state_code),
        TopicRule::new(Topic::ProgramSpecialist, TEXT_MATCH, program_specialist),
        TopicRule::new(Topic::ProgramType, MEMBERSHIP, program_type),
        TopicRule::new(
            Topic::SingleOrMultiRecipients,
            &[Condition::In],
            recipient_count,
        ),
        TopicRule::new(Topic::StartDate, DATES, start_date),
        TopicRule::new(Topic::EndDate, DATES, end_date),
        TopicRule::new(Topic::LastSaved, DATES, last_saved),
        TopicRule::new(Topic::Creator, TEXT_MATCH, creator),
        TopicRule::new(Topic::Collaborators, TEXT_MATCH, collaborators),
        TopicRule::new(Topic::MyReports, MEMBERSHIP, my_reports),
        TopicRule::new(Topic::Role, MEMBERSHIP, role),
        TopicRule::new(Topic::ReportTopic, MEMBERSHIP, topic),
        TopicRule::new(Topic::Reason, MEMBERSHIP, reason),
        TopicRule::new(Topic::Status, MEMBERSHIP, status),
        TopicRule::new(Topic::ResourceAttachment, CONTAINS, resource_attachment),
        TopicRule::new(Topic::ReportText, CONTAINS, report_text),
        TopicRule::new(Topic::OtherEntities, MEMBERSHIP, other_entities),
        TopicRule::new(Topic::DeliveryMethod, MEMBERSHIP, delivery_method),
        TopicRule::new(Topic::Participants, MEMBERSHIP, participants),
        TopicRule::new(Topic::TargetPopulations, MEMBERSHIP, target_populations),
        TopicRule::new(Topic::TtaType, MEMBERSHIP, tta_type),
        TopicRule::new(Topic::Group, MEMBERSHIP, group),
    ]
}

fn report_id(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.report, "id").into()
}

fn region(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.report, "regionId").into()
}

/// Recipient name or other-entity name.
fn recipient_name(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let paths = ctx.paths;
    contains_any(
        ctx,
        args,
        &[
            (&paths.report_recipients, "name"),
            (&paths.report_other_entities, "name"),
        ],
    )
    .into()
}

fn recipient_id(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.report_grants, "recipientId").into()
}

fn grant_number(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.report_grants, "number").into()
}

fn state_code(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.report_grants, "stateCode").into()
}

fn program_specialist(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.report_grants, "programSpecialistName").into()
}

fn program_type(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(args, &ctx.paths.report_programs, "programType").into()
}

/// Reports by the number of distinct recipients they cover.
fn recipient_count(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let path = &ctx.paths.report_recipients;
    let mut predicates = Vec::new();
    let mut dropped = 0;
    for entry in args.value.entries() {
        let (op, n) = match entry.trim() {
            SINGLE_RECIPIENT => (CompareOp::Eq, 1),
            MULTI_RECIPIENTS => (CompareOp::Gt, 1),
            _ => {
                dropped += 1;
                continue;
            }
        };
        predicates.push(count_along_path(path, op, n).predicate);
    }
    if predicates.is_empty() {
        return Contribution::Reject(unusable(dropped));
    }
    Contribution::Constrain(Association::new(Predicate::or(predicates)))
}

fn start_date(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    date_in(ctx, args, &ctx.paths.report, "startDate").into()
}

fn end_date(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    date_in(ctx, args, &ctx.paths.report, "endDate").into()
}

fn last_saved(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    date_in(ctx, args, &ctx.paths.report, "updatedAt").into()
}

fn creator(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.report_author, "name").into()
}

fn collaborators(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.report_collaborators, "name").into()
}

/// Reports where the requesting user is the author, a collaborator or an
/// approver, per the parts named. Ignored without a user.
fn my_reports(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let entries = args.value.entries();
    let Some(user) = ctx.options.user_id else {
        return Contribution::Reject(unusable(entries.len()));
    };
    let paths = ctx.paths;
    let parts: [(&str, &RelationPath); 3] = [
        (CREATOR, &paths.report),
        (COLLABORATOR, &paths.report_collaborator_links),
        (APPROVER, &paths.report_approvers),
    ];
    let targets: Vec<(&RelationPath, Predicate)> = parts
        .into_iter()
        .filter(|(part, _)| entries.iter().any(|e| e.trim().eq_ignore_ascii_case(part)))
        .map(|(_, path)| {
            let is_user = Predicate::Equals {
                column: path.terminal_column("userId"),
                value: Value::Int(user),
            };
            (path, is_user)
        })
        .collect();
    if targets.is_empty() {
        return Contribution::Reject(unusable(entries.len()));
    }
    Contribution::Constrain(exists_along_any(targets, args.mode()))
}

/// Author or any collaborator holds one of the roles.
fn role(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let paths = ctx.paths;
    vocabulary_overlaps(
        args,
        &ctx.config.vocabularies.roles,
        &[
            (&paths.report_author, "role"),
            (&paths.report_collaborators, "role"),
        ],
    )
    .into()
}

/// Report-level topics or topics of the report's objectives.
fn topic(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    report_topics(ctx, args).into()
}

fn report_topics(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Built {
    let values = tokens(args, &ctx.config.vocabularies.topics)?;
    let paths = ctx.paths;
    let on_report = Predicate::Overlaps {
        column: paths.report.terminal_column("topics"),
        values: values.clone(),
    };
    let on_objectives = one_of_texts(
        paths.report_objective_topics.terminal_column("name"),
        &values,
    );
    Ok(exists_along_any(
        [
            (&paths.report, on_report),
            (&paths.report_objective_topics, on_objectives),
        ],
        args.mode(),
    ))
}

fn reason(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    vocabulary_overlaps(
        args,
        &ctx.config.vocabularies.reasons,
        &[(&ctx.paths.report, "reason")],
    )
    .into()
}

/// Partial match on the calculated status, so `app` finds approved reports.
fn status(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.report, "calculatedStatus").into()
}

fn resource_attachment(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.report_files, "originalFileName").into()
}

/// Free text found in the report narrative, its goals, objectives or next
/// steps.
fn report_text(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let paths = ctx.paths;
    contains_any(
        ctx,
        args,
        &[
            (&paths.report, "context"),
            (&paths.report, "additionalNotes"),
            (&paths.report_goals, "name"),
            (&paths.report_objectives, "title"),
            (&paths.report_objectives, "ttaProvided"),
            (&paths.report_next_steps, "note"),
        ],
    )
    .into()
}

fn other_entities(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(args, &ctx.paths.report_other_entities, "name").into()
}

fn delivery_method(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(args, &ctx.paths.report, "deliveryMethod").into()
}

fn participants(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_overlaps(args, &ctx.paths.report, "participants").into()
}

fn target_populations(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_overlaps(args, &ctx.paths.report, "targetPopulations").into()
}

/// Each entry names one combination of TTA types, such as
/// `training,technical-assistance`. A report matches when its types are
/// exactly one of the combinations.
fn tta_type(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let entries = args.value.entries();
    let mut combinations: Vec<Vec<String>> = Vec::new();
    for entry in &entries {
        let mut types: Vec<String> = entry.split(',').map(|t| t.trim().to_string()).collect();
        types.sort();
        types.dedup();
        let known = types.iter().all(|t| t == TRAINING || t == TECHNICAL_ASSISTANCE);
        if known && !combinations.contains(&types) {
            combinations.push(types);
        }
    }
    if combinations.is_empty() {
        return Contribution::Reject(unusable(entries.len()));
    }
    let path = &ctx.paths.report;
    let column = path.terminal_column("ttaType");
    let predicate = Predicate::or(
        combinations
            .into_iter()
            .map(|values| Predicate::SameElements {
                column: column.clone(),
                values,
            })
            .collect(),
    );
    Contribution::Constrain(exists_along_path(path, predicate, args.mode()))
}

/// Groups by id, through the report's grants.
fn group(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    group_id_in(ctx, args, &ctx.paths.report_groups).into()
}
