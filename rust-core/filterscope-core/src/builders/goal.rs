// SPDX-License-Identifier: PMPL-1.0-or-later
//! Goal-rooted filters.

use super::{
    contains, contains_any, date_in, group_id_in, integer_in, one_of_texts, text_in, tokens,
    unusable, vocabulary_in, vocabulary_overlaps, BuildContext, Built, Contribution, FilterArgs,
};
use crate::config::NEEDS_STATUS;
use crate::dispatch::{Condition, Topic, TopicRule, CONTAINS, DATES, MEMBERSHIP};
use crate::exists::exists_along_path;
use crate::filters::FilterValue;
use crate::sql::Predicate;

/// `goalType` values.
pub const RTTAPA: &str = "RTTAPA";
pub const NON_RTTAPA: &str = "Non-RTTAPA";

pub fn rules() -> Vec<TopicRule> {
    vec![
        TopicRule::new(Topic::Status, MEMBERSHIP, status),
        TopicRule::new(Topic::CreateDate, DATES, create_date),
        TopicRule::new(Topic::Region, MEMBERSHIP, region),
        TopicRule::new(Topic::RecipientId, &[Condition::Ctn, Condition::In], recipient_id),
        TopicRule::new(Topic::GrantNumber, CONTAINS, grant_number),
        TopicRule::new(Topic::GrantNumber, MEMBERSHIP, grant_number_in),
        TopicRule::new(Topic::GoalType, MEMBERSHIP, goal_type),
        TopicRule::new(Topic::GoalName, CONTAINS, goal_name),
        TopicRule::new(Topic::Reason, MEMBERSHIP, reason),
        TopicRule::new(Topic::ReportTopic, MEMBERSHIP, topic),
        TopicRule::new(Topic::ReportText, CONTAINS, report_text),
        TopicRule::new(Topic::ResourceUrl, CONTAINS, resource_url),
        TopicRule::new(Topic::ResourceAttachment, CONTAINS, resource_attachment),
        TopicRule::new(Topic::Group, MEMBERSHIP, group),
    ]
}

fn status(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    goal_status(ctx, args).into()
}

/// `Needs Status`, in any letter case, selects goals whose status was never
/// set. The remaining entries are allow-listed.
fn goal_status(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Built {
    let (unset, listed): (Vec<&str>, Vec<&str>) = args
        .value
        .entries()
        .into_iter()
        .partition(|v| v.trim().eq_ignore_ascii_case(NEEDS_STATUS));
    let path = &ctx.paths.goal;
    let column = path.terminal_column("status");

    let mut alternatives = Vec::new();
    if !unset.is_empty() {
        alternatives.push(Predicate::IsNull {
            column: column.clone(),
        });
    }
    if !listed.is_empty() || unset.is_empty() {
        let listed = FilterValue::from(listed);
        let listed_args = FilterArgs {
            condition: args.condition,
            value: &listed,
        };
        match tokens(&listed_args, &ctx.config.vocabularies.goal_statuses) {
            Ok(values) => alternatives.push(one_of_texts(column, &values)),
            Err(rejection) if unset.is_empty() => return Err(rejection),
            Err(_) => {}
        }
    }
    Ok(exists_along_path(
        path,
        Predicate::or(alternatives),
        args.mode(),
    ))
}

fn create_date(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    date_in(ctx, args, &ctx.paths.goal, "createdAt").into()
}

fn region(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.goal_grant, "regionId").into()
}

fn recipient_id(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.goal_grant, "recipientId").into()
}

fn grant_number(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.goal_grant, "number").into()
}

/// Exact grant numbers.
fn grant_number_in(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(args, &ctx.paths.goal_grant, "number").into()
}

/// `RTTAPA` and `Non-RTTAPA` select on the goal's RTTAPA flag; any other
/// value leaves the scope untouched.
fn goal_type(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let entries = args.value.entries();
    let mut flags: Vec<String> = entries
        .iter()
        .filter_map(|entry| match entry.trim() {
            RTTAPA => Some("Yes".to_string()),
            NON_RTTAPA => Some("No".to_string()),
            _ => None,
        })
        .collect();
    flags.sort();
    flags.dedup();
    if flags.is_empty() {
        return Contribution::Reject(unusable(entries.len()));
    }
    let path = &ctx.paths.goal;
    Contribution::Constrain(exists_along_path(
        path,
        one_of_texts(path.terminal_column("isRttapa"), &flags),
        args.mode(),
    ))
}

fn goal_name(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.goal, "name").into()
}

/// Reasons of the reports the goal appears on.
fn reason(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    vocabulary_overlaps(
        args,
        &ctx.config.vocabularies.reasons,
        &[(&ctx.paths.goal_reports, "reason")],
    )
    .into()
}

fn topic(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    vocabulary_in(
        args,
        &ctx.config.vocabularies.topics,
        &ctx.paths.goal_objective_topics,
        "name",
    )
    .into()
}

/// Free text found in any narrative field of the goal's reports.
fn report_text(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let paths = ctx.paths;
    contains_any(
        ctx,
        args,
        &[
            (&paths.goal_reports, "context"),
            (&paths.goal_reports, "additionalNotes"),
            (&paths.goal_report_goals, "name"),
            (&paths.goal_report_objectives, "title"),
            (&paths.goal_report_objectives, "ttaProvided"),
            (&paths.goal_next_steps, "note"),
        ],
    )
    .into()
}

/// Resource URLs linked through reports, report goals, report objectives or
/// next steps.
fn resource_url(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    let paths = ctx.paths;
    contains_any(
        ctx,
        args,
        &[
            (&paths.goal_report_resources, "url"),
            (&paths.goal_report_goal_resources, "url"),
            (&paths.goal_report_objective_resources, "url"),
            (&paths.goal_next_step_resources, "url"),
        ],
    )
    .into()
}

fn resource_attachment(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.goal_report_files, "originalFileName").into()
}

fn group(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    group_id_in(ctx, args, &ctx.paths.goal_groups).into()
}
