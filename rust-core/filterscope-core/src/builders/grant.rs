// SPDX-License-Identifier: PMPL-1.0-or-later
//! Grant-rooted filters.

use super::{
    active_within, contains, group_name_in, integer_in, text_in, BuildContext, Contribution,
    FilterArgs,
};
use crate::dispatch::{Condition, Topic, TopicRule, CONTAINS, DATES, MEMBERSHIP};

pub fn rules() -> Vec<TopicRule> {
    vec![
        TopicRule::new(Topic::Region, MEMBERSHIP, region),
        TopicRule::new(Topic::Recipient, CONTAINS, recipient_name),
        TopicRule::new(Topic::ProgramSpecialist, CONTAINS, program_specialist),
        TopicRule::new(Topic::ProgramType, MEMBERSHIP, program_type),
        TopicRule::new(Topic::GrantNumber, CONTAINS, grant_number),
        TopicRule::new(Topic::StateCode, &[Condition::Ctn], state_code),
        TopicRule::new(Topic::StartDate, DATES, active_dates),
        TopicRule::new(Topic::Group, MEMBERSHIP, group),
        TopicRule::new(Topic::GoalName, CONTAINS, goal_name),
    ]
}

fn region(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.grant, "regionId").into()
}

fn recipient_name(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.grant_recipient, "name").into()
}

fn program_specialist(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.grant, "programSpecialistName").into()
}

fn program_type(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(args, &ctx.paths.grant_programs, "programType").into()
}

fn grant_number(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.grant, "number").into()
}

fn state_code(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.grant, "stateCode").into()
}

/// Grants active at some point in the window.
fn active_dates(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    active_within(ctx, args, &ctx.paths.grant, "startDate", "endDate").into()
}

fn group(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    group_name_in(ctx, args, &ctx.paths.grant_groups).into()
}

fn goal_name(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.grant_goals, "name").into()
}
