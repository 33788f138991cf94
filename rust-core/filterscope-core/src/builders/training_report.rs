// SPDX-License-Identifier: PMPL-1.0-or-later
//! Training-report-rooted filters.

use super::{contains, date_in, integer_in, text_in, BuildContext, Contribution, FilterArgs};
use crate::dispatch::{Topic, TopicRule, CONTAINS, DATES, MEMBERSHIP};

pub fn rules() -> Vec<TopicRule> {
    vec![
        TopicRule::new(Topic::Region, MEMBERSHIP, region),
        TopicRule::new(Topic::StartDate, DATES, start_date),
        TopicRule::new(Topic::EventId, CONTAINS, event_id),
        TopicRule::new(Topic::Collaborators, MEMBERSHIP, collaborators),
        TopicRule::new(Topic::Creator, MEMBERSHIP, creator),
    ]
}

fn region(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.training_report, "regionId").into()
}

fn start_date(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    date_in(ctx, args, &ctx.paths.training_report, "startDate").into()
}

fn event_id(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.training_report, "eventId").into()
}

/// National centers of the event's collaborators.
fn collaborators(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(
        args,
        &ctx.paths.training_report_collaborator_centers,
        "nationalCenterName",
    )
    .into()
}

/// National centers of the event's owner.
fn creator(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(args, &ctx.paths.training_report_owner_centers, "name").into()
}
