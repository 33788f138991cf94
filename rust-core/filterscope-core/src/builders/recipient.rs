// SPDX-License-Identifier: PMPL-1.0-or-later
//! Recipient-rooted filters. Grant attributes match when any of the
//! recipient's grants has them.

use super::{contains, integer_in, text_in, BuildContext, Contribution, FilterArgs};
use crate::dispatch::{Condition, Topic, TopicRule, CONTAINS, MEMBERSHIP};

pub fn rules() -> Vec<TopicRule> {
    vec![
        TopicRule::new(Topic::Recipient, CONTAINS, recipient_name),
        TopicRule::new(Topic::Region, MEMBERSHIP, region),
        TopicRule::new(Topic::ProgramSpecialist, CONTAINS, program_specialist),
        TopicRule::new(Topic::GrantNumber, CONTAINS, grant_number),
        TopicRule::new(Topic::StateCode, &[Condition::Ctn], state_code),
        TopicRule::new(Topic::ProgramType, MEMBERSHIP, program_type),
    ]
}

fn recipient_name(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.recipient, "name").into()
}

fn region(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    integer_in(args, &ctx.paths.recipient_grants, "regionId").into()
}

fn program_specialist(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.recipient_grants, "programSpecialistName").into()
}

fn grant_number(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.recipient_grants, "number").into()
}

fn state_code(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    contains(ctx, args, &ctx.paths.recipient_grants, "stateCode").into()
}

fn program_type(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
    text_in(args, &ctx.paths.recipient_programs, "programType").into()
}
