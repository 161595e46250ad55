//! Server-side heart and point rules shared by every store backend.

use lingo_core::model::Hearts;

use crate::repository::{CorrectOutcome, IncorrectOutcome, WaiveReason};

/// What a backend should do with a correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CorrectPlan {
    Refuse,
    Apply(CorrectOutcome),
}

/// What a backend should do with a wrong answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IncorrectPlan {
    Refuse,
    Waive(WaiveReason),
    Deduct,
}

/// A challenge the learner already has a record for is a practice replay.
pub(crate) fn plan_correct(hearts: Hearts, has_record: bool, subscribed: bool) -> CorrectPlan {
    if has_record {
        return CorrectPlan::Apply(CorrectOutcome::Practiced);
    }
    if hearts.is_empty() && !subscribed {
        return CorrectPlan::Refuse;
    }
    CorrectPlan::Apply(CorrectOutcome::Completed)
}

pub(crate) fn plan_incorrect(hearts: Hearts, has_record: bool, subscribed: bool) -> IncorrectPlan {
    if has_record {
        return IncorrectPlan::Waive(WaiveReason::Practice);
    }
    if subscribed {
        return IncorrectPlan::Waive(WaiveReason::Subscription);
    }
    if hearts.is_empty() {
        return IncorrectPlan::Refuse;
    }
    IncorrectPlan::Deduct
}

impl From<WaiveReason> for IncorrectOutcome {
    fn from(reason: WaiveReason) -> Self {
        IncorrectOutcome::Waived(reason)
    }
}
