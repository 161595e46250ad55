use lingo_core::engine::{AnswerStatus, Effect, Event, LessonState, reduce};
use lingo_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeOption, Hearts, LessonId, MAX_HEARTS, OptionId,
};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Action {
    Select(u64),
    Submit,
}

#[derive(Debug, Clone, Copy)]
enum StoreReply {
    Recorded,
    Waived,
    NoHearts,
    Failed,
}

fn lesson(len: usize, completed: &[bool]) -> Vec<Challenge> {
    (1..=len as u64)
        .map(|id| {
            let cid = ChallengeId::new(id);
            Challenge::new(
                cid,
                LessonId::new(1),
                ChallengeKind::Select,
                format!("Q{id}"),
                id as u32,
                (0..3)
                    .map(|i| ChallengeOption::new(OptionId::new(id * 10 + i), cid, "x", i == 0))
                    .collect(),
            )
            .unwrap()
            .with_completed(completed.get(id as usize - 1).copied().unwrap_or(false))
        })
        .collect()
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![(0u64..3).prop_map(Action::Select), Just(Action::Submit)]
}

fn reply() -> impl Strategy<Value = StoreReply> {
    prop_oneof![
        4 => Just(StoreReply::Recorded),
        1 => Just(StoreReply::Waived),
        1 => Just(StoreReply::NoHearts),
        1 => Just(StoreReply::Failed),
    ]
}

fn reply_event(effect: Effect, reply: StoreReply) -> Event {
    match (effect, reply) {
        (Effect::RecordCorrect(_), StoreReply::Recorded | StoreReply::Waived) => {
            Event::CorrectRecorded
        }
        (Effect::RecordIncorrect(_), StoreReply::Recorded) => {
            Event::IncorrectRecorded { heart_deducted: true }
        }
        (Effect::RecordIncorrect(_), StoreReply::Waived) => {
            Event::IncorrectRecorded { heart_deducted: false }
        }
        (_, StoreReply::NoHearts) => Event::InsufficientHearts,
        (_, StoreReply::Failed) => Event::WriteFailed,
    }
}

proptest! {
    #[test]
    fn hearts_and_index_stay_well_formed(
        len in 0usize..6,
        completed in proptest::collection::vec(any::<bool>(), 0..6),
        start_hearts in 0i64..=5,
        steps in proptest::collection::vec((action(), reply()), 0..80),
    ) {
        let challenges = lesson(len, &completed);
        let (mut state, _) = LessonState::start(&challenges, Hearts::new(start_hearts).unwrap());

        for (act, store) in steps {
            let before = state.clone();
            let event = match act {
                Action::Select(i) => {
                    let base = (before.challenge_index() as u64 + 1) * 10;
                    Event::Select(OptionId::new(base + i))
                }
                Action::Submit => Event::Submit,
            };

            let mut t = reduce(&state, &challenges, event);
            if let Some(effect) = t.effect {
                t = reduce(&t.state, &challenges, reply_event(effect, store));
                prop_assert!(t.effect.is_none());
            }
            state = t.state;

            prop_assert!(state.hearts().value() <= MAX_HEARTS);
            prop_assert!(!state.is_locked());
            prop_assert!(state.challenge_index() >= before.challenge_index());

            let advanced = state.challenge_index() - before.challenge_index();
            prop_assert!(advanced <= 1);
            if advanced == 1 {
                prop_assert!(matches!(act, Action::Submit));
                prop_assert_eq!(before.status(), AnswerStatus::Correct);
            }

            if matches!(act, Action::Submit) && before.status() == AnswerStatus::Wrong {
                prop_assert_eq!(state.status(), AnswerStatus::None);
                prop_assert_eq!(state.hearts(), before.hearts());
                prop_assert_eq!(state.challenge_index(), before.challenge_index());
            }

            if !before.is_practice() {
                prop_assert!(state.hearts() <= before.hearts());
            }
        }
    }
}
