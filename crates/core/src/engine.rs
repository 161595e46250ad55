//! Lesson scoring state machine.
//!
//! The engine is a pure reducer: `reduce(state, challenges, event)` returns a
//! new state, at most one store write to perform and the signals the
//! presentation layer should react to. Heart-affecting writes are never
//! assumed to succeed; the driver performs the returned [`Effect`] and feeds
//! the store's answer back as another [`Event`].

use serde::Serialize;

use crate::model::{Challenge, ChallengeId, Hearts, OptionId, POINTS_PER_CHALLENGE};
use crate::progress;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Feedback status of the current challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    #[default]
    None,
    Correct,
    Wrong,
}

/// Store write awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PendingWrite {
    Correct(ChallengeId),
    Incorrect(ChallengeId),
}

/// Snapshot of a running lesson.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonState {
    hearts: Hearts,
    percentage: f64,
    challenge_index: usize,
    status: AnswerStatus,
    selected_option: Option<OptionId>,
    practice: bool,
    pending: Option<PendingWrite>,
    total: usize,
}

/// Numbers shown on the completion screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub total_challenges: usize,
    pub points: u32,
    pub hearts: Hearts,
}

impl LessonState {
    /// Builds the initial state for a lesson from the learner's snapshot.
    ///
    /// Starts at the first challenge not yet completed. When every challenge
    /// is already completed the lesson is replayed from the start as practice
    /// and the percentage bar restarts at zero.
    #[must_use]
    pub fn start(challenges: &[Challenge], hearts: Hearts) -> (Self, Vec<Signal>) {
        let total = challenges.len();
        let completed = challenges.iter().filter(|c| c.completed()).count();
        let initial_percentage = progress::percentage(completed, total);
        let practice = total > 0 && completed == total;

        let challenge_index = challenges
            .iter()
            .position(|c| !c.completed())
            .unwrap_or(0);

        let state = Self {
            hearts,
            percentage: if practice {
                0.0
            } else {
                f64::from(initial_percentage)
            },
            challenge_index,
            status: AnswerStatus::None,
            selected_option: None,
            practice,
            pending: None,
            total,
        };

        let mut signals = Vec::new();
        if practice {
            signals.push(Signal::PracticeStarted);
        }
        if state.is_finished() {
            signals.push(Signal::Finished(state.completion_unchecked()));
        }
        (state, signals)
    }

    #[must_use]
    pub fn hearts(&self) -> Hearts {
        self.hearts
    }

    /// Progress bar value; may be fractional between challenges.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rounded_percentage(&self) -> u8 {
        self.percentage.clamp(0.0, 100.0).round() as u8
    }

    #[must_use]
    pub fn challenge_index(&self) -> usize {
        self.challenge_index
    }

    #[must_use]
    pub fn status(&self) -> AnswerStatus {
        self.status
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<OptionId> {
        self.selected_option
    }

    #[must_use]
    pub fn is_practice(&self) -> bool {
        self.practice
    }

    #[must_use]
    pub fn pending(&self) -> Option<PendingWrite> {
        self.pending
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// True while a store write is in flight; input is ignored meanwhile.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.challenge_index >= self.total
    }

    #[must_use]
    pub fn current_challenge<'a>(&self, challenges: &'a [Challenge]) -> Option<&'a Challenge> {
        challenges.get(self.challenge_index)
    }

    /// Completion numbers, once every challenge has been passed.
    #[must_use]
    pub fn completion(&self) -> Option<Completion> {
        self.is_finished().then(|| self.completion_unchecked())
    }

    fn completion_unchecked(&self) -> Completion {
        let total = u32::try_from(self.total).unwrap_or(u32::MAX);
        Completion {
            total_challenges: self.total,
            points: total.saturating_mul(POINTS_PER_CHALLENGE),
            hearts: self.hearts,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn challenge_share(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 / self.total as f64
        }
    }
}

//
// ─── EVENTS / EFFECTS / SIGNALS ────────────────────────────────────────────────
//

/// Input to the reducer: user actions and store confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Select(OptionId),
    Submit,
    /// The store recorded a correct answer.
    CorrectRecorded,
    /// The store recorded a wrong answer; `heart_deducted` is false when the
    /// loss was waived (practice replay or active subscription).
    IncorrectRecorded { heart_deducted: bool },
    /// The store refused the write because the learner has no hearts left.
    InsufficientHearts,
    /// The write failed for any other reason.
    WriteFailed,
}

/// Store write the driver must perform before the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    RecordCorrect(ChallengeId),
    RecordIncorrect(ChallengeId),
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The lesson was already complete; this run only restores hearts.
    PracticeStarted,
    AnsweredCorrectly { challenge_id: ChallengeId },
    AnsweredWrongly {
        challenge_id: ChallengeId,
        heart_lost: bool,
    },
    /// A wrong answer was refused for lack of hearts; open the hearts prompt.
    HeartsExhausted,
    /// Generic retryable failure.
    WriteFailed,
    Advanced { challenge_index: usize },
    Finished(Completion),
}

/// Why an event left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    Finished,
    Locked,
    FeedbackShown,
    NoSelection,
    UnknownOption,
    NoCorrectOption,
    Unexpected,
    /// A correct answer was refused for lack of hearts.
    CorrectRefused,
}

/// Result of a single reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: LessonState,
    pub effect: Option<Effect>,
    pub signals: Vec<Signal>,
    pub ignored: Option<Ignored>,
}

impl Transition {
    fn unchanged(state: &LessonState, why: Ignored) -> Self {
        Self {
            state: state.clone(),
            effect: None,
            signals: Vec::new(),
            ignored: Some(why),
        }
    }

    fn to(state: LessonState) -> Self {
        Self {
            state,
            effect: None,
            signals: Vec::new(),
            ignored: None,
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }

    fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }
}

//
// ─── REDUCER ───────────────────────────────────────────────────────────────────
//

/// Applies one event to the lesson state.
///
/// `challenges` must be the same ordered slice the state was started with.
#[must_use]
pub fn reduce(state: &LessonState, challenges: &[Challenge], event: Event) -> Transition {
    match event {
        Event::Select(option) => select(state, challenges, option),
        Event::Submit => submit(state, challenges),
        Event::CorrectRecorded => correct_recorded(state),
        Event::IncorrectRecorded { heart_deducted } => incorrect_recorded(state, heart_deducted),
        Event::InsufficientHearts => insufficient_hearts(state),
        Event::WriteFailed => write_failed(state),
    }
}

fn select(state: &LessonState, challenges: &[Challenge], option: OptionId) -> Transition {
    if state.is_locked() {
        return Transition::unchanged(state, Ignored::Locked);
    }
    let Some(challenge) = state.current_challenge(challenges) else {
        return Transition::unchanged(state, Ignored::Finished);
    };
    if state.status != AnswerStatus::None {
        return Transition::unchanged(state, Ignored::FeedbackShown);
    }
    if challenge.option(option).is_none() {
        return Transition::unchanged(state, Ignored::UnknownOption);
    }

    let mut next = state.clone();
    next.selected_option = Some(option);
    Transition::to(next)
}

fn submit(state: &LessonState, challenges: &[Challenge]) -> Transition {
    if state.is_locked() {
        return Transition::unchanged(state, Ignored::Locked);
    }
    let Some(selected) = state.selected_option else {
        return Transition::unchanged(state, Ignored::NoSelection);
    };

    match state.status {
        AnswerStatus::Wrong => {
            let mut next = state.clone();
            next.status = AnswerStatus::None;
            next.selected_option = None;
            Transition::to(next)
        }
        AnswerStatus::Correct => {
            let mut next = state.clone();
            next.challenge_index += 1;
            next.status = AnswerStatus::None;
            next.selected_option = None;
            let advanced = Signal::Advanced {
                challenge_index: next.challenge_index,
            };
            let finished = next.completion();
            let mut transition = Transition::to(next).with_signal(advanced);
            if let Some(completion) = finished {
                transition = transition.with_signal(Signal::Finished(completion));
            }
            transition
        }
        AnswerStatus::None => {
            let Some(challenge) = state.current_challenge(challenges) else {
                return Transition::unchanged(state, Ignored::Finished);
            };
            let Some(correct) = challenge.correct_option() else {
                return Transition::unchanged(state, Ignored::NoCorrectOption);
            };

            let mut next = state.clone();
            if selected == correct.id {
                next.pending = Some(PendingWrite::Correct(challenge.id()));
                Transition::to(next).with_effect(Effect::RecordCorrect(challenge.id()))
            } else {
                next.pending = Some(PendingWrite::Incorrect(challenge.id()));
                Transition::to(next).with_effect(Effect::RecordIncorrect(challenge.id()))
            }
        }
    }
}

fn correct_recorded(state: &LessonState) -> Transition {
    let Some(PendingWrite::Correct(challenge_id)) = state.pending else {
        return Transition::unchanged(state, Ignored::Unexpected);
    };

    let mut next = state.clone();
    next.pending = None;
    next.status = AnswerStatus::Correct;
    next.percentage += state.challenge_share();
    if state.practice {
        next.hearts = state.hearts.gain();
    }
    Transition::to(next).with_signal(Signal::AnsweredCorrectly { challenge_id })
}

fn incorrect_recorded(state: &LessonState, heart_deducted: bool) -> Transition {
    let Some(PendingWrite::Incorrect(challenge_id)) = state.pending else {
        return Transition::unchanged(state, Ignored::Unexpected);
    };

    let mut next = state.clone();
    next.pending = None;
    next.status = AnswerStatus::Wrong;
    if heart_deducted {
        next.hearts = state.hearts.lose();
    }
    Transition::to(next).with_signal(Signal::AnsweredWrongly {
        challenge_id,
        heart_lost: heart_deducted,
    })
}

fn insufficient_hearts(state: &LessonState) -> Transition {
    let mut next = state.clone();
    match state.pending {
        Some(PendingWrite::Incorrect(_)) => {
            next.pending = None;
            Transition::to(next).with_signal(Signal::HeartsExhausted)
        }
        Some(PendingWrite::Correct(_)) => {
            next.pending = None;
            let mut transition = Transition::to(next);
            transition.ignored = Some(Ignored::CorrectRefused);
            transition
        }
        None => Transition::unchanged(state, Ignored::Unexpected),
    }
}

fn write_failed(state: &LessonState) -> Transition {
    if state.pending.is_none() {
        return Transition::unchanged(state, Ignored::Unexpected);
    }
    let mut next = state.clone();
    next.pending = None;
    Transition::to(next).with_signal(Signal::WriteFailed)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
