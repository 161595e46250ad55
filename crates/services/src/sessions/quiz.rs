use std::sync::Arc;

use tokio::sync::broadcast;

use lingo_core::engine::{Effect, Event, Ignored, LessonState, Signal, Transition, reduce};
use lingo_core::model::{Challenge, Lesson, OptionId, UserId};
use storage::repository::{ProgressStore, ProgressWriteError};

use super::view::QuizView;
use crate::Clock;
use crate::lesson_service::LoadedLesson;

/// Capacity of the signal channel; slow subscribers lag rather than block.
const SIGNAL_CAPACITY: usize = 64;

//
// ─── STEP RESULT ───────────────────────────────────────────────────────────────
//

/// What a single user action did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizStep {
    /// Signals published for this action, in order.
    pub signals: Vec<Signal>,
    /// Set when the action left the session untouched.
    pub ignored: Option<Ignored>,
}

impl QuizStep {
    fn from_transition(t: &Transition) -> Self {
        Self {
            signals: t.signals.clone(),
            ignored: t.ignored,
        }
    }

    #[must_use]
    pub fn hearts_exhausted(&self) -> bool {
        self.signals.contains(&Signal::HeartsExhausted)
    }

    #[must_use]
    pub fn finished(&self) -> bool {
        self.signals.iter().any(|s| matches!(s, Signal::Finished(_)))
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One play-through of a lesson.
///
/// Drives the pure lesson reducer: user actions go in, the resulting store
/// write is awaited, and the store's answer is reduced before the next action
/// is accepted. Taking `&mut self` keeps actions strictly sequential.
pub struct QuizSession {
    user: UserId,
    lesson: Lesson,
    challenges: Vec<Challenge>,
    state: LessonState,
    opening: Vec<Signal>,
    store: Arc<dyn ProgressStore>,
    clock: Clock,
    subscribed: bool,
    signals: broadcast::Sender<Signal>,
}

impl QuizSession {
    #[must_use]
    pub fn new(
        user: UserId,
        loaded: LoadedLesson,
        store: Arc<dyn ProgressStore>,
        clock: Clock,
    ) -> Self {
        let LoadedLesson {
            lesson,
            challenges,
            hearts,
            ..
        } = loaded;
        let (state, opening) = LessonState::start(&challenges, hearts);
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);

        tracing::info!(
            user = %user,
            lesson = %lesson.id,
            challenges = challenges.len(),
            start_index = state.challenge_index(),
            practice = state.is_practice(),
            "lesson session started"
        );

        Self {
            user,
            lesson,
            challenges,
            state,
            opening,
            store,
            clock,
            subscribed: false,
            signals,
        }
    }

    /// Mark the learner as an active subscriber for presentation.
    #[must_use]
    pub fn with_subscription(mut self, subscribed: bool) -> Self {
        self.subscribed = subscribed;
        self
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Subscribe to signals published by later actions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Signals raised when the session was built (practice replay, or an
    /// empty lesson that is finished right away).
    #[must_use]
    pub fn opening_signals(&self) -> &[Signal] {
        &self.opening
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    #[must_use]
    pub fn state(&self) -> &LessonState {
        &self.state
    }

    #[must_use]
    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.state.current_challenge(&self.challenges)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Presentation snapshot of the current state.
    #[must_use]
    pub fn view(&self) -> QuizView {
        QuizView::build(&self.state, &self.challenges, self.subscribed)
    }

    /// Choose an option of the current challenge.
    pub fn select(&mut self, option: OptionId) -> QuizStep {
        let t = reduce(&self.state, &self.challenges, Event::Select(option));
        self.apply(t)
    }

    /// Submit the selection: check it, continue after feedback, or retry
    /// after a wrong answer.
    ///
    /// A check performs the store write before returning; store failures
    /// surface as signals and never as errors.
    pub async fn submit(&mut self) -> QuizStep {
        let t = reduce(&self.state, &self.challenges, Event::Submit);
        let effect = t.effect;
        let mut step = self.apply(t);

        if let Some(effect) = effect {
            let event = self.perform(effect).await;
            let confirmed = reduce(&self.state, &self.challenges, event);
            let follow_up = self.apply(confirmed);
            step.signals.extend(follow_up.signals);
            step.ignored = follow_up.ignored;
        }

        if let Some(done) = self.state.completion().filter(|_| step.finished()) {
            tracing::info!(
                user = %self.user,
                lesson = %self.lesson.id,
                challenges = done.total_challenges,
                points = done.points,
                hearts = %done.hearts,
                "lesson session finished"
            );
        }
        step
    }

    async fn perform(&self, effect: Effect) -> Event {
        let now = self.clock.now();
        match effect {
            Effect::RecordCorrect(challenge) => {
                match self.store.record_correct(&self.user, challenge, now).await {
                    Ok(outcome) => {
                        tracing::debug!(%challenge, ?outcome, "correct answer recorded");
                        Event::CorrectRecorded
                    }
                    Err(ProgressWriteError::InsufficientHearts) => {
                        tracing::warn!(
                            user = %self.user,
                            challenge = %challenge,
                            "correct answer refused: no hearts left"
                        );
                        Event::InsufficientHearts
                    }
                    Err(err) => {
                        tracing::error!(
                            challenge = %challenge,
                            error = %err,
                            "recording correct answer failed"
                        );
                        Event::WriteFailed
                    }
                }
            }
            Effect::RecordIncorrect(challenge) => {
                match self.store.record_incorrect(&self.user, challenge, now).await {
                    Ok(outcome) => {
                        tracing::debug!(%challenge, ?outcome, "wrong answer recorded");
                        Event::IncorrectRecorded {
                            heart_deducted: outcome.heart_deducted(),
                        }
                    }
                    Err(ProgressWriteError::InsufficientHearts) => {
                        tracing::warn!(
                            user = %self.user,
                            challenge = %challenge,
                            "hearts exhausted"
                        );
                        Event::InsufficientHearts
                    }
                    Err(err) => {
                        tracing::error!(
                            challenge = %challenge,
                            error = %err,
                            "recording wrong answer failed"
                        );
                        Event::WriteFailed
                    }
                }
            }
        }
    }

    fn apply(&mut self, t: Transition) -> QuizStep {
        let step = QuizStep::from_transition(&t);
        if let Some(why) = t.ignored {
            tracing::debug!(?why, "event ignored");
        }
        self.state = t.state;
        for signal in &step.signals {
            // No subscribers is fine; the step still carries the signals.
            let _ = self.signals.send(signal.clone());
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use lingo_core::engine::AnswerStatus;
    use lingo_core::model::{
        ChallengeId, ChallengeKind, ChallengeOption, Hearts, LessonId, UnitId,
    };
    use lingo_core::time::fixed_clock;
    use std::sync::Mutex;
    use storage::repository::{CorrectOutcome, IncorrectOutcome, StorageError};

    /// Store that answers every write with a scripted result.
    #[derive(Default)]
    struct ScriptedStore {
        correct: Mutex<Vec<Result<CorrectOutcome, ProgressWriteError>>>,
        incorrect: Mutex<Vec<Result<IncorrectOutcome, ProgressWriteError>>>,
    }

    #[async_trait]
    impl ProgressStore for ScriptedStore {
        async fn record_correct(
            &self,
            _user: &UserId,
            _challenge: ChallengeId,
            _now: DateTime<Utc>,
        ) -> Result<CorrectOutcome, ProgressWriteError> {
            self.correct
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok(CorrectOutcome::Completed))
        }

        async fn record_incorrect(
            &self,
            _user: &UserId,
            _challenge: ChallengeId,
            _now: DateTime<Utc>,
        ) -> Result<IncorrectOutcome, ProgressWriteError> {
            self.incorrect
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok(IncorrectOutcome::Deducted))
        }
    }

    fn loaded(hearts: i64) -> LoadedLesson {
        let challenges = (1..=2)
            .map(|id| {
                let cid = ChallengeId::new(id);
                Challenge::new(
                    cid,
                    LessonId::new(1),
                    ChallengeKind::Select,
                    format!("Question {id}"),
                    u32::try_from(id).unwrap(),
                    vec![
                        ChallengeOption::new(OptionId::new(id * 10), cid, "right", true),
                        ChallengeOption::new(OptionId::new(id * 10 + 1), cid, "wrong", false),
                    ],
                )
                .unwrap()
            })
            .collect();
        LoadedLesson {
            lesson: Lesson {
                id: LessonId::new(1),
                unit_id: UnitId::new(1),
                title: "Basics".into(),
                order: 1,
            },
            challenges,
            hearts: Hearts::new(hearts).unwrap(),
            percentage: 0,
        }
    }

    fn session(store: ScriptedStore, hearts: i64) -> QuizSession {
        QuizSession::new(
            UserId::new("user_1").unwrap(),
            loaded(hearts),
            Arc::new(store),
            fixed_clock(),
        )
    }

    #[tokio::test]
    async fn signals_reach_subscribers_in_order() {
        let mut quiz = session(ScriptedStore::default(), 5);
        let mut rx = quiz.subscribe();

        quiz.select(OptionId::new(10));
        quiz.submit().await;
        quiz.submit().await;

        assert_eq!(
            rx.recv().await.unwrap(),
            Signal::AnsweredCorrectly {
                challenge_id: ChallengeId::new(1)
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            Signal::Advanced { challenge_index: 1 }
        );
    }

    #[tokio::test]
    async fn refused_wrong_answer_publishes_hearts_exhausted() {
        let store = ScriptedStore::default();
        store
            .incorrect
            .lock()
            .unwrap()
            .push(Err(ProgressWriteError::InsufficientHearts));
        let mut quiz = session(store, 1);
        let mut rx = quiz.subscribe();

        quiz.select(OptionId::new(11));
        let step = quiz.submit().await;

        assert!(step.hearts_exhausted());
        assert_eq!(rx.recv().await.unwrap(), Signal::HeartsExhausted);
        assert_eq!(quiz.state().status(), AnswerStatus::None);
        assert_eq!(quiz.state().hearts().value(), 1);
        assert!(!quiz.state().is_locked());
    }

    #[tokio::test]
    async fn storage_failure_is_a_retryable_signal() {
        let store = ScriptedStore::default();
        store
            .correct
            .lock()
            .unwrap()
            .push(Err(StorageError::Connection("down".into()).into()));
        let mut quiz = session(store, 5);

        quiz.select(OptionId::new(10));
        let step = quiz.submit().await;
        assert_eq!(step.signals, vec![Signal::WriteFailed]);
        assert_eq!(quiz.state().status(), AnswerStatus::None);
        assert_eq!(quiz.state().selected_option(), Some(OptionId::new(10)));

        let retry = quiz.submit().await;
        assert_eq!(
            retry.signals,
            vec![Signal::AnsweredCorrectly {
                challenge_id: ChallengeId::new(1)
            }]
        );
    }

    #[tokio::test]
    async fn waived_wrong_answer_keeps_hearts() {
        let store = ScriptedStore::default();
        store
            .incorrect
            .lock()
            .unwrap()
            .push(Ok(IncorrectOutcome::Waived(
                storage::repository::WaiveReason::Subscription,
            )));
        let mut quiz = session(store, 3);

        quiz.select(OptionId::new(11));
        let step = quiz.submit().await;
        assert_eq!(
            step.signals,
            vec![Signal::AnsweredWrongly {
                challenge_id: ChallengeId::new(1),
                heart_lost: false
            }]
        );
        assert_eq!(quiz.state().hearts().value(), 3);
    }
}
