use lingo_core::engine::{AnswerStatus, Signal};
use lingo_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeOption, Course, CourseId, Hearts, Lesson,
    LessonId, OptionId, Unit, UnitId, UserId, UserSubscription,
};
use lingo_core::time::fixed_now;
use services::{AppServices, Clock, LessonError, QuizSession, QuizStep, SessionError};
use storage::repository::{
    CourseRepository, InMemoryRepository, ProgressStore, Storage, SubscriptionRepository,
    UserProgressRepository,
};

fn user() -> UserId {
    UserId::new("learner").unwrap()
}

fn challenge(id: u64, lesson: u64, order: u32) -> Challenge {
    let cid = ChallengeId::new(id);
    Challenge::new(
        cid,
        LessonId::new(lesson),
        ChallengeKind::Select,
        format!("Question {id}"),
        order,
        vec![
            ChallengeOption::new(OptionId::new(id * 10), cid, "wrong", false),
            ChallengeOption::new(OptionId::new(id * 10 + 1), cid, "right", true),
            ChallengeOption::new(OptionId::new(id * 10 + 2), cid, "also wrong", false),
        ],
    )
    .unwrap()
}

/// Course 1: unit 1 holds lesson 1 (three challenges), lesson 2 (empty) and
/// lesson 3 (two challenges); unit 2 holds lesson 4 (one challenge).
async fn seeded() -> (InMemoryRepository, AppServices) {
    let repo = InMemoryRepository::new();
    repo.upsert_course(&Course {
        id: CourseId::new(1),
        title: "XRP Basics".into(),
        image_src: "/es.svg".into(),
    })
    .await
    .unwrap();
    for (id, order) in [(1, 1), (2, 2)] {
        repo.upsert_unit(&Unit {
            id: UnitId::new(id),
            course_id: CourseId::new(1),
            title: format!("Unit {id}"),
            description: "XRP".into(),
            order,
        })
        .await
        .unwrap();
    }
    for (id, unit, order) in [(1, 1, 1), (2, 1, 2), (3, 1, 3), (4, 2, 1)] {
        repo.upsert_lesson(&Lesson {
            id: LessonId::new(id),
            unit_id: UnitId::new(unit),
            title: format!("Lesson {id}"),
            order,
        })
        .await
        .unwrap();
    }
    for (id, lesson, order) in [(1, 1, 1), (2, 1, 2), (3, 1, 3), (4, 3, 1), (5, 3, 2), (6, 4, 1)] {
        repo.upsert_challenge(&challenge(id, lesson, order))
            .await
            .unwrap();
    }

    let services = AppServices::from_storage(
        &Storage::from_repository(repo.clone()),
        Clock::fixed(fixed_now()),
    );
    services
        .courses()
        .select_active_course(&user(), Some("Learner"), CourseId::new(1))
        .await
        .unwrap();
    (repo, services)
}

async fn set_hearts(repo: &InMemoryRepository, hearts: i64) {
    let mut progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    progress.hearts = Hearts::new(hearts).unwrap();
    repo.upsert_user_progress(&progress).await.unwrap();
}

async fn answer(quiz: &mut QuizSession, correct: bool) -> QuizStep {
    let option = quiz
        .current_challenge()
        .unwrap()
        .options()
        .iter()
        .find(|o| o.correct == correct)
        .unwrap()
        .id;
    quiz.select(option);
    quiz.submit().await
}

async fn answer_all_correctly(quiz: &mut QuizSession) -> Vec<Signal> {
    let mut signals = Vec::new();
    while !quiz.is_finished() {
        signals.extend(answer(quiz, true).await.signals);
        signals.extend(quiz.submit().await.signals);
    }
    signals
}

#[tokio::test]
async fn all_correct_lesson_reaches_hundred_percent() {
    let (repo, services) = seeded().await;
    let mut quiz = services.quizzes().start(&user(), None).await.unwrap();
    assert_eq!(quiz.lesson().id, LessonId::new(1));
    assert!(quiz.opening_signals().is_empty());

    let mut rx = quiz.subscribe();
    let signals = answer_all_correctly(&mut quiz).await;

    assert_eq!(quiz.view().percentage, 100);
    assert_eq!(quiz.state().hearts(), Hearts::FULL);
    let finished = signals.iter().find_map(|s| match s {
        Signal::Finished(c) => Some(*c),
        _ => None,
    });
    assert_eq!(finished.unwrap().points, 30);
    assert_eq!(
        rx.recv().await.unwrap(),
        Signal::AnsweredCorrectly {
            challenge_id: ChallengeId::new(1)
        }
    );

    let progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.points, 30);
    assert_eq!(progress.hearts, Hearts::FULL);

    let units = services.courses().units(&user()).await.unwrap();
    assert!(units[0].lessons[0].completed);
    assert_eq!(units[0].lessons[0].percentage, 100);
    assert!(!units[0].lessons[1].completed);
}

#[tokio::test]
async fn refused_wrong_answer_opens_hearts_prompt_without_changes() {
    let (repo, services) = seeded().await;
    set_hearts(&repo, 1).await;
    let mut quiz = services.quizzes().start(&user(), None).await.unwrap();
    assert_eq!(quiz.state().hearts().value(), 1);

    // The last heart is spent elsewhere after the lesson was loaded.
    repo.record_incorrect(&user(), ChallengeId::new(6), fixed_now())
        .await
        .unwrap();

    let mut rx = quiz.subscribe();
    let step = answer(&mut quiz, false).await;

    assert!(step.hearts_exhausted());
    assert_eq!(rx.recv().await.unwrap(), Signal::HeartsExhausted);
    assert_eq!(quiz.state().hearts().value(), 1);
    assert_eq!(quiz.state().status(), AnswerStatus::None);
    assert_eq!(quiz.state().challenge_index(), 0);

    let progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.hearts, Hearts::EMPTY);
}

#[tokio::test]
async fn wrong_answer_costs_one_heart_and_retry_keeps_position() {
    let (repo, services) = seeded().await;
    let mut quiz = services.quizzes().start(&user(), None).await.unwrap();

    let step = answer(&mut quiz, false).await;
    assert_eq!(
        step.signals,
        vec![Signal::AnsweredWrongly {
            challenge_id: ChallengeId::new(1),
            heart_lost: true
        }]
    );
    assert_eq!(quiz.state().hearts().value(), 4);

    let retry = quiz.submit().await;
    assert!(retry.signals.is_empty());
    assert_eq!(quiz.state().status(), AnswerStatus::None);
    assert_eq!(quiz.state().challenge_index(), 0);

    let progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.hearts.value(), 4);
}

#[tokio::test]
async fn empty_lesson_is_zero_percent_and_skipped_by_resolution() {
    let (_repo, services) = seeded().await;

    let loaded = services
        .lessons()
        .load_lesson(&user(), Some(LessonId::new(2)))
        .await
        .unwrap()
        .unwrap();
    assert!(loaded.challenges.is_empty());
    assert_eq!(loaded.percentage, 0);
    assert!(!loaded.is_completed());

    let quiz = services
        .quizzes()
        .start(&user(), Some(LessonId::new(2)))
        .await
        .unwrap();
    assert!(quiz.is_finished());
    assert!(matches!(quiz.opening_signals(), [Signal::Finished(c)] if c.points == 0));

    let mut first = services.quizzes().start(&user(), None).await.unwrap();
    answer_all_correctly(&mut first).await;

    let progress = services.courses().course_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.active_lesson.unwrap().id, LessonId::new(3));
    assert_eq!(services.lessons().lesson_percentage(&user()).await.unwrap(), 0);
}

#[tokio::test]
async fn practice_replay_restores_hearts_up_to_cap() {
    let (repo, services) = seeded().await;
    let mut first = services.quizzes().start(&user(), None).await.unwrap();
    answer_all_correctly(&mut first).await;
    set_hearts(&repo, 4).await;

    let mut quiz = services
        .quizzes()
        .start(&user(), Some(LessonId::new(1)))
        .await
        .unwrap();
    assert_eq!(quiz.opening_signals(), &[Signal::PracticeStarted]);
    assert_eq!(quiz.view().percentage, 0);
    assert_eq!(quiz.state().challenge_index(), 0);

    answer(&mut quiz, true).await;
    assert_eq!(quiz.state().hearts(), Hearts::FULL);
    quiz.submit().await;

    answer(&mut quiz, true).await;
    assert_eq!(quiz.state().hearts(), Hearts::FULL);
    quiz.submit().await;

    let wrong = answer(&mut quiz, false).await;
    assert_eq!(
        wrong.signals,
        vec![Signal::AnsweredWrongly {
            challenge_id: ChallengeId::new(3),
            heart_lost: false
        }]
    );

    let progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.hearts, Hearts::FULL);
    assert_eq!(progress.points, 50);
}

#[tokio::test]
async fn session_percentage_matches_stored_records() {
    let (_repo, services) = seeded().await;
    let mut quiz = services.quizzes().start(&user(), None).await.unwrap();

    for _ in 0..2 {
        answer(&mut quiz, true).await;
        quiz.submit().await;
    }
    let live = quiz.view().percentage;
    drop(quiz);

    let reloaded = services
        .lessons()
        .load_lesson(&user(), Some(LessonId::new(1)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live, 67);
    assert_eq!(reloaded.percentage, live);
    assert_eq!(services.lessons().lesson_percentage(&user()).await.unwrap(), live);

    let resumed = services.quizzes().start(&user(), None).await.unwrap();
    assert_eq!(resumed.state().challenge_index(), 2);
    assert_eq!(resumed.view().percentage, live);
}

#[tokio::test]
async fn finished_course_has_no_lesson_to_resume() {
    let (_repo, services) = seeded().await;
    for _ in 0..3 {
        let mut quiz = services.quizzes().start(&user(), None).await.unwrap();
        answer_all_correctly(&mut quiz).await;
    }

    let progress = services.courses().course_progress(&user()).await.unwrap().unwrap();
    assert!(progress.active_lesson.is_none());
    let err = services.quizzes().start(&user(), None).await.err().unwrap();
    assert!(matches!(err, SessionError::NoActiveLesson));

    let board = services.courses().top_users(10).await.unwrap();
    assert_eq!(board[0].user_name, "Learner");
    assert_eq!(board[0].points, 60);
}

#[tokio::test]
async fn unknown_course_and_lesson_are_reported() {
    let (_repo, services) = seeded().await;
    let err = services
        .courses()
        .select_active_course(&user(), None, CourseId::new(9))
        .await
        .unwrap_err();
    assert!(matches!(err, LessonError::CourseNotFound(_)));

    let err = services
        .quizzes()
        .start(&user(), Some(LessonId::new(99)))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::LessonNotFound(_)));

    let outline = services.courses().course(CourseId::new(1)).await.unwrap().unwrap();
    assert_eq!(outline.lesson_count(), 4);
    assert!(services.courses().course(CourseId::new(9)).await.unwrap().is_none());
}

#[tokio::test]
async fn subscribers_keep_their_hearts_and_are_flagged_in_the_view() {
    let (repo, services) = seeded().await;
    let mut quiz = services.quizzes().start(&user(), None).await.unwrap();
    assert!(!quiz.view().subscribed);
    drop(quiz);

    repo.upsert_subscription(&UserSubscription {
        user_id: user(),
        customer_id: "cus_1".into(),
        subscription_id: "sub_1".into(),
        price_id: "price_1".into(),
        current_period_end: fixed_now() + chrono::Duration::days(30),
    })
    .await
    .unwrap();

    quiz = services.quizzes().start(&user(), None).await.unwrap();
    assert!(quiz.is_subscribed());
    assert!(quiz.view().subscribed);

    let step = answer(&mut quiz, false).await;
    assert_eq!(
        step.signals,
        vec![Signal::AnsweredWrongly {
            challenge_id: ChallengeId::new(1),
            heart_lost: false
        }]
    );
    assert_eq!(quiz.state().hearts(), Hearts::FULL);
}
