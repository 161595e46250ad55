use chrono::Duration;
use lingo_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeOption, ChallengeProgress, Course, CourseId,
    Hearts, Lesson, LessonId, OptionId, Unit, UnitId, UserId, UserProgress, UserSubscription,
};
use lingo_core::time::fixed_now;
use storage::repository::{
    ChallengeProgressRepository, CorrectOutcome, CourseRepository, IncorrectOutcome,
    ProgressStore, ProgressWriteError, StorageError, SubscriptionRepository,
    UserProgressRepository, WaiveReason,
};
use storage::sqlite::SqliteRepository;

fn user() -> UserId {
    UserId::new("user_1").unwrap()
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
            ChallengeOption::new(OptionId::new(id * 10), cid, "right", true).with_image("/man.svg"),
            ChallengeOption::new(OptionId::new(id * 10 + 1), cid, "wrong", false)
                .with_audio("/wrong.mp3"),
        ],
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_catalogue(repo: &SqliteRepository, hearts: i64) {
    repo.upsert_course(&Course {
        id: CourseId::new(1),
        title: "XRP Basics".into(),
        image_src: "/es.svg".into(),
    })
    .await
    .unwrap();
    repo.upsert_unit(&Unit {
        id: UnitId::new(1),
        course_id: CourseId::new(1),
        title: "Unit 1".into(),
        description: "XRP Fundamentals".into(),
        order: 1,
    })
    .await
    .unwrap();
    for (id, order) in [(2, 2), (1, 1)] {
        repo.upsert_lesson(&Lesson {
            id: LessonId::new(id),
            unit_id: UnitId::new(1),
            title: format!("Lesson {id}"),
            order,
        })
        .await
        .unwrap();
    }
    for (id, order) in [(3, 3), (1, 1), (2, 2)] {
        repo.upsert_challenge(&challenge(id, 1, order)).await.unwrap();
    }

    let mut progress = UserProgress::new(user()).with_active_course(CourseId::new(1));
    progress.hearts = Hearts::new(hearts).unwrap();
    repo.upsert_user_progress(&progress).await.unwrap();
}

#[tokio::test]
async fn sqlite_catalogue_roundtrip_keeps_order_and_options() {
    let repo = connect("memdb_catalogue").await;
    seed_catalogue(&repo, 5).await;

    let lessons = repo.lessons_for_unit(UnitId::new(1)).await.unwrap();
    let ids: Vec<u64> = lessons.iter().map(|l| l.id.value()).collect();
    assert_eq!(ids, [1, 2]);

    let challenges = repo.challenges_for_lesson(LessonId::new(1)).await.unwrap();
    let ids: Vec<u64> = challenges.iter().map(|c| c.id().value()).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert_eq!(challenges[0].options().len(), 2);
    assert_eq!(challenges[0].correct_option().unwrap().id, OptionId::new(10));
    assert_eq!(
        challenges[0].options()[0].image_src.as_deref(),
        Some("/man.svg")
    );
    assert_eq!(
        challenges[0].options()[1].audio_src.as_deref(),
        Some("/wrong.mp3")
    );
    assert!(challenges.iter().all(|c| !c.completed()));

    let courses = repo.list_courses().await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].title, "XRP Basics");
}

#[tokio::test]
async fn sqlite_rejects_orphan_rows() {
    let repo = connect("memdb_orphans").await;
    let err = repo
        .upsert_unit(&Unit {
            id: UnitId::new(9),
            course_id: CourseId::new(42),
            title: "Orphan".into(),
            description: "no course".into(),
            order: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_correct_then_practice_replay() {
    let repo = connect("memdb_correct").await;
    seed_catalogue(&repo, 4).await;
    let now = fixed_now();

    let first = repo
        .record_correct(&user(), ChallengeId::new(1), now)
        .await
        .unwrap();
    assert_eq!(first, CorrectOutcome::Completed);

    let replay = repo
        .record_correct(&user(), ChallengeId::new(1), now)
        .await
        .unwrap();
    assert_eq!(replay, CorrectOutcome::Practiced);

    let progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.points, 20);
    assert_eq!(progress.hearts.value(), 5);

    let records = repo
        .progress_for_challenges(&user(), &[ChallengeId::new(1), ChallengeId::new(2)])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].completed);

    let waived = repo
        .record_incorrect(&user(), ChallengeId::new(1), now)
        .await
        .unwrap();
    assert_eq!(waived, IncorrectOutcome::Waived(WaiveReason::Practice));
}

#[tokio::test]
async fn sqlite_hearts_never_drop_below_zero() {
    let repo = connect("memdb_hearts").await;
    seed_catalogue(&repo, 2).await;
    let now = fixed_now();

    for _ in 0..2 {
        let outcome = repo
            .record_incorrect(&user(), ChallengeId::new(2), now)
            .await
            .unwrap();
        assert!(outcome.heart_deducted());
    }

    let err = repo
        .record_incorrect(&user(), ChallengeId::new(2), now)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressWriteError::InsufficientHearts));

    let err = repo
        .record_correct(&user(), ChallengeId::new(2), now)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressWriteError::InsufficientHearts));

    let progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.hearts, Hearts::EMPTY);
    assert_eq!(progress.points, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_wrong_answers_are_serialized() {
    let repo = connect("memdb_concurrent_hearts").await;
    seed_catalogue(&repo, 2).await;
    let now = fixed_now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.record_incorrect(&user(), ChallengeId::new(2), now)
                    .await
            })
        })
        .collect();

    let mut deducted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(IncorrectOutcome::Deducted) => deducted += 1,
            Err(ProgressWriteError::InsufficientHearts) => refused += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(deducted, 2);
    assert_eq!(refused, 6);
    let progress = repo.get_user_progress(&user()).await.unwrap().unwrap();
    assert_eq!(progress.hearts, Hearts::EMPTY);
}

#[tokio::test]
async fn sqlite_subscription_waives_until_grace_elapses() {
    let repo = connect("memdb_subscription").await;
    seed_catalogue(&repo, 0).await;
    let now = fixed_now();

    repo.upsert_subscription(&UserSubscription {
        user_id: user(),
        customer_id: "cus_1".into(),
        subscription_id: "sub_1".into(),
        price_id: "price_1".into(),
        current_period_end: now - Duration::hours(12),
    })
    .await
    .unwrap();

    let stored = repo.get_subscription(&user()).await.unwrap().unwrap();
    assert!(stored.is_active(now));

    let outcome = repo
        .record_incorrect(&user(), ChallengeId::new(3), now)
        .await
        .unwrap();
    assert_eq!(outcome, IncorrectOutcome::Waived(WaiveReason::Subscription));

    let later = now + Duration::days(1);
    let err = repo
        .record_incorrect(&user(), ChallengeId::new(3), later)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressWriteError::InsufficientHearts));
}

#[tokio::test]
async fn sqlite_leaderboard_and_raw_records() {
    let repo = connect("memdb_leaderboard").await;
    seed_catalogue(&repo, 5).await;

    let mut rival = UserProgress::new(UserId::new("user_2").unwrap()).with_name("Rival");
    rival.points = 50;
    repo.upsert_user_progress(&rival).await.unwrap();

    repo.insert_progress(&ChallengeProgress {
        user_id: user(),
        challenge_id: ChallengeId::new(3),
        completed: false,
    })
    .await
    .unwrap();
    let records = repo
        .progress_for_challenges(&user(), &[ChallengeId::new(3)])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].completed);

    let top = repo.top_users(10).await.unwrap();
    assert_eq!(top[0].user_name, "Rival");
    assert_eq!(top.len(), 2);
}
