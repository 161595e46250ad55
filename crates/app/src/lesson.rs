use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::TryRecvError};

use lingo_core::engine::{AnswerStatus, Signal};
use lingo_core::model::OptionId;
use services::QuizSession;

use crate::render;

/// How an interactive lesson ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    OutOfHearts,
    Quit,
}

/// Play `quiz` line by line: a number picks an option, an empty line
/// continues after feedback, `q` leaves.
pub async fn play<R, W>(quiz: &mut QuizSession, input: R, out: &mut W) -> anyhow::Result<Outcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut signals = quiz.subscribe();
    let mut lines = input.lines();

    if let Some(outcome) = react(quiz.opening_signals(), out).await? {
        return Ok(outcome);
    }

    loop {
        let view = quiz.view();
        out.write_all(render::quiz(&view).as_bytes()).await?;
        if view.status == AnswerStatus::None {
            out.write_all(b"answer (number, q to quit): ").await?;
        }
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(Outcome::Quit);
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(Outcome::Quit);
        }

        if view.status == AnswerStatus::None {
            let Some(option) = pick(quiz, line) else {
                out.write_all(b"Pick one of the listed numbers.\n").await?;
                continue;
            };
            quiz.select(option);
        }
        quiz.submit().await;

        if let Some(outcome) = react(&drain(&mut signals), out).await? {
            return Ok(outcome);
        }
    }
}

fn pick(quiz: &QuizSession, line: &str) -> Option<OptionId> {
    let n: usize = line.parse().ok()?;
    let options = quiz.current_challenge()?.options();
    options.get(n.checked_sub(1)?).map(|o| o.id)
}

fn drain(rx: &mut broadcast::Receiver<Signal>) -> Vec<Signal> {
    let mut signals = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(signal) => signals.push(signal),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "signal receiver lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return signals,
        }
    }
}

async fn react<W>(signals: &[Signal], out: &mut W) -> anyhow::Result<Option<Outcome>>
where
    W: AsyncWrite + Unpin,
{
    for signal in signals {
        match signal {
            Signal::PracticeStarted => {
                out.write_all(b"Practice run: correct answers refill your hearts.\n")
                    .await?;
            }
            Signal::AnsweredWrongly {
                heart_lost: false, ..
            } => {
                out.write_all(b"No heart lost this time.\n").await?;
            }
            Signal::HeartsExhausted => {
                out.write_all(
                    b"\nYou ran out of hearts. Practice a finished lesson to earn some back.\n",
                )
                .await?;
                return Ok(Some(Outcome::OutOfHearts));
            }
            Signal::WriteFailed => {
                out.write_all(b"Something went wrong. Please try again.\n")
                    .await?;
            }
            Signal::Finished(done) => {
                let text = format!(
                    "\nLesson complete! {} challenges, +{} XP, {} hearts left.\n",
                    done.total_challenges, done.points, done.hearts
                );
                out.write_all(text.as_bytes()).await?;
                return Ok(Some(Outcome::Finished));
            }
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use lingo_core::model::{
        Challenge, ChallengeId, ChallengeKind, ChallengeOption, Course, CourseId, Hearts, Lesson,
        LessonId, Unit, UnitId, UserId,
    };
    use lingo_core::time::fixed_clock;
    use services::AppServices;
    use storage::repository::{
        CourseRepository, InMemoryRepository, Storage, UserProgressRepository,
    };

    use super::*;

    async fn services_with_lesson(challenges: u64) -> (InMemoryRepository, AppServices, UserId) {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&Course {
            id: CourseId::new(1),
            title: "XRP Basics".into(),
            image_src: "/xrp.svg".into(),
        })
        .await
        .unwrap();
        repo.upsert_unit(&Unit {
            id: UnitId::new(1),
            course_id: CourseId::new(1),
            title: "Unit 1".into(),
            description: "Basics".into(),
            order: 1,
        })
        .await
        .unwrap();
        repo.upsert_lesson(&Lesson {
            id: LessonId::new(1),
            unit_id: UnitId::new(1),
            title: "Intro".into(),
            order: 1,
        })
        .await
        .unwrap();
        for id in 1..=challenges {
            let cid = ChallengeId::new(id);
            let challenge = Challenge::new(
                cid,
                LessonId::new(1),
                ChallengeKind::Select,
                format!("Question {id}"),
                u32::try_from(id).unwrap(),
                vec![
                    ChallengeOption::new(OptionId::new(id * 10), cid, "no", false),
                    ChallengeOption::new(OptionId::new(id * 10 + 1), cid, "yes", true),
                ],
            )
            .unwrap();
            repo.upsert_challenge(&challenge).await.unwrap();
        }

        let app = AppServices::from_storage(&Storage::from_repository(repo.clone()), fixed_clock());
        let user = UserId::new("tester").unwrap();
        app.courses()
            .select_active_course(&user, None, CourseId::new(1))
            .await
            .unwrap();
        (repo, app, user)
    }

    #[tokio::test]
    async fn plays_a_lesson_to_the_finish_screen() {
        let (_repo, app, user) = services_with_lesson(2).await;
        let mut quiz = app.quizzes().start(&user, None).await.unwrap();

        let input: &[u8] = b"1\n\n7\n2\n\n2\n\n";
        let mut out = Vec::new();
        let outcome = play(&mut quiz, input, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(outcome, Outcome::Finished);
        assert!(text.contains("Try again."));
        assert!(text.contains("Pick one of the listed numbers."));
        assert!(text.contains("Lesson complete! 2 challenges, +20 XP, 4 hearts left."));
    }

    #[tokio::test]
    async fn stops_at_the_hearts_prompt() {
        let (repo, app, user) = services_with_lesson(1).await;
        let mut progress = repo.get_user_progress(&user).await.unwrap().unwrap();
        progress.hearts = Hearts::EMPTY;
        repo.upsert_user_progress(&progress).await.unwrap();
        let mut quiz = app.quizzes().start(&user, None).await.unwrap();

        let input: &[u8] = b"1\n";
        let mut out = Vec::new();
        let outcome = play(&mut quiz, input, &mut out).await.unwrap();

        assert_eq!(outcome, Outcome::OutOfHearts);
        assert!(String::from_utf8(out).unwrap().contains("ran out of hearts"));
    }

    #[tokio::test]
    async fn end_of_input_quits() {
        let (_repo, app, user) = services_with_lesson(1).await;
        let mut quiz = app.quizzes().start(&user, None).await.unwrap();
        let input: &[u8] = b"";
        let mut out = Vec::new();
        assert_eq!(
            play(&mut quiz, input, &mut out).await.unwrap(),
            Outcome::Quit
        );
    }
}
