use serde::Serialize;

use lingo_core::engine::AnswerStatus;
use lingo_core::model::{Course, LeaderboardEntry, Lesson};
use lingo_core::progress::UnitOverview;
use services::QuizView;

/// Print `value` as pretty JSON, or fall back to the text renderer.
pub fn emit<T: Serialize + ?Sized>(
    json: bool,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

pub fn courses(courses: &[Course]) -> String {
    if courses.is_empty() {
        return "No courses yet. Run the seed binary first.\n".into();
    }
    courses
        .iter()
        .map(|c| format!("{:>3}  {}\n", c.id.value(), c.title))
        .collect()
}

pub fn learn(units: &[UnitOverview], active_lesson: Option<&Lesson>) -> String {
    let active = active_lesson.map(|l| l.id);
    let mut out = String::new();
    for unit in units {
        out.push_str(&format!("{}: {}\n", unit.unit.title, unit.unit.description));
        for entry in &unit.lessons {
            let marker = if entry.completed {
                "x"
            } else if Some(entry.lesson.id) == active {
                ">"
            } else {
                " "
            };
            out.push_str(&format!(
                "  [{marker}] {:>3}  {} ({}%)\n",
                entry.lesson.id.value(),
                entry.lesson.title,
                entry.percentage
            ));
        }
    }
    if units.is_empty() {
        out.push_str("No active course. Pick one with `start <course>`.\n");
    } else if active.is_none() {
        out.push_str("Course finished.\n");
    }
    out
}

pub fn leaderboard(entries: &[LeaderboardEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(rank, e)| format!("{:>3}. {:<20} {:>6} XP\n", rank + 1, e.user_name, e.points))
        .collect()
}

pub fn quiz(view: &QuizView) -> String {
    let Some(challenge) = &view.challenge else {
        return String::new();
    };
    let hearts = if view.subscribed {
        "unlimited".to_owned()
    } else {
        view.hearts.to_string()
    };
    let mut out = format!(
        "\n[{}%] hearts: {}{}\n{} ({}/{})\n",
        view.percentage,
        hearts,
        if view.practice { " (practice)" } else { "" },
        challenge.title,
        challenge.position,
        challenge.total,
    );
    if challenge.title != challenge.question {
        out.push_str(&format!("  \"{}\"\n", challenge.question));
    }
    for (n, option) in challenge.options.iter().enumerate() {
        let mark = if option.selected { "*" } else { " " };
        out.push_str(&format!("{mark} {}. {}\n", n + 1, option.text));
    }
    match view.status {
        AnswerStatus::Correct => out.push_str("Nicely done! Press enter to continue.\n"),
        AnswerStatus::Wrong => out.push_str("Try again. Press enter to retry.\n"),
        AnswerStatus::None => {}
    }
    out
}
