use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use lingo_core::model::{CourseId, Lesson, LessonId, UserId};
use lingo_core::progress::UnitOverview;
use services::{AppServices, Clock, DEFAULT_LEADERBOARD_LIMIT};

mod config;
mod lesson;
mod render;

use config::Overrides;

#[derive(Parser)]
#[command(name = "lingo", version, about = "Bite-sized XRP lessons in the terminal")]
struct Cli {
    /// Path to the config file (defaults to ./lingo.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL or path, e.g. sqlite://./data/lingo.sqlite3
    #[arg(long, global = true)]
    db: Option<String>,

    /// Learner id
    #[arg(long, global = true)]
    user: Option<String>,

    /// Display name used when the learner is first created
    #[arg(long, global = true)]
    name: Option<String>,

    /// Print read-only output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available courses
    Courses,

    /// Make a course the active one
    Start {
        /// Course id
        course: u64,
    },

    /// Show the units of the active course and which lessons are done
    Learn,

    /// Play a lesson; the active one unless an id is given
    Lesson {
        #[arg(long)]
        id: Option<u64>,
    },

    /// Show the top learners by points
    Leaderboard {
        #[arg(long, default_value_t = DEFAULT_LEADERBOARD_LIMIT)]
        limit: u32,
    },
}

#[derive(Serialize)]
struct LearnPage {
    units: Vec<UnitOverview>,
    active_lesson: Option<Lesson>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = config::load_settings(
        cli.config.as_deref(),
        Overrides {
            database_url: cli.db,
            user_id: cli.user,
            user_name: cli.name,
        },
    )?;
    let db_url = config::prepare_database_url(&settings.database_url)?;
    let user = UserId::new(settings.user_id.as_str()).context("user id must not be blank")?;
    tracing::debug!(db = %db_url, user = %user, "settings loaded");

    let app = AppServices::new_sqlite(&db_url, Clock::system())
        .await
        .with_context(|| format!("failed to open database '{db_url}'"))?;
    let json = cli.json;

    match cli.command {
        Command::Courses => {
            let courses = app.courses().courses().await?;
            render::emit(json, courses.as_slice(), render::courses)?;
        }
        Command::Start { course } => {
            let progress = app
                .courses()
                .select_active_course(&user, settings.user_name.as_deref(), CourseId::new(course))
                .await?;
            render::emit(json, &progress, |p| {
                format!(
                    "Active course set to {course}. {} hearts, {} XP.\n",
                    p.hearts, p.points
                )
            })?;
        }
        Command::Learn => {
            let courses = app.courses();
            let page = LearnPage {
                units: courses.units(&user).await?,
                active_lesson: courses
                    .course_progress(&user)
                    .await?
                    .and_then(|p| p.active_lesson),
            };
            render::emit(json, &page, |p| {
                render::learn(&p.units, p.active_lesson.as_ref())
            })?;
        }
        Command::Lesson { id } => {
            let mut quiz = app.quizzes().start(&user, id.map(LessonId::new)).await?;
            let mut stdout = tokio::io::stdout();
            let outcome =
                lesson::play(&mut quiz, BufReader::new(tokio::io::stdin()), &mut stdout).await?;
            tracing::debug!(?outcome, lesson = %quiz.lesson().id, "lesson closed");
        }
        Command::Leaderboard { limit } => {
            let entries = app.courses().top_users(limit).await?;
            render::emit(json, entries.as_slice(), render::leaderboard)?;
        }
    }

    Ok(())
}
