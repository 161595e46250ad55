use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChallengeId, LessonId, OptionId};

/// Heading shown for `ASSIST` challenges instead of the raw question.
pub const ASSIST_TITLE: &str = "Select the correct meaning";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("challenge question cannot be empty")]
    EmptyQuestion,

    #[error("challenge {challenge} has no options")]
    NoOptions { challenge: ChallengeId },

    #[error("option {option} belongs to challenge {owner}, not {challenge}")]
    ForeignOption {
        challenge: ChallengeId,
        option: OptionId,
        owner: ChallengeId,
    },

    #[error("challenge {challenge} must have exactly one correct option, found {found}")]
    CorrectOptionCount { challenge: ChallengeId, found: usize },

    #[error("unknown challenge type: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a challenge is presented.
///
/// - `Select`: the question is the heading, options are picture cards.
/// - `Assist`: a fixed heading with the question in a speech bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeKind {
    Select,
    Assist,
}

impl ChallengeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeKind::Select => "SELECT",
            ChallengeKind::Assist => "ASSIST",
        }
    }

    /// Parses the persisted representation (`SELECT` / `ASSIST`).
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::UnknownKind` for any other value.
    pub fn parse(value: &str) -> Result<Self, ChallengeError> {
        match value {
            "SELECT" => Ok(Self::Select),
            "ASSIST" => Ok(Self::Assist),
            other => Err(ChallengeError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One answer option of a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeOption {
    pub id: OptionId,
    pub challenge_id: ChallengeId,
    pub text: String,
    pub correct: bool,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

impl ChallengeOption {
    #[must_use]
    pub fn new(id: OptionId, challenge_id: ChallengeId, text: impl Into<String>, correct: bool) -> Self {
        Self {
            id,
            challenge_id,
            text: text.into(),
            correct,
            image_src: None,
            audio_src: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, src: impl Into<String>) -> Self {
        self.image_src = Some(src.into());
        self
    }

    #[must_use]
    pub fn with_audio(mut self, src: impl Into<String>) -> Self {
        self.audio_src = Some(src.into());
        self
    }
}

//
// ─── CHALLENGE ─────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question of a lesson.
///
/// Always holds exactly one correct option. `completed` is derived from the
/// learner's progress records by whoever loads the challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Challenge {
    id: ChallengeId,
    lesson_id: LessonId,
    kind: ChallengeKind,
    question: String,
    order: u32,
    options: Vec<ChallengeOption>,
    completed: bool,
}

impl Challenge {
    /// Creates a validated challenge.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError` if the question is blank, there are no options,
    /// an option points at another challenge, or the number of correct
    /// options is not exactly one.
    pub fn new(
        id: ChallengeId,
        lesson_id: LessonId,
        kind: ChallengeKind,
        question: impl Into<String>,
        order: u32,
        options: Vec<ChallengeOption>,
    ) -> Result<Self, ChallengeError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(ChallengeError::EmptyQuestion);
        }
        if options.is_empty() {
            return Err(ChallengeError::NoOptions { challenge: id });
        }
        if let Some(foreign) = options.iter().find(|o| o.challenge_id != id) {
            return Err(ChallengeError::ForeignOption {
                challenge: id,
                option: foreign.id,
                owner: foreign.challenge_id,
            });
        }
        let found = options.iter().filter(|o| o.correct).count();
        if found != 1 {
            return Err(ChallengeError::CorrectOptionCount {
                challenge: id,
                found,
            });
        }

        Ok(Self {
            id,
            lesson_id,
            kind,
            question,
            order,
            options,
            completed: false,
        })
    }

    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    #[must_use]
    pub fn id(&self) -> ChallengeId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn kind(&self) -> ChallengeKind {
        self.kind
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn options(&self) -> &[ChallengeOption] {
        &self.options
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Heading to display above the options.
    #[must_use]
    pub fn title(&self) -> &str {
        match self.kind {
            ChallengeKind::Assist => ASSIST_TITLE,
            ChallengeKind::Select => &self.question,
        }
    }

    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&ChallengeOption> {
        self.options.iter().find(|o| o.id == id)
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<&ChallengeOption> {
        self.options.iter().find(|o| o.correct)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
