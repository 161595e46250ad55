use serde::Serialize;

use lingo_core::engine::{AnswerStatus, LessonState};
use lingo_core::model::{Challenge, ChallengeId, ChallengeKind, Hearts, OptionId};

/// Presentation-agnostic snapshot of a running lesson.
///
/// No pre-formatted strings: the shell decides how to render hearts, the
/// progress bar and feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizView {
    pub hearts: Hearts,
    pub percentage: u8,
    pub status: AnswerStatus,
    pub practice: bool,
    /// Active subscription: wrong answers never cost hearts.
    pub subscribed: bool,
    pub locked: bool,
    pub challenge: Option<ChallengeView>,
}

/// The challenge currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeView {
    pub id: ChallengeId,
    pub kind: ChallengeKind,
    /// Heading shown above the options; ASSIST challenges use a fixed title.
    pub title: String,
    /// The question itself, shown in the assist bubble for ASSIST challenges.
    pub question: String,
    pub position: usize,
    pub total: usize,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
    pub selected: bool,
}

impl QuizView {
    pub(crate) fn build(state: &LessonState, challenges: &[Challenge], subscribed: bool) -> Self {
        let challenge = state.current_challenge(challenges).map(|c| ChallengeView {
            id: c.id(),
            kind: c.kind(),
            title: c.title().to_owned(),
            question: c.question().to_owned(),
            position: state.challenge_index() + 1,
            total: state.total(),
            options: c
                .options()
                .iter()
                .map(|o| OptionView {
                    id: o.id,
                    text: o.text.clone(),
                    image_src: o.image_src.clone(),
                    audio_src: o.audio_src.clone(),
                    selected: state.selected_option() == Some(o.id),
                })
                .collect(),
        });

        Self {
            hearts: state.hearts(),
            percentage: state.rounded_percentage(),
            status: state.status(),
            practice: state.is_practice(),
            subscribed,
            locked: state.is_locked(),
            challenge,
        }
    }
}
