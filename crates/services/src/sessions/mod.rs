mod quiz;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use quiz::{QuizSession, QuizStep};
pub use view::{ChallengeView, OptionView, QuizView};
pub use workflow::QuizService;
