use thiserror::Error;

use crate::model::{ChallengeError, ParseIdError, ProgressError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
