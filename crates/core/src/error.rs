use thiserror::Error;

use crate::model::{LanguageError, QualityError, RetentionError, SummaryError, VocabularyError};
use crate::scheduler::SchedulerError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Quality(#[from] QualityError),
    #[error(transparent)]
    Language(#[from] LanguageError),
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error(transparent)]
    Retention(#[from] RetentionError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
