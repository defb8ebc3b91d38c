#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod learn_service;
pub mod review_service;
pub mod sessions;
pub mod vocabulary_service;

pub use lexi_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, LearnServiceError, ReviewServiceError, SessionError, VocabularyServiceError,
};
pub use learn_service::{LearnOutcome, LearnService};
pub use review_service::{PersistedReview, ReviewService};
pub use vocabulary_service::VocabularyService;

pub use sessions::{
    CancelReason, CardView, DEFAULT_SESSION_LIMIT, RateOutcome, ReviewFilter, ReviewSession,
    ReviewSessionManager, SessionProgress, SessionStart, SessionState,
};
