mod plan;
mod progress;
mod service;
mod state;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{DEFAULT_SESSION_LIMIT, ReviewFilter};
pub use progress::SessionProgress;
pub use service::ReviewSession;
pub use state::{CancelReason, SessionState};
pub use view::CardView;
pub use workflow::{RateOutcome, ReviewSessionManager, SessionStart};
