use chrono::{DateTime, Utc};
use std::fmt;

use lexi_core::model::{Quality, RetentionState, SessionId, SessionSummary, UserId};
use storage::repository::DueCard;

use super::progress::SessionProgress;
use super::state::{CancelReason, SessionState};
use super::view::CardView;
use crate::error::SessionError;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's review pass over a fixed queue of due cards.
///
/// The handle is owned by the caller and driven through
/// [`ReviewSessionManager`](super::ReviewSessionManager); it holds no repository
/// access of its own. Transitions here are pure and only applied after storage
/// has accepted the corresponding write.
#[derive(Clone)]
pub struct ReviewSession {
    id: SessionId,
    user_id: UserId,
    queue: Vec<DueCard>,
    cursor: usize,
    state: SessionState,
    reviewed_count: u32,
    rating_sum: u32,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    cancel_reason: Option<CancelReason>,
}

impl ReviewSession {
    /// Opens a session on a non-empty queue; `None` when nothing is due.
    pub(crate) fn start(
        user_id: UserId,
        queue: Vec<DueCard>,
        started_at: DateTime<Utc>,
    ) -> Option<Self> {
        if queue.is_empty() {
            return None;
        }
        Some(Self {
            id: SessionId::random(),
            user_id,
            queue,
            cursor: 0,
            state: SessionState::Presenting,
            reviewed_count: 0,
            rating_sum: 0,
            started_at,
            finished_at: None,
            cancel_reason: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn reviewed_count(&self) -> u32 {
        self.reviewed_count
    }

    #[must_use]
    pub fn rating_sum(&self) -> u32 {
        self.rating_sum
    }

    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancel_reason
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.queue.len();
        SessionProgress {
            position: (self.cursor + 1).min(total),
            total,
            answered: self.cursor,
            remaining: total.saturating_sub(self.cursor),
        }
    }

    /// The card being shown, with the answer hidden until revealed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the session has ended.
    pub fn current_card(&self) -> Result<CardView, SessionError> {
        let due = self.active_card("show a card")?;
        Ok(CardView {
            item: due.item.clone(),
            is_answer_revealed: self.state == SessionState::Answered,
            progress: self.progress(),
        })
    }

    /// Summary of what was rated; available once the session has ended.
    #[must_use]
    pub fn summary(&self) -> Option<SessionSummary> {
        let finished_at = self.finished_at?;
        // A wall clock stepping backwards must not make the summary unrepresentable.
        SessionSummary::new(
            self.user_id,
            self.started_at,
            finished_at.max(self.started_at),
            self.reviewed_count,
            self.rating_sum,
        )
        .ok()
    }

    fn active_card(&self, operation: &'static str) -> Result<&DueCard, SessionError> {
        if self.state.is_terminal() {
            return Err(self.invalid(operation));
        }
        self.queue
            .get(self.cursor)
            .ok_or_else(|| self.invalid(operation))
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            state: self.state,
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Presenting → Answered. Repeating it while Answered is a no-op.
    pub(crate) fn reveal(&mut self) -> Result<CardView, SessionError> {
        self.active_card("reveal")?;
        self.state = SessionState::Answered;
        self.current_card()
    }

    /// The state of the card awaiting a rating.
    pub(crate) fn awaiting_rating(&self) -> Result<&RetentionState, SessionError> {
        if self.state != SessionState::Answered {
            return Err(self.invalid("rate"));
        }
        Ok(&self.active_card("rate")?.state)
    }

    /// Records a committed rating and moves to the next card or completes.
    pub(crate) fn record_rating(
        &mut self,
        quality: Quality,
        committed: RetentionState,
        rated_at: DateTime<Utc>,
    ) {
        if let Some(due) = self.queue.get_mut(self.cursor) {
            due.state = committed;
        }
        self.reviewed_count = self.reviewed_count.saturating_add(1);
        self.rating_sum = self.rating_sum.saturating_add(u32::from(quality.value()));
        self.cursor += 1;

        if self.cursor >= self.queue.len() {
            self.state = SessionState::Complete;
            self.finished_at = Some(rated_at);
        } else {
            self.state = SessionState::Presenting;
        }
    }

    /// Presenting/Answered → Cancelled; the unrated rest of the queue is dropped.
    pub(crate) fn cancel(
        &mut self,
        reason: CancelReason,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(self.invalid("cancel"));
        }
        self.queue.truncate(self.cursor);
        self.state = SessionState::Cancelled;
        self.cancel_reason = Some(reason);
        self.finished_at = Some(at);
        Ok(())
    }
}

impl fmt::Debug for ReviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewSession")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("queue_len", &self.queue.len())
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("reviewed_count", &self.reviewed_count)
            .field("rating_sum", &self.rating_sum)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .field("cancel_reason", &self.cancel_reason)
            .finish()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
