use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use lexi_core::model::{
    LanguagePair, RetentionState, ReviewLog, UserId, VocabularyDraft, VocabularyItem,
};
use lexi_core::time::fixed_now;
use services::{
    CancelReason, Clock, RateOutcome, ReviewFilter, ReviewSession, ReviewSessionManager,
    SessionError, SessionStart, SessionState,
};
use storage::repository::{
    InMemoryRepository, RetentionRepository, ReviewLogRepository, ReviewPersistence,
    StorageError, VocabularyRepository,
};

const USER: UserId = UserId::new(1);

fn en_ru() -> LanguagePair {
    "en-ru".parse().unwrap()
}

async fn seed(
    repo: &InMemoryRepository,
    text: &str,
    pair: LanguagePair,
    due_at: DateTime<Utc>,
) -> VocabularyItem {
    let item = repo
        .insert_item(
            VocabularyDraft::new(USER, pair, text, format!("{text}-ru"))
                .validate(fixed_now() - Duration::days(30))
                .unwrap(),
        )
        .await
        .unwrap();
    repo.insert_state(&RetentionState::new(item.id, item.user_id, due_at))
        .await
        .unwrap();
    item
}

fn manager(repo: &InMemoryRepository) -> ReviewSessionManager {
    ReviewSessionManager::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

async fn started(manager: &ReviewSessionManager, filter: ReviewFilter) -> ReviewSession {
    match manager.start_session(USER, filter).await.unwrap() {
        SessionStart::Started(session) => session,
        SessionStart::Empty => panic!("expected due items"),
    }
}

/// Fails the first `n` commits with a connection error, then delegates.
#[derive(Clone)]
struct FlakyReviews {
    inner: InMemoryRepository,
    failures_left: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ReviewPersistence for FlakyReviews {
    async fn commit_review(
        &self,
        state: &RetentionState,
        log: &ReviewLog,
    ) -> Result<i64, StorageError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Connection("database is locked".into()));
        }
        self.inner.commit_review(state, log).await
    }
}

#[tokio::test]
async fn presents_due_items_soonest_first() {
    let repo = InMemoryRepository::new();
    let now = fixed_now();
    let b = seed(&repo, "b", en_ru(), now - Duration::hours(1)).await;
    let a = seed(&repo, "a", en_ru(), now - Duration::days(2)).await;
    seed(&repo, "later", en_ru(), now + Duration::days(1)).await;

    let mgr = manager(&repo);
    let mut session = started(&mgr, ReviewFilter::all()).await;
    assert_eq!(session.progress().total, 2);

    assert_eq!(mgr.current_card(&session).unwrap().item_id(), a.id);
    mgr.reveal(&mut session).unwrap();
    let next = mgr.rate(&mut session, 4).await.unwrap();
    let RateOutcome::Next(card) = next else {
        panic!("expected another card");
    };
    assert_eq!(card.item_id(), b.id);
    assert!(!card.is_answer_revealed);
}

#[tokio::test]
async fn empty_queue_never_presents() {
    let repo = InMemoryRepository::new();
    seed(&repo, "future", en_ru(), fixed_now() + Duration::days(3)).await;

    let outcome = manager(&repo)
        .start_session(USER, ReviewFilter::all())
        .await
        .unwrap();
    assert!(matches!(outcome, SessionStart::Empty));
}

#[tokio::test]
async fn filter_limits_and_scopes_queue() {
    let repo = InMemoryRepository::new();
    let now = fixed_now();
    for text in ["one", "two", "three"] {
        seed(&repo, text, en_ru(), now).await;
    }
    seed(&repo, "하나", "ko-ru".parse().unwrap(), now).await;

    let mgr = manager(&repo);
    assert_eq!(mgr.count_due(USER, None).await.unwrap(), 4);
    assert_eq!(mgr.count_due(USER, Some(en_ru())).await.unwrap(), 3);

    let session = started(&mgr, ReviewFilter::all().with_pair(en_ru()).with_limit(2)).await;
    assert_eq!(session.progress().total, 2);

    assert!(matches!(
        mgr.start_session(USER, ReviewFilter::all().with_limit(0)).await,
        Err(SessionError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn full_pass_commits_every_rating_and_summarizes() {
    let repo = InMemoryRepository::new();
    let now = fixed_now();
    let first = seed(&repo, "apple", en_ru(), now - Duration::days(1)).await;
    let second = seed(&repo, "pear", en_ru(), now).await;

    let mgr = manager(&repo);
    let mut session = started(&mgr, ReviewFilter::all()).await;

    mgr.reveal(&mut session).unwrap();
    mgr.rate_timed(&mut session, 5, Some(900)).await.unwrap();
    mgr.reveal(&mut session).unwrap();
    let outcome = mgr.rate(&mut session, 2).await.unwrap();

    let RateOutcome::Finished(summary) = outcome else {
        panic!("expected the session to finish");
    };
    assert_eq!(session.state(), SessionState::Complete);
    assert_eq!(summary.reviewed_count(), 2);
    assert_eq!(summary.rating_sum(), 7);
    assert!((summary.average_rating() - 3.5).abs() < f64::EPSILON);
    assert_eq!(summary.elapsed(), Duration::zero());

    // New item rated 5: repetitions 1, interval 1, easiness 2.6.
    let a = repo.get_state(first.id).await.unwrap().unwrap();
    assert_eq!(a.repetitions(), 1);
    assert_eq!(a.interval_days(), 1);
    assert_eq!(a.easiness(), 2.6);
    assert_eq!(a.due_at(), now + Duration::days(1));
    let logs = repo.logs_for_item(first.id).await.unwrap();
    assert_eq!(logs[0].log.response_time_ms, Some(900));

    let b = repo.get_state(second.id).await.unwrap().unwrap();
    assert_eq!(b.repetitions(), 0);
    assert_eq!(b.interval_days(), 1);

    assert!(matches!(
        mgr.reveal(&mut session),
        Err(SessionError::InvalidTransition {
            state: SessionState::Complete,
            ..
        })
    ));
}

#[tokio::test]
async fn contract_violations_do_not_mutate() {
    let repo = InMemoryRepository::new();
    let item = seed(&repo, "apple", en_ru(), fixed_now()).await;
    let mgr = manager(&repo);
    let mut session = started(&mgr, ReviewFilter::all()).await;

    assert!(matches!(
        mgr.rate(&mut session, 4).await,
        Err(SessionError::InvalidTransition {
            operation: "rate",
            state: SessionState::Presenting
        })
    ));

    mgr.reveal(&mut session).unwrap();
    assert!(matches!(
        mgr.rate(&mut session, 6).await,
        Err(SessionError::InvalidInput(_))
    ));
    assert_eq!(session.state(), SessionState::Answered);
    assert_eq!(session.reviewed_count(), 0);
    assert!(repo.logs_for_item(item.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_keeps_committed_ratings() {
    let repo = InMemoryRepository::new();
    let now = fixed_now();
    let rated = seed(&repo, "apple", en_ru(), now - Duration::hours(2)).await;
    let skipped = seed(&repo, "pear", en_ru(), now - Duration::hours(1)).await;

    let mgr = manager(&repo);
    let mut session = started(&mgr, ReviewFilter::all()).await;
    mgr.reveal(&mut session).unwrap();
    mgr.rate(&mut session, 4).await.unwrap();

    let summary = mgr.cancel(&mut session).unwrap();
    assert_eq!(summary.reviewed_count(), 1);
    assert_eq!(session.state(), SessionState::Cancelled);
    assert_eq!(session.cancel_reason(), Some(CancelReason::UserRequested));
    assert!(mgr.current_card(&session).is_err());
    assert!(mgr.cancel(&mut session).is_err());

    assert_eq!(
        repo.get_state(rated.id).await.unwrap().unwrap().repetitions(),
        1
    );
    let untouched = repo.get_state(skipped.id).await.unwrap().unwrap();
    assert_eq!(untouched.last_reviewed_at(), None);
}

#[tokio::test]
async fn persistence_failure_leaves_rating_retryable() {
    let repo = InMemoryRepository::new();
    let item = seed(&repo, "apple", en_ru(), fixed_now()).await;
    let flaky = FlakyReviews {
        inner: repo.clone(),
        failures_left: Arc::new(AtomicUsize::new(1)),
    };
    let mgr = ReviewSessionManager::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(flaky),
    );

    let mut session = started(&mgr, ReviewFilter::all()).await;
    mgr.reveal(&mut session).unwrap();

    let err = mgr.rate(&mut session, 5).await.unwrap_err();
    assert!(matches!(err, SessionError::Persistence(StorageError::Connection(_))));
    assert_eq!(session.state(), SessionState::Answered);
    assert_eq!(session.reviewed_count(), 0);
    assert_eq!(mgr.current_card(&session).unwrap().item_id(), item.id);
    assert!(repo.logs_for_item(item.id).await.unwrap().is_empty());

    let outcome = mgr.rate(&mut session, 5).await.unwrap();
    assert!(matches!(outcome, RateOutcome::Finished(_)));
    assert_eq!(repo.logs_for_item(item.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn removed_item_cancels_session() {
    let repo = InMemoryRepository::new();
    let item = seed(&repo, "apple", en_ru(), fixed_now()).await;
    seed(&repo, "pear", en_ru(), fixed_now()).await;

    let mgr = manager(&repo);
    let mut session = started(&mgr, ReviewFilter::all()).await;
    mgr.reveal(&mut session).unwrap();
    repo.delete_item(item.id).await.unwrap();

    let err = mgr.rate(&mut session, 4).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
    assert_eq!(session.state(), SessionState::Cancelled);
    assert_eq!(
        session.cancel_reason(),
        Some(CancelReason::ItemMissing { item_id: item.id })
    );
    assert_eq!(session.summary().unwrap().reviewed_count(), 0);
}

#[tokio::test]
async fn removed_item_keeps_earlier_ratings_in_summary() {
    let repo = InMemoryRepository::new();
    seed(&repo, "apple", en_ru(), fixed_now()).await;
    let pear = seed(&repo, "pear", en_ru(), fixed_now()).await;

    let mgr = manager(&repo);
    let mut session = started(&mgr, ReviewFilter::all()).await;
    mgr.reveal(&mut session).unwrap();
    assert!(matches!(
        mgr.rate(&mut session, 5).await.unwrap(),
        RateOutcome::Next(_)
    ));

    mgr.reveal(&mut session).unwrap();
    repo.delete_item(pear.id).await.unwrap();
    let err = mgr.rate(&mut session, 3).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));

    let summary = session.summary().expect("cancelled session has a summary");
    assert_eq!(summary.reviewed_count(), 1);
    assert_eq!(summary.rating_sum(), 5);
}
