use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lexi_core::model::{
    ItemId, LanguagePair, RetentionState, ReviewLog, UserId, ValidatedItem, VocabularyItem,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A due retention state joined with the item it schedules.
#[derive(Debug, Clone, PartialEq)]
pub struct DueCard {
    pub state: RetentionState,
    pub item: VocabularyItem,
}

/// Selection of due items for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueQuery {
    pub user_id: UserId,
    pub pair: Option<LanguagePair>,
    pub now: DateTime<Utc>,
    pub limit: Option<u32>,
}

impl DueQuery {
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            pair: None,
            now,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_pair(mut self, pair: Option<LanguagePair>) -> Self {
        self.pair = pair;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

/// Collection overview of one language pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairStats {
    pub pair: LanguagePair,
    pub total: u32,
    /// Items with a retention state.
    pub learned: u32,
    /// Learned items due at the query instant.
    pub due: u32,
}

impl PairStats {
    #[must_use]
    pub fn unlearned(&self) -> u32 {
        self.total.saturating_sub(self.learned)
    }
}

/// A persisted review log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLogRecord {
    pub id: i64,
    pub log: ReviewLog,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for a user's vocabulary collection.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// Store a new item and assign its identity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already has the same text in the same pair.
    async fn insert_item(&self, item: ValidatedItem) -> Result<VocabularyItem, StorageError>;

    /// Overwrite the editable fields of an existing item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item does not exist and
    /// `StorageError::Conflict` if the new text duplicates another item in the pair.
    async fn update_item(&self, item: &VocabularyItem) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_item(&self, id: ItemId) -> Result<Option<VocabularyItem>, StorageError>;

    /// Items of a user in creation order, optionally restricted to one pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_items(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
    ) -> Result<Vec<VocabularyItem>, StorageError>;

    /// Items that were never learned (no retention state), in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_unlearned(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        limit: Option<u32>,
    ) -> Result<Vec<VocabularyItem>, StorageError>;

    /// Per-pair totals for a user, ordered by source then target language code.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn pair_stats(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PairStats>, StorageError>;

    /// Remove an item together with its retention state and review history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item does not exist.
    async fn delete_item(&self, id: ItemId) -> Result<(), StorageError>;
}

/// Repository contract for spaced-repetition state.
#[async_trait]
pub trait RetentionRepository: Send + Sync {
    /// Due states joined with their items, due-soonest first, ties by item creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_due(&self, query: &DueQuery) -> Result<Vec<DueCard>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_due(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        now: DateTime<Utc>,
    ) -> Result<u32, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_state(&self, item_id: ItemId) -> Result<Option<RetentionState>, StorageError>;

    /// Create the first state of an item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the item already has a state and
    /// `StorageError::NotFound` if the item does not exist or belongs to another user.
    async fn insert_state(&self, state: &RetentionState) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ReviewLogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn logs_for_item(&self, item_id: ItemId) -> Result<Vec<ReviewLogRecord>, StorageError>;
}

/// Atomic commit of one rating.
#[async_trait]
pub trait ReviewPersistence: Send + Sync {
    /// Save the new state and append its log entry; either both land or neither does.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the log does not belong to the state,
    /// `StorageError::NotFound` if the state is gone or owned by another user,
    /// or other storage errors.
    async fn commit_review(
        &self,
        state: &RetentionState,
        log: &ReviewLog,
    ) -> Result<i64, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryTables {
    items: BTreeMap<ItemId, VocabularyItem>,
    states: HashMap<ItemId, RetentionState>,
    logs: Vec<ReviewLogRecord>,
    next_item_id: u64,
    next_log_id: i64,
}

impl MemoryTables {
    // Mirrors the NOCASE unique index of the SQLite schema.
    fn has_duplicate(
        &self,
        user_id: UserId,
        pair: LanguagePair,
        text: &str,
        except: Option<ItemId>,
    ) -> bool {
        self.items.values().any(|existing| {
            Some(existing.id) != except
                && existing.user_id == user_id
                && existing.pair == pair
                && existing.text.eq_ignore_ascii_case(text)
        })
    }

    fn due_cards(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        now: DateTime<Utc>,
    ) -> Vec<DueCard> {
        let mut due: Vec<DueCard> = self
            .states
            .values()
            .filter(|state| state.user_id() == user_id && state.is_due(now))
            .filter_map(|state| {
                let item = self.items.get(&state.item_id())?;
                if pair.is_some_and(|p| p != item.pair) {
                    return None;
                }
                Some(DueCard {
                    state: state.clone(),
                    item: item.clone(),
                })
            })
            .collect();
        due.sort_by_key(|card| (card.state.due_at(), card.item.created_at, card.item.id));
        due
    }

    fn items_of(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
    ) -> impl Iterator<Item = &VocabularyItem> {
        self.items
            .values()
            .filter(move |item| item.user_id == user_id && pair.is_none_or(|p| p == item.pair))
    }
}

fn count(len: usize) -> Result<u32, StorageError> {
    u32::try_from(len).map_err(|_| StorageError::Serialization("count overflow".into()))
}

fn sorted_by_creation(mut items: Vec<VocabularyItem>) -> Vec<VocabularyItem> {
    items.sort_by_key(|item| (item.created_at, item.id));
    items
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All tables sit behind one lock so a review commit is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<MemoryTables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryTables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryRepository {
    async fn insert_item(&self, item: ValidatedItem) -> Result<VocabularyItem, StorageError> {
        let mut guard = self.lock()?;
        if guard.has_duplicate(item.user_id, item.pair, &item.text, None) {
            return Err(StorageError::Conflict);
        }
        guard.next_item_id += 1;
        let stored = item.assign_id(ItemId::new(guard.next_item_id));
        guard.items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_item(&self, item: &VocabularyItem) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.has_duplicate(item.user_id, item.pair, &item.text, Some(item.id)) {
            return Err(StorageError::Conflict);
        }
        let slot = guard.items.get_mut(&item.id).ok_or(StorageError::NotFound)?;
        *slot = item.clone();
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<VocabularyItem>, StorageError> {
        Ok(self.lock()?.items.get(&id).cloned())
    }

    async fn list_items(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
    ) -> Result<Vec<VocabularyItem>, StorageError> {
        let guard = self.lock()?;
        Ok(sorted_by_creation(
            guard.items_of(user_id, pair).cloned().collect(),
        ))
    }

    async fn list_unlearned(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        limit: Option<u32>,
    ) -> Result<Vec<VocabularyItem>, StorageError> {
        let guard = self.lock()?;
        let mut items = sorted_by_creation(
            guard
                .items_of(user_id, pair)
                .filter(|item| !guard.states.contains_key(&item.id))
                .cloned()
                .collect(),
        );
        if let Some(limit) = limit {
            items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(items)
    }

    async fn pair_stats(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PairStats>, StorageError> {
        let guard = self.lock()?;
        let mut by_pair: BTreeMap<(&str, &str), PairStats> = BTreeMap::new();
        for item in guard.items_of(user_id, None) {
            let key = (item.pair.source().code(), item.pair.target().code());
            let stats = by_pair.entry(key).or_insert(PairStats {
                pair: item.pair,
                total: 0,
                learned: 0,
                due: 0,
            });
            stats.total = stats.total.saturating_add(1);
            if let Some(state) = guard.states.get(&item.id) {
                stats.learned = stats.learned.saturating_add(1);
                if state.is_due(now) {
                    stats.due = stats.due.saturating_add(1);
                }
            }
        }
        Ok(by_pair.into_values().collect())
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.items.remove(&id).ok_or(StorageError::NotFound)?;
        guard.states.remove(&id);
        guard.logs.retain(|record| record.log.item_id != id);
        Ok(())
    }
}

#[async_trait]
impl RetentionRepository for InMemoryRepository {
    async fn load_due(&self, query: &DueQuery) -> Result<Vec<DueCard>, StorageError> {
        let guard = self.lock()?;
        let mut due = guard.due_cards(query.user_id, query.pair, query.now);
        if let Some(limit) = query.limit {
            due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(due)
    }

    async fn count_due(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        now: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        count(self.lock()?.due_cards(user_id, pair, now).len())
    }

    async fn get_state(&self, item_id: ItemId) -> Result<Option<RetentionState>, StorageError> {
        Ok(self.lock()?.states.get(&item_id).cloned())
    }

    async fn insert_state(&self, state: &RetentionState) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let owner = guard.items.get(&state.item_id()).map(|item| item.user_id);
        if owner != Some(state.user_id()) {
            return Err(StorageError::NotFound);
        }
        if guard.states.contains_key(&state.item_id()) {
            return Err(StorageError::Conflict);
        }
        guard.states.insert(state.item_id(), state.clone());
        Ok(())
    }

}

#[async_trait]
impl ReviewLogRepository for InMemoryRepository {
    async fn logs_for_item(&self, item_id: ItemId) -> Result<Vec<ReviewLogRecord>, StorageError> {
        let guard = self.lock()?;
        let mut logs: Vec<_> = guard
            .logs
            .iter()
            .filter(|record| record.log.item_id == item_id)
            .cloned()
            .collect();
        logs.sort_by_key(|record| (record.log.reviewed_at, record.id));
        Ok(logs)
    }
}

#[async_trait]
impl ReviewPersistence for InMemoryRepository {
    async fn commit_review(
        &self,
        state: &RetentionState,
        log: &ReviewLog,
    ) -> Result<i64, StorageError> {
        if log.item_id != state.item_id() {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.lock()?;
        let slot = guard
            .states
            .get_mut(&state.item_id())
            .filter(|stored| stored.user_id() == state.user_id())
            .ok_or(StorageError::NotFound)?;
        *slot = state.clone();

        guard.next_log_id += 1;
        let id = guard.next_log_id;
        guard.logs.push(ReviewLogRecord {
            id,
            log: log.clone(),
        });
        Ok(id)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub vocabulary: Arc<dyn VocabularyRepository>,
    pub retention: Arc<dyn RetentionRepository>,
    pub review_logs: Arc<dyn ReviewLogRepository>,
    pub reviews: Arc<dyn ReviewPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    pub(crate) fn from_backend<R>(repo: R) -> Self
    where
        R: VocabularyRepository
            + RetentionRepository
            + ReviewLogRepository
            + ReviewPersistence
            + Clone
            + 'static,
    {
        let vocabulary: Arc<dyn VocabularyRepository> = Arc::new(repo.clone());
        let retention: Arc<dyn RetentionRepository> = Arc::new(repo.clone());
        let review_logs: Arc<dyn ReviewLogRepository> = Arc::new(repo.clone());
        let reviews: Arc<dyn ReviewPersistence> = Arc::new(repo);
        Self {
            vocabulary,
            retention,
            review_logs,
            reviews,
        }
    }
}
