use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::accessor::SchemaAccessor;
use crate::error::{CacheError, SchemaError};
use crate::snapshot::{self, SchemaSnapshot};
use crate::spec::SurveyId;

pub const DEFAULT_TTL_SECS: u64 = 60 * 60 * 24;
pub const DEFAULT_LOCALE: &str = "en";

#[derive(TypedBuilder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Safety-net expiry; invalidation is what keeps entries correct.
    #[builder(default = DEFAULT_TTL_SECS)]
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Locale used when a translation for the requested one is missing.
    #[builder(setter(into), default = String::from(DEFAULT_LOCALE))]
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub survey_id: SurveyId,
    pub locale: String,
}

impl CacheKey {
    pub fn new(survey_id: SurveyId, locale: impl Into<String>) -> Self {
        Self {
            survey_id,
            locale: locale.into(),
        }
    }
}

/// Backing storage for published snapshots.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<Arc<SchemaSnapshot>>, CacheError>;

    fn put(
        &self,
        key: CacheKey,
        snapshot: Arc<SchemaSnapshot>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Drops every locale of `survey_id`, returning how many entries went.
    fn evict_survey(&self, survey_id: SurveyId) -> Result<usize, CacheError>;
}

struct StoredSnapshot {
    snapshot: Arc<SchemaSnapshot>,
    /// `None` when the TTL runs past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl StoredSnapshot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<CacheKey, StoredSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Arc<SchemaSnapshot>>, CacheError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| Arc::clone(&entry.snapshot)))
    }

    fn put(
        &self,
        key: CacheKey,
        snapshot: Arc<SchemaSnapshot>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key,
            StoredSnapshot {
                snapshot,
                expires_at: now.checked_add(ttl),
            },
        );
        Ok(())
    }

    fn evict_survey(&self, survey_id: SurveyId) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| key.survey_id != survey_id);
        Ok(before - entries.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
}

/// Snapshot cache keyed by survey and locale.
///
/// Snapshots are built off to the side and published whole, so readers see
/// either the previous snapshot or the new one. Each survey carries a
/// generation bumped by [`SchemaCache::invalidate`]; a build that began under
/// an older generation is returned to its caller but never published.
pub struct SchemaCache {
    config: CacheConfig,
    store: Box<dyn SnapshotStore>,
    generations: Mutex<HashMap<SurveyId, u64>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl SchemaCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_store(config, MemorySnapshotStore::new())
    }

    pub fn with_store(config: CacheConfig, store: impl SnapshotStore + 'static) -> Self {
        Self {
            config,
            store: Box::new(store),
            generations: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
        }
    }

    pub fn get_or_build<A>(
        &self,
        accessor: &A,
        survey_id: SurveyId,
        locale: &str,
    ) -> Result<Arc<SchemaSnapshot>, SchemaError>
    where
        A: SchemaAccessor + ?Sized,
    {
        let key = CacheKey::new(survey_id, locale);
        if let Some(snapshot) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(snapshot);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let flight = self.flight_lock(&key);
        let result = {
            let _building = flight.lock().unwrap_or_else(PoisonError::into_inner);
            // A concurrent miss may have published while we waited.
            match self.lookup(&key) {
                Some(snapshot) => {
                    tracing::debug!(survey_id, locale, "attached to concurrent build");
                    Ok(snapshot)
                }
                None => self.build_and_publish(accessor, &key),
            }
        };
        self.release_flight(&key, flight);
        result
    }

    /// Evicts every locale of `survey_id`; later builds see the current data.
    pub fn invalidate(&self, survey_id: SurveyId) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        *generations.entry(survey_id).or_insert(0) += 1;
        match self.store.evict_survey(survey_id) {
            Ok(evicted) => tracing::debug!(survey_id, evicted, "invalidated survey snapshots"),
            Err(error) => tracing::warn!(
                survey_id,
                error = &error as &dyn std::error::Error,
                "snapshot eviction failed"
            ),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<SchemaSnapshot>> {
        match self.store.get(key) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(
                    survey_id = key.survey_id,
                    locale = %key.locale,
                    error = &error as &dyn std::error::Error,
                    "snapshot store read failed, building directly"
                );
                None
            }
        }
    }

    fn generation(&self, survey_id: SurveyId) -> u64 {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        generations.get(&survey_id).copied().unwrap_or(0)
    }

    fn build_and_publish<A>(
        &self,
        accessor: &A,
        key: &CacheKey,
    ) -> Result<Arc<SchemaSnapshot>, SchemaError>
    where
        A: SchemaAccessor + ?Sized,
    {
        let generation = self.generation(key.survey_id);
        let snapshot = Arc::new(snapshot::build(
            accessor,
            key.survey_id,
            &key.locale,
            &self.config.default_locale,
        )?);
        self.builds.fetch_add(1, Ordering::Relaxed);

        // Held across the put so an invalidation cannot slip between check and publish.
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        if generations.get(&key.survey_id).copied().unwrap_or(0) != generation {
            tracing::debug!(
                survey_id = key.survey_id,
                locale = %key.locale,
                "survey changed during build, not publishing"
            );
            return Ok(snapshot);
        }
        match self
            .store
            .put(key.clone(), Arc::clone(&snapshot), self.config.ttl())
        {
            Ok(()) => tracing::debug!(
                survey_id = key.survey_id,
                locale = %key.locale,
                "published schema snapshot"
            ),
            Err(error) => tracing::warn!(
                survey_id = key.survey_id,
                locale = %key.locale,
                error = &error as &dyn std::error::Error,
                "snapshot store write failed"
            ),
        }
        drop(generations);
        Ok(snapshot)
    }

    fn flight_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(key.clone()).or_default())
    }

    fn release_flight(&self, key: &CacheKey, flight: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left means ours plus the map's: nobody else is waiting.
        if Arc::strong_count(&flight) == 2
            && in_flight
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &flight))
        {
            in_flight.remove(key);
        }
    }
}
