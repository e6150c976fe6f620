use crate::{
    config::{ConfigError, LoaderConfig},
    error::LoadError,
    fetch::{Fetch, HttpFetcher},
};
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{FutureExt, Shared};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Outcome of a single fetch, handed to every caller joined onto it
type FetchOutcome = Result<Arc<Value>, LoadError>;

/// Clonable handle on the outcome of an in-flight fetch
type FlightChannel = Shared<oneshot::Receiver<FetchOutcome>>;

/// A fetch that has been started but has not settled yet
struct PendingRequest {
    flight_id: u64,
    started_at: DateTime<Utc>,
    channel: FlightChannel,
}

/// A successfully decoded document
struct CachedDocument {
    value: Arc<Value>,
    fetched_at: DateTime<Utc>,
}

/// State of a key. A key is absent, pending or cached, never two at once.
enum Slot {
    Pending(PendingRequest),
    Cached(CachedDocument),
}

impl Slot {
    fn is_flight(&self, flight_id: u64) -> bool {
        matches!(self, Slot::Pending(pending) if pending.flight_id == flight_id)
    }
}

/// Memoizing JSON loader that collapses concurrent requests for the same key
/// onto a single fetch.
///
/// Successful documents stay cached until [`DataLoader::clear`]. Failures are
/// never cached: the key goes back to absent and the next call fetches again.
/// Clones share the same state.
#[derive(Clone)]
pub struct DataLoader {
    slots: Arc<DashMap<String, Slot>>,
    fetcher: Arc<dyn Fetch>,
    next_flight: Arc<AtomicU64>,
    config: LoaderConfig,
}

impl DataLoader {
    pub fn new(fetcher: Arc<dyn Fetch>, config: LoaderConfig) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            fetcher,
            next_flight: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Create a loader fetching over HTTP with the given configuration
    pub fn from_config(config: LoaderConfig) -> Result<Self, ConfigError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Return the decoded document for `key`, fetching it if needed.
    ///
    /// A cached document is returned without any I/O. If a fetch for `key` is
    /// already in flight, this call joins it and receives the same outcome.
    /// Otherwise a new fetch is started.
    ///
    /// Inside a Tokio runtime the fetch runs on its own task and settles the
    /// cache state before the outcome is delivered, so it completes even if
    /// every caller goes away. Outside a runtime the caller that starts the
    /// fetch drives it; if that caller is dropped early, joined callers get
    /// [`LoadError::Interrupted`] and the key goes back to absent.
    pub async fn get_or_fetch(&self, key: &str) -> Result<Arc<Value>, LoadError> {
        if key.is_empty() {
            return Err(LoadError::InvalidKey);
        }

        if !*self.config.enabled() {
            log::debug!("Caching disabled, fetching {} directly", key);
            return fetch_document(self.fetcher.as_ref(), key).await;
        }

        // Checking for and registering a pending request is a single critical
        // section on the key's shard.
        let (channel, new_flight) = match self.slots.entry(key.to_owned()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Cached(document) => {
                    log::debug!("Cache hit for key: {}", key);
                    return Ok(document.value.clone());
                }
                Slot::Pending(pending) => {
                    log::debug!(
                        "Request already pending for key: {} (flight {})",
                        key,
                        pending.flight_id
                    );
                    (pending.channel.clone(), None)
                }
            },
            Entry::Vacant(entry) => {
                let (sender, receiver) = oneshot::channel();
                let channel = receiver.shared();
                let flight_id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                entry.insert(Slot::Pending(PendingRequest {
                    flight_id,
                    started_at: Utc::now(),
                    channel: channel.clone(),
                }));
                (channel, Some((flight_id, sender)))
            }
        };

        if let Some((flight_id, sender)) = new_flight {
            log::debug!("Executing new request for key: {} (flight {})", key, flight_id);
            let flight = Flight {
                slots: self.slots.clone(),
                key: key.to_owned(),
                flight_id,
                sender: Some(sender),
            };
            let run = flight.run(self.fetcher.clone());
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(run);
                }
                Err(_) => run.await,
            }
        }

        match channel.await {
            Ok(outcome) => outcome,
            Err(_) => Err(LoadError::Interrupted {
                url: key.to_owned(),
            }),
        }
    }

    /// Like [`DataLoader::get_or_fetch`], then decode the document with
    /// `decode`. Decoder failures are reported as [`LoadError::Decode`] and do
    /// not affect the cached document.
    pub async fn get_or_fetch_with<T, E, F>(&self, key: &str, decode: F) -> Result<T, LoadError>
    where
        F: FnOnce(&Value) -> Result<T, E>,
        E: Display,
    {
        let value = self.get_or_fetch(key).await?;
        decode(&value).map_err(|err| LoadError::decode(key, err))
    }

    /// Fetch `key` and deserialize it into `T`
    pub async fn get_or_fetch_as<T>(&self, key: &str) -> Result<T, LoadError>
    where
        T: DeserializeOwned,
    {
        self.get_or_fetch_with(key, |value| T::deserialize(value))
            .await
    }

    /// Drop every cached document and forget every pending request.
    ///
    /// Fetches already in flight are not cancelled. Their callers still get
    /// the outcome, but it is not stored.
    pub fn clear(&self) {
        self.slots.clear();
        log::info!("Data loader cleared");
    }

    /// Number of cached documents. Pending requests are not counted.
    pub fn size(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Cached(_)))
            .count()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| matches!(*slot, Slot::Cached(_)))
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| matches!(*slot, Slot::Pending(_)))
    }

    pub fn stats(&self) -> LoaderStats {
        let mut stats = LoaderStats::default();
        for entry in self.slots.iter() {
            match entry.value() {
                Slot::Cached(document) => {
                    stats.cached_entries += 1;
                    stats.oldest_entry = Some(match stats.oldest_entry {
                        Some(oldest) => oldest.min(document.fetched_at),
                        None => document.fetched_at,
                    });
                }
                Slot::Pending(pending) => {
                    stats.pending_requests += 1;
                    stats.oldest_pending = Some(match stats.oldest_pending {
                        Some(oldest) => oldest.min(pending.started_at),
                        None => pending.started_at,
                    });
                }
            }
        }
        stats
    }
}

impl fmt::Debug for DataLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoader")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Thread-safe wrapper for the loader
pub type SharedDataLoader = Arc<DataLoader>;

/// Bookkeeping for one fetch. A flight only ever touches the slot it
/// registered, identified by its flight id, so a fetch that outlives a
/// `clear()` cannot overwrite state created after it.
///
/// The slot is always settled before the outcome is sent or the sender is
/// dropped, so a caller that sees the outcome also sees the new state.
struct Flight {
    slots: Arc<DashMap<String, Slot>>,
    key: String,
    flight_id: u64,
    sender: Option<oneshot::Sender<FetchOutcome>>,
}

impl Flight {
    async fn run(mut self, fetcher: Arc<dyn Fetch>) {
        let outcome = fetch_document(fetcher.as_ref(), &self.key).await;
        self.settle(&outcome);
        if let Some(sender) = self.sender.take() {
            sender.send(outcome).ok();
        }
    }

    fn settle(&self, outcome: &FetchOutcome) {
        match self.slots.entry(self.key.clone()) {
            Entry::Occupied(mut entry) if entry.get().is_flight(self.flight_id) => match outcome {
                Ok(value) => {
                    entry.insert(Slot::Cached(CachedDocument {
                        value: value.clone(),
                        fetched_at: Utc::now(),
                    }));
                    log::debug!("Stored in cache with key: {}", self.key);
                }
                Err(err) => {
                    entry.remove();
                    log::warn!(
                        "Fetch failed for key: {} ({}): {}",
                        self.key,
                        err.kind(),
                        err
                    );
                }
            },
            _ => log::debug!(
                "Discarding outcome of stale flight {} for key: {}",
                self.flight_id,
                self.key
            ),
        }
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        // Still holding the sender means the fetch never finished
        if let Some(sender) = self.sender.take() {
            let flight_id = self.flight_id;
            self.slots
                .remove_if(&self.key, |_, slot| slot.is_flight(flight_id));
            log::warn!("Fetch for key: {} was interrupted", self.key);
            drop(sender);
        }
    }
}

/// Fetch `key`, check the status and decode the body as JSON
async fn fetch_document(fetcher: &dyn Fetch, key: &str) -> FetchOutcome {
    let response = fetcher.fetch(key).await?;
    if !response.is_success() {
        return Err(LoadError::HttpStatus {
            url: key.to_owned(),
            status: response.status,
        });
    }

    let value: Value =
        serde_json::from_slice(&response.body).map_err(|err| LoadError::decode(key, err))?;
    Ok(Arc::new(value))
}

/// Loader statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderStats {
    pub cached_entries: usize,
    pub pending_requests: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub oldest_pending: Option<DateTime<Utc>>,
}
