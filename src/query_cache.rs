//! Keyed request cache.
//!
//! Every fetch is identified by a [`QueryKey`] derived deterministically from
//! its full parameter tuple. An entry remembers the last good data, the
//! status of the current fetch and its error. Results are accepted only from
//! the ticket that is live for the key, so a response that outlived its
//! request (superseded, cancelled, refetched) is dropped on arrival.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cooperative cancellation flag shared between the cache and the worker
/// running the request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Identity of one issued fetch.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub key: QueryKey,
    pub fetch_id: u64,
    pub cancel: CancelToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct QueryEntry<T> {
    pub status: QueryStatus,
    /// Last successful result. Survives a later failed or in-flight refetch.
    pub data: Option<Arc<T>>,
    pub error: Option<String>,
    pub updated_at: Option<Instant>,
    live_fetch: Option<(u64, CancelToken)>,
}

impl<T> QueryEntry<T> {
    fn loading(fetch_id: u64, cancel: CancelToken) -> Self {
        Self {
            status: QueryStatus::Loading,
            data: None,
            error: None,
            updated_at: None,
            live_fetch: Some((fetch_id, cancel)),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}

#[derive(Debug, Clone)]
pub struct QueryCache<T> {
    entries: HashMap<QueryKey, QueryEntry<T>>,
    next_fetch_id: u64,
    issued: u64,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueryCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_fetch_id: 1,
            issued: 0,
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<&QueryEntry<T>> {
        self.entries.get(key)
    }

    pub fn data(&self, key: &QueryKey) -> Option<&Arc<T>> {
        self.entries.get(key).and_then(|e| e.data.as_ref())
    }

    pub fn status(&self, key: &QueryKey) -> Option<QueryStatus> {
        self.entries.get(key).map(|e| e.status)
    }

    /// When `key` last resolved, successfully or not.
    pub fn updated_at(&self, key: &QueryKey) -> Option<Instant> {
        self.entries.get(key).and_then(|e| e.updated_at)
    }

    pub fn is_loading(&self, key: &QueryKey) -> bool {
        self.status(key) == Some(QueryStatus::Loading)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fetches handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Claims a fetch for `key`. Returns `None` when the key is already
    /// loading, loaded or failed; failed keys only refetch through
    /// [`QueryCache::refetch`].
    pub fn begin(&mut self, key: &QueryKey) -> Option<FetchTicket> {
        if self.entries.contains_key(key) {
            return None;
        }
        let ticket = self.new_ticket(key);
        self.entries.insert(
            key.clone(),
            QueryEntry::loading(ticket.fetch_id, ticket.cancel.clone()),
        );
        Some(ticket)
    }

    /// Forces a new fetch for `key`, keeping any previous data visible while
    /// it runs. An in-flight fetch for the key is cancelled.
    pub fn refetch(&mut self, key: &QueryKey) -> FetchTicket {
        let ticket = self.new_ticket(key);
        match self.entries.get_mut(key) {
            Some(entry) => {
                if let Some((_, cancel)) = entry.live_fetch.take() {
                    cancel.cancel();
                }
                entry.status = QueryStatus::Loading;
                entry.error = None;
                entry.live_fetch = Some((ticket.fetch_id, ticket.cancel.clone()));
            }
            None => {
                self.entries.insert(
                    key.clone(),
                    QueryEntry::loading(ticket.fetch_id, ticket.cancel.clone()),
                );
            }
        }
        ticket
    }

    /// Drops an in-flight fetch for `key`. Entries holding data are kept
    /// (their status falls back to the data's); entries that never loaded are
    /// removed so a later `begin` starts clean.
    pub fn cancel(&mut self, key: &QueryKey) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        let Some((fetch_id, cancel)) = entry.live_fetch.take() else {
            return false;
        };
        cancel.cancel();
        debug!(key = %key, fetch_id, "fetch cancelled");
        if entry.data.is_some() {
            entry.status = QueryStatus::Success;
        } else {
            self.entries.remove(key);
        }
        true
    }

    /// Stores the outcome of `ticket`. Returns `false` (and changes nothing)
    /// when the ticket is no longer the live fetch for its key.
    pub fn resolve<E: fmt::Display>(&mut self, ticket: &FetchTicket, result: Result<T, E>) -> bool {
        if ticket.cancel.is_cancelled() {
            trace!(key = %ticket.key, fetch_id = ticket.fetch_id, "ignoring cancelled result");
            return false;
        }
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            return false;
        };
        let is_live = entry
            .live_fetch
            .as_ref()
            .is_some_and(|(id, _)| *id == ticket.fetch_id);
        if !is_live {
            trace!(key = %ticket.key, fetch_id = ticket.fetch_id, "ignoring stale result");
            return false;
        }
        entry.live_fetch = None;
        entry.updated_at = Some(Instant::now());
        match result {
            Ok(data) => {
                entry.status = QueryStatus::Success;
                entry.data = Some(Arc::new(data));
                entry.error = None;
            }
            Err(err) => {
                entry.status = QueryStatus::Error;
                entry.error = Some(err.to_string());
            }
        }
        true
    }

    /// Drops every entry whose key starts with `prefix`, cancelling its
    /// in-flight fetch. Returns how many entries went.
    pub fn prune_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            if !key.as_str().starts_with(prefix) {
                return true;
            }
            if let Some((_, cancel)) = entry.live_fetch.take() {
                cancel.cancel();
            }
            false
        });
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(prefix, pruned, "cache entries pruned");
        }
        pruned
    }

    /// Drops every entry, cancelling in-flight fetches.
    pub fn clear(&mut self) {
        for entry in self.entries.values_mut() {
            if let Some((_, cancel)) = entry.live_fetch.take() {
                cancel.cancel();
            }
        }
        self.entries.clear();
    }

    fn new_ticket(&mut self, key: &QueryKey) -> FetchTicket {
        let fetch_id = self.next_fetch_id;
        self.next_fetch_id += 1;
        self.issued += 1;
        FetchTicket {
            key: key.clone(),
            fetch_id,
            cancel: CancelToken::default(),
        }
    }
}
