//! Fetch slot accounting
//!
//! Two independent caps apply to every request a shard makes: a global cap on
//! in-flight requests and a per-host politeness cap. Both are enforced with
//! semaphores so acquire and release stay atomic under concurrent use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared limiter handed to every worker unit of a shard
#[derive(Debug)]
pub struct ConcurrencyBudget {
    /// Global semaphore for limiting in-flight requests
    global: Arc<Semaphore>,

    global_limit: usize,

    /// Per-host semaphores, created on first use and evicted once idle
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,

    per_host_limit: usize,
}

/// Both permits for one request; dropping it releases the slot
#[derive(Debug)]
pub struct FetchSlot {
    _host: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

impl ConcurrencyBudget {
    pub fn new(global_limit: usize, per_host_limit: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_limit)),
            global_limit,
            hosts: Mutex::new(HashMap::new()),
            per_host_limit,
        }
    }

    /// Waits until both a host slot and a global slot are free
    ///
    /// The host permit is taken first so a request stuck behind a busy host
    /// does not sit on a global slot. Returns None only if a semaphore was
    /// closed.
    pub async fn acquire(&self, host: &str) -> Option<FetchSlot> {
        let host_permit = self.host_semaphore(host).acquire_owned().await.ok()?;
        let global_permit = self.global.clone().acquire_owned().await.ok()?;

        Some(FetchSlot {
            _host: host_permit,
            _global: global_permit,
        })
    }

    /// Number of slots currently held across all hosts
    pub fn in_flight(&self) -> usize {
        self.global_limit - self.global.available_permits()
    }

    /// Number of slots currently held against `host`
    pub fn in_flight_for(&self, host: &str) -> usize {
        let hosts = self.hosts.lock().unwrap_or_else(|e| e.into_inner());
        hosts
            .get(host)
            .map(|s| self.per_host_limit - s.available_permits())
            .unwrap_or(0)
    }

    pub fn global_limit(&self) -> usize {
        self.global_limit
    }

    pub fn per_host_limit(&self) -> usize {
        self.per_host_limit
    }

    /// Number of hosts with a semaphore in the map
    pub fn tracked_hosts(&self) -> usize {
        self.hosts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns the semaphore for `host`, creating it if needed
    ///
    /// Every held or pending permit keeps a clone of its semaphore's `Arc`,
    /// so an entry whose count is 1 has no users and all permits free. Such
    /// entries are dropped whenever a new host is added, which bounds the map
    /// by the number of hosts in use rather than every host ever seen.
    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(semaphore) = hosts.get(host) {
            return semaphore.clone();
        }

        hosts.retain(|_, semaphore| Arc::strong_count(semaphore) > 1);
        let semaphore = Arc::new(Semaphore::new(self.per_host_limit));
        hosts.insert(host.to_string(), semaphore.clone());
        semaphore
    }
}
