// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Multi-server manager: concurrent per-server refresh and offset
//! aggregation.
//!
//! [`SntpManager`] owns a set of [`SntpClient`]s, refreshes each one on its
//! own schedule (one task per server, no global polling cycle), and reduces
//! the per-server offsets to one system-wide offset. Partial failure is the
//! normal case: a failing server never delays or invalidates the others.
//!
//! The bookkeeping map (server identity → entry) sits behind one coarse
//! mutex; updates are minutes to hours apart per server, so contention is
//! not a concern and readers always see a consistent snapshot. Each refresh
//! task holds only a weak reference to the map plus an explicit stop signal,
//! so dropping the manager (or removing a server) tears the task down
//! without any ownership cycle.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() {
//! use sntp_client::SntpManager;
//!
//! let manager = SntpManager::new();
//! manager.add_pool_servers();
//!
//! // Later, at any time, from any task:
//! println!("system clock offset: {:.6}s", manager.system_clock_offset());
//! println!("network time: {:?}", manager.now());
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::{QueryReply, SntpClient};
use crate::clock::{Clock, SystemClock, distant_future};
use crate::error::QueryError;
use crate::servers::POOL_SERVERS;
use crate::transport::ServerAddress;

/// Per-server bookkeeping, mutated by that server's refresh task and read by
/// [`SntpManager::system_clock_offset`] / [`SntpManager::entries`].
struct ClientEntry {
    client: Arc<SntpClient>,
    /// Last clock offset received from the client, if any query succeeded.
    clock_offset: Option<f64>,
    /// The earliest time at which the next request may be sent.
    next_request_window: SystemTime,
    /// When the last request was sent.
    last_request: Option<SystemTime>,
    /// The last error received from the client. `None` after a success.
    last_error: Option<QueryError>,
    /// Whether a request is currently in flight.
    in_flight: bool,
    /// Stops this server's refresh task.
    stop: watch::Sender<bool>,
}

/// A consistent snapshot of one server's bookkeeping, for callers that need
/// per-server health rather than the aggregate.
#[derive(Clone, Debug)]
pub struct EntrySnapshot {
    /// The server identity (`host:port`).
    pub server: String,
    /// Last known clock offset, if any query succeeded.
    pub clock_offset: Option<f64>,
    /// The earliest time at which the next request may be sent.
    pub next_request_window: SystemTime,
    /// When the last request was sent.
    pub last_request: Option<SystemTime>,
    /// The last error, if the most recent query failed.
    pub last_error: Option<QueryError>,
    /// Whether a request is currently in flight.
    pub in_flight: bool,
    /// Number of network exchanges this server has seen.
    pub request_count: u64,
}

type EntryMap = Mutex<HashMap<String, ClientEntry>>;

fn lock_entries(entries: &EntryMap) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
    entries.lock().unwrap_or_else(|e| e.into_inner())
}

/// Manages a set of SNTP clients to provide convenient time synchronization.
///
/// Thread-safe; all methods take `&self`. Spawning refresh tasks requires a
/// running tokio runtime, so clients must be added from within one.
pub struct SntpManager {
    entries: Arc<EntryMap>,
    clock: Arc<dyn Clock>,
}

impl Default for SntpManager {
    fn default() -> Self {
        SntpManager::new()
    }
}

impl SntpManager {
    /// A manager using the host system clock.
    pub fn new() -> SntpManager {
        SntpManager::with_clock(Arc::new(SystemClock))
    }

    /// A manager using a custom time source for scheduling and [`SntpManager::now`].
    pub fn with_clock(clock: Arc<dyn Clock>) -> SntpManager {
        SntpManager {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Replace the set of managed clients.
    ///
    /// Servers no longer in the list stop being refreshed (an in-flight
    /// query is cancelled); new servers start being refreshed immediately;
    /// entries for retained server identities are left untouched (the
    /// incoming duplicate client is discarded). An empty list releases all
    /// refresh tasks.
    pub fn set_clients(&self, clients: Vec<SntpClient>) {
        let mut map = lock_entries(&self.entries);

        let keep: HashSet<String> = clients.iter().map(|c| c.identity()).collect();
        let removed: Vec<String> = map
            .keys()
            .filter(|key| !keep.contains(*key))
            .cloned()
            .collect();
        for key in removed {
            if let Some(entry) = map.remove(&key) {
                let _ = entry.stop.send(true);
                entry.client.shutdown();
                debug!(server = %key, "removed client");
            }
        }

        for client in clients {
            let key = client.identity();
            if !map.contains_key(&key) {
                self.insert_entry(&mut map, key, client);
            }
        }
    }

    /// Add clients without disturbing existing entries. Clients whose
    /// identity is already managed are discarded.
    pub fn add_clients(&self, clients: Vec<SntpClient>) {
        let mut map = lock_entries(&self.entries);
        for client in clients {
            let key = client.identity();
            if !map.contains_key(&key) {
                self.insert_entry(&mut map, key, client);
            }
        }
    }

    /// Add clients for the public NTP pool servers.
    ///
    /// Idempotent: repeated calls do not add duplicate entries.
    pub fn add_pool_servers(&self) {
        self.add_clients(
            POOL_SERVERS
                .iter()
                .map(|host| SntpClient::new(ServerAddress::new(*host)))
                .collect(),
        );
    }

    /// The identities of the currently managed servers.
    pub fn clients(&self) -> Vec<String> {
        lock_entries(&self.entries).keys().cloned().collect()
    }

    /// Snapshots of all per-server entries.
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        lock_entries(&self.entries)
            .iter()
            .map(|(key, entry)| EntrySnapshot {
                server: key.clone(),
                clock_offset: entry.clock_offset,
                next_request_window: entry.next_request_window,
                last_request: entry.last_request,
                last_error: entry.last_error.clone(),
                in_flight: entry.in_flight,
                request_count: entry.client.request_count(),
            })
            .collect()
    }

    /// The current system clock offset in seconds.
    ///
    /// Determined from the entries whose last query succeeded:
    ///
    /// - no valid entry: 0
    /// - one valid entry: that offset
    /// - two valid entries: the offset closer to 0
    /// - otherwise: the median offset
    ///
    /// The all-invalid case is a silent degraded mode, not an error, so that
    /// [`SntpManager::now`] always returns a usable value.
    pub fn system_clock_offset(&self) -> f64 {
        let offsets: Vec<f64> = lock_entries(&self.entries)
            .values()
            .filter(|entry| entry.last_error.is_none())
            .filter_map(|entry| entry.clock_offset)
            .collect();
        select_offset(offsets)
    }

    /// The current time, taking the system clock offset into account.
    pub fn now(&self) -> SystemTime {
        let offset = self.system_clock_offset();
        let now = self.clock.now();
        if offset >= 0.0 {
            now + Duration::from_secs_f64(offset)
        } else {
            now - Duration::from_secs_f64(-offset)
        }
    }

    fn insert_entry(&self, map: &mut HashMap<String, ClientEntry>, key: String, client: SntpClient) {
        let client = Arc::new(client);
        let (stop_tx, stop_rx) = watch::channel(false);
        map.insert(
            key.clone(),
            ClientEntry {
                client: Arc::clone(&client),
                clock_offset: None,
                next_request_window: self.clock.now(),
                last_request: None,
                last_error: None,
                in_flight: false,
                stop: stop_tx,
            },
        );
        debug!(server = %key, "added client");
        tokio::spawn(refresh_loop(
            Arc::downgrade(&self.entries),
            key,
            client,
            Arc::clone(&self.clock),
            stop_rx,
        ));
    }
}

impl Drop for SntpManager {
    fn drop(&mut self) {
        // Refresh tasks only hold weak references to the map, so they stop on
        // their own; stopping them explicitly just makes teardown prompt.
        let map = lock_entries(&self.entries);
        for entry in map.values() {
            let _ = entry.stop.send(true);
            entry.client.shutdown();
        }
    }
}

/// Reduce per-server offsets to the system offset.
fn select_offset(mut offsets: Vec<f64>) -> f64 {
    match offsets.len() {
        0 => 0.0,
        1 => offsets[0],
        2 => {
            if offsets[0].abs() <= offsets[1].abs() {
                offsets[0]
            } else {
                offsets[1]
            }
        }
        n => {
            offsets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            if n % 2 == 1 {
                offsets[n / 2]
            } else {
                (offsets[n / 2 - 1] + offsets[n / 2]) / 2.0
            }
        }
    }
}

/// One server's refresh loop: sleep until the entry's request window opens,
/// query, write the result back, repeat.
///
/// Exits when the stop signal fires, when the entry (or the whole map) is
/// gone, or when the window becomes "never" (DENY/RSTR or teardown).
async fn refresh_loop(
    entries: Weak<EntryMap>,
    key: String,
    client: Arc<SntpClient>,
    clock: Arc<dyn Clock>,
    mut stop: watch::Receiver<bool>,
) {
    debug!(server = %key, "refresh task started");
    loop {
        let window = {
            let Some(entries) = entries.upgrade() else { return };
            let map = lock_entries(&entries);
            let Some(entry) = map.get(&key) else { return };
            entry.next_request_window
        };
        if window >= distant_future() {
            debug!(server = %key, "request window is never, refresh task stopping");
            return;
        }

        let wait = window
            .duration_since(clock.now())
            .unwrap_or(Duration::ZERO);
        if !wait.is_zero() {
            tokio::select! {
                _ = stop.changed() => return,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        if *stop.borrow() {
            return;
        }

        {
            let Some(entries) = entries.upgrade() else { return };
            let mut map = lock_entries(&entries);
            let Some(entry) = map.get_mut(&key) else { return };
            entry.in_flight = true;
            entry.last_request = Some(clock.now());
        }

        let reply = tokio::select! {
            reply = client.query_time() => reply,
            _ = stop.changed() => {
                // Removal mid-query: cancel so coalesced callers resolve too.
                client.shutdown();
                QueryReply {
                    clock_offset: 0.0,
                    next_request_window: distant_future(),
                    error: Some(QueryError::Cancelled),
                }
            }
        };

        {
            let Some(entries) = entries.upgrade() else { return };
            let mut map = lock_entries(&entries);
            let Some(entry) = map.get_mut(&key) else { return };
            entry.in_flight = false;
            entry.next_request_window = reply.next_request_window;
            match reply.error {
                None => {
                    debug!(server = %key, offset = reply.clock_offset, "refresh succeeded");
                    entry.clock_offset = Some(reply.clock_offset);
                    entry.last_error = None;
                }
                Some(error) => {
                    warn!(server = %key, %error, "refresh failed");
                    entry.last_error = Some(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── select_offset ─────────────────────────────────────────────

    #[test]
    fn test_select_no_entries_is_zero() {
        assert_eq!(select_offset(vec![]), 0.0);
    }

    #[test]
    fn test_select_single_entry() {
        assert_eq!(select_offset(vec![3.0]), 3.0);
    }

    #[test]
    fn test_select_two_entries_closer_to_zero() {
        assert_eq!(select_offset(vec![3.0, -1.0]), -1.0);
        assert_eq!(select_offset(vec![-1.0, 3.0]), -1.0);
        assert_eq!(select_offset(vec![-5.0, 2.0]), 2.0);
    }

    #[test]
    fn test_select_median_odd() {
        assert_eq!(select_offset(vec![1.0, 2.0, 9.0]), 2.0);
        assert_eq!(select_offset(vec![9.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_select_median_even_is_mean_of_middle_two() {
        assert_eq!(select_offset(vec![1.0, 2.0, 3.0, 100.0]), 2.5);
    }

    #[test]
    fn test_select_median_tolerates_outlier() {
        // One wildly wrong server among five cannot move the median far.
        let offset = select_offset(vec![0.01, 0.02, 0.03, 0.02, 1e6]);
        assert_eq!(offset, 0.02);
    }

    // ── manager basics (no network) ───────────────────────────────

    #[tokio::test]
    async fn test_empty_manager_offset_is_zero() {
        let manager = SntpManager::new();
        assert_eq!(manager.system_clock_offset(), 0.0);
        assert!(manager.entries().is_empty());
    }

    #[tokio::test]
    async fn test_now_without_clients_tracks_clock() {
        let manager = SntpManager::new();
        let before = SystemTime::now();
        let now = manager.now();
        assert!(now >= before);
        assert!(now <= SystemTime::now() + Duration::from_secs(1));
    }
}
