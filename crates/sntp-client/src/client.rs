// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Cached, coalescing client for a single time server.
//!
//! [`SntpClient`] owns one server identity and enforces the server's request
//! schedule: at most one exchange in flight, no exchange before the cached
//! next-request window has elapsed, and every concurrent caller attached to
//! the single pending result.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() {
//! use sntp_client::{ServerAddress, SntpClient};
//!
//! let client = SntpClient::new(ServerAddress::new("0.pool.ntp.org"));
//! let reply = client.query_time().await;
//! match reply.error {
//!     None => println!("offset: {:.6}s", reply.clock_offset),
//!     Some(err) => eprintln!("query failed: {err}"),
//! }
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock, distant_future};
use crate::error::QueryError;
use crate::query::{self, DEFAULT_TIMEOUT, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::transport::{ServerAddress, Transport, UdpTransport};

/// The outcome of [`SntpClient::query_time`], delivered identically to every
/// coalesced caller.
#[derive(Clone, Debug)]
pub struct QueryReply {
    /// On success, the offset to add to the system clock to get the server's
    /// time. On error, the last known good offset (or 0.0 if none).
    pub clock_offset: f64,
    /// The earliest local time at which the client may send another request.
    /// [`distant_future()`](crate::clock::distant_future) when the server must
    /// never be queried again.
    pub next_request_window: SystemTime,
    /// The error, if the query failed.
    pub error: Option<QueryError>,
}

struct ClientState {
    /// Last completed reply, success or error. Returned to callers while the
    /// window is closed.
    cached: Option<QueryReply>,
    /// Earliest time the next request may be sent.
    next_window: SystemTime,
    /// Current request interval in seconds. Set from the server's advertised
    /// poll interval on success, doubled on RATE.
    poll_interval: f64,
    /// Present while an exchange is in flight; late callers subscribe.
    pending: Option<broadcast::Sender<QueryReply>>,
    /// Number of network exchanges initiated so far.
    request_count: u64,
}

struct ClientInner {
    server: ServerAddress,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    state: Mutex<ClientState>,
    shutdown: watch::Sender<bool>,
}

impl ClientInner {
    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancelled_reply(&self) -> QueryReply {
        let last_offset = self
            .lock_state()
            .cached
            .as_ref()
            .map_or(0.0, |c| c.clock_offset);
        QueryReply {
            clock_offset: last_offset,
            next_request_window: distant_future(),
            error: Some(QueryError::Cancelled),
        }
    }

    /// Run one exchange and publish the reply to every attached caller.
    async fn run_query(self: Arc<Self>) -> QueryReply {
        self.lock_state().request_count += 1;

        let mut shutdown_rx = self.shutdown.subscribe();
        let result = if *shutdown_rx.borrow() {
            Err(QueryError::Cancelled)
        } else {
            // Cancellable up to the point the response is decoded; on
            // shutdown the pending receive is simply dropped.
            tokio::select! {
                _ = shutdown_rx.changed() => Err(QueryError::Cancelled),
                result = query::query_server(
                    self.transport.as_ref(),
                    self.clock.as_ref(),
                    &self.server,
                    self.timeout,
                ) => result,
            }
        };

        let mut state = self.lock_state();
        let now = self.clock.now();
        let reply = match result {
            Ok(outcome) => {
                let interval = outcome
                    .poll_interval
                    .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
                state.poll_interval = interval;
                debug!(
                    server = %self.server,
                    offset = outcome.clock_offset,
                    delay = outcome.round_trip_delay,
                    next_in = interval,
                    "query succeeded"
                );
                QueryReply {
                    clock_offset: outcome.clock_offset,
                    next_request_window: now + Duration::from_secs_f64(interval),
                    error: None,
                }
            }
            Err(error) => {
                let last_offset = state.cached.as_ref().map_or(0.0, |c| c.clock_offset);
                let next_request_window = match &error {
                    QueryError::AccessDenied(code) => {
                        warn!(server = %self.server, %code, "server denied access, demobilizing");
                        distant_future()
                    }
                    QueryError::Cancelled => distant_future(),
                    QueryError::RateLimitExceeded => {
                        state.poll_interval = (state.poll_interval * 2.0)
                            .clamp(2.0 * MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
                        warn!(
                            server = %self.server,
                            backoff = state.poll_interval,
                            "server sent RATE, increasing request interval"
                        );
                        now + Duration::from_secs_f64(state.poll_interval)
                    }
                    _ => {
                        debug!(server = %self.server, %error, "query failed, will retry");
                        now + Duration::from_secs_f64(MIN_POLL_INTERVAL)
                    }
                };
                QueryReply {
                    clock_offset: last_offset,
                    next_request_window,
                    error: Some(error),
                }
            }
        };

        state.cached = Some(reply.clone());
        state.next_window = reply.next_request_window;
        let pending = state.pending.take();
        drop(state);

        if let Some(tx) = pending {
            // Send errors just mean no coalesced callers are waiting.
            let _ = tx.send(reply.clone());
        }
        reply
    }
}

/// Builder for configuring an [`SntpClient`].
pub struct SntpClientBuilder {
    server: ServerAddress,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SntpClientBuilder {
    /// Maximum time to wait for a response from the server.
    ///
    /// Defaults to 10 seconds; a zero duration is replaced by the default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        self
    }

    /// Use a custom datagram transport (tests substitute an in-memory
    /// server here).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client.
    pub fn build(self) -> SntpClient {
        let (shutdown, _) = watch::channel(false);
        SntpClient {
            inner: Arc::new(ClientInner {
                server: self.server,
                timeout: self.timeout,
                transport: self
                    .transport
                    .unwrap_or_else(|| Arc::new(UdpTransport)),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                state: Mutex::new(ClientState {
                    cached: None,
                    next_window: UNIX_EPOCH,
                    poll_interval: MIN_POLL_INTERVAL,
                    pending: None,
                    request_count: 0,
                }),
                shutdown,
            }),
        }
    }
}

/// A client for one time server, caching the last result and the earliest
/// time the next request may be sent.
pub struct SntpClient {
    inner: Arc<ClientInner>,
}

impl SntpClient {
    /// A client with the default UDP transport, system clock, and timeout.
    pub fn new(server: ServerAddress) -> SntpClient {
        SntpClient::builder(server).build()
    }

    /// Create a builder for configuring the client.
    pub fn builder(server: ServerAddress) -> SntpClientBuilder {
        SntpClientBuilder {
            server,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            clock: None,
        }
    }

    /// The server this client queries.
    pub fn server(&self) -> &ServerAddress {
        &self.inner.server
    }

    /// The server identity string (`host:port`), used as the manager's
    /// entry key.
    pub fn identity(&self) -> String {
        self.inner.server.to_string()
    }

    /// The configured response timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Number of network exchanges initiated so far. Calls answered from the
    /// cache or coalesced onto a pending exchange do not count.
    pub fn request_count(&self) -> u64 {
        self.inner.lock_state().request_count
    }

    /// Query the server, or return cached data.
    ///
    /// - Before the cached next-request window has elapsed, the cached reply
    ///   (success or error) is returned unchanged and no traffic is sent.
    /// - While an exchange is in flight, additional callers receive the
    ///   result of that single exchange.
    /// - Otherwise one exchange runs; its reply is cached and returned.
    ///
    /// After [`SntpClient::shutdown`], every caller (pending or new) receives
    /// a [`QueryError::Cancelled`] reply with a never window.
    pub async fn query_time(&self) -> QueryReply {
        enum Attach {
            Cached(QueryReply),
            Wait(broadcast::Receiver<QueryReply>),
            Run,
        }

        let attach = {
            let mut state = self.inner.lock_state();
            if *self.inner.shutdown.borrow() {
                drop(state);
                return self.inner.cancelled_reply();
            }
            if let Some(tx) = &state.pending {
                Attach::Wait(tx.subscribe())
            } else {
                let now = self.inner.clock.now();
                match &state.cached {
                    Some(cached) if now < state.next_window => Attach::Cached(cached.clone()),
                    _ => {
                        let (tx, _) = broadcast::channel(1);
                        state.pending = Some(tx);
                        Attach::Run
                    }
                }
            }
        };

        match attach {
            Attach::Cached(reply) => reply,
            Attach::Wait(mut rx) => match rx.recv().await {
                Ok(reply) => reply,
                Err(_) => self.inner.cancelled_reply(),
            },
            Attach::Run => {
                // Run on a separate task so the exchange completes (and
                // coalesced callers resolve) even if this caller goes away.
                let inner = Arc::clone(&self.inner);
                match tokio::spawn(inner.run_query()).await {
                    Ok(reply) => reply,
                    Err(_) => self.inner.cancelled_reply(),
                }
            }
        }
    }

    /// Stop the client: cancel any in-flight exchange and resolve all
    /// pending callers with [`QueryError::Cancelled`] and a never window.
    ///
    /// Also invoked on drop.
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown.send(true);
    }
}

impl Drop for SntpClient {
    fn drop(&mut self) {
        let _ = self.inner.shutdown.send(true);
    }
}

impl std::fmt::Debug for SntpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SntpClient")
            .field("server", &self.inner.server)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = SntpClient::new(ServerAddress::new("example.org"));
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(client.identity(), "example.org:123");
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn test_zero_timeout_replaced_by_default() {
        let client = SntpClient::builder(ServerAddress::new("example.org"))
            .timeout(Duration::ZERO)
            .build();
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_custom_timeout_kept() {
        let client = SntpClient::builder(ServerAddress::new("example.org"))
            .timeout(Duration::from_secs(2))
            .build();
        assert_eq!(client.timeout(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_query_after_shutdown_is_cancelled() {
        let client = SntpClient::new(ServerAddress::new("example.org"));
        client.shutdown();
        let reply = client.query_time().await;
        assert_eq!(reply.error, Some(QueryError::Cancelled));
        assert_eq!(reply.next_request_window, distant_future());
    }
}
