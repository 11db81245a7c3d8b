// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
SNTP client stack per RFC 4330: query time servers over UDP, compute the
local clock's offset from network time, and reconcile offsets from multiple
independent servers into one trustworthy value.

The stack has three layers:

- [`request`] / [`request_with_timeout`]: one-shot query against one server.
- [`SntpClient`]: one server identity with result caching, kiss-of-death
  backoff, and coalescing of concurrent callers onto a single exchange.
- [`SntpManager`]: a set of clients refreshed concurrently, each on its own
  schedule, aggregated into a single system clock offset.

This library only *reports* offsets; it never adjusts the host clock.

# Example

```no_run
use sntp_client::SntpManager;

#[tokio::main]
async fn main() {
    let manager = SntpManager::new();
    manager.add_pool_servers();

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    println!("offset to network time: {:.6}s", manager.system_clock_offset());
    println!("network time: {:?}", manager.now());
}
```
*/

#![warn(missing_docs)]

// Re-export protocol types for convenience.
pub use sntp_proto::{net_time, packet, protocol};

/// Time source abstraction, including the controllable test clock.
pub mod clock;

/// Error types for SNTP queries.
pub mod error;

/// The datagram transport boundary.
pub mod transport;

mod client;
mod manager;
mod query;
mod servers;

pub use clock::{Clock, ManualClock, SystemClock, distant_future};
pub use client::{QueryReply, SntpClient, SntpClientBuilder};
pub use error::{InvalidResponse, QueryError};
pub use manager::{EntrySnapshot, SntpManager};
pub use query::{
    DEFAULT_TIMEOUT, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL, QueryOutcome, compute_offset_delay,
};
pub use servers::POOL_SERVERS;
pub use transport::{ServerAddress, Transport, UdpTransport};

use std::time::Duration;

/// Send a one-shot request to a time server with the default 10-second
/// timeout.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), sntp_client::QueryError> {
/// use sntp_client::ServerAddress;
///
/// let outcome = sntp_client::request(&ServerAddress::new("time.nist.gov")).await?;
/// println!("offset: {:.6}s delay: {:.6}s", outcome.clock_offset, outcome.round_trip_delay);
/// # Ok(())
/// # }
/// ```
pub async fn request(server: &ServerAddress) -> Result<QueryOutcome, QueryError> {
    request_with_timeout(server, DEFAULT_TIMEOUT).await
}

/// Send a one-shot request to a time server with a configurable timeout.
///
/// A zero timeout is replaced by [`DEFAULT_TIMEOUT`].
pub async fn request_with_timeout(
    server: &ServerAddress,
    timeout: Duration,
) -> Result<QueryOutcome, QueryError> {
    query::query_server(&UdpTransport, &SystemClock, server, timeout).await
}
