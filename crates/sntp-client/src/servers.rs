//! Well-known public time servers.

/// Hostnames of the public NTP pool, used by
/// [`SntpManager::add_pool_servers`](crate::SntpManager::add_pool_servers).
///
/// Each name resolves to a rotating set of volunteer-operated servers; using
/// three distinct names gives the manager independent sources for its
/// aggregation rule.
pub const POOL_SERVERS: [&str; 3] = ["0.pool.ntp.org", "1.pool.ntp.org", "2.pool.ntp.org"];
