//! Time source abstraction.
//!
//! All local timestamps (request transmit times, receive times, request
//! windows) flow through the [`Clock`] trait so that scheduling behavior can
//! be verified with a controllable clock instead of real waits.

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sntp_proto::net_time;

/// Seconds from the Unix epoch to 4001-01-01T00:00:00Z, the sentinel for
/// "never send another request".
const DISTANT_FUTURE_SECS: u64 = 64_092_211_200;

/// The next-request window used when a server must never be queried again
/// (DENY/RSTR kiss codes, teardown).
pub fn distant_future() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(DISTANT_FUTURE_SECS)
}

/// A source of the current local time.
pub trait Clock: Send + Sync {
    /// The current local time.
    fn now(&self) -> SystemTime;

    /// The current local time as an interval in seconds since
    /// 1900-01-01T00:00 UTC.
    fn ntp_now(&self) -> f64 {
        net_time::system_time_to_interval(self.now())
    }
}

/// The host system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to.
///
/// Lets tests drive request-window scheduling deterministically: no request
/// may be sent before a cached window has elapsed, and a `ManualClock` makes
/// "elapsed" an explicit test action.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// A manual clock starting at the given time.
    pub fn new(start: SystemTime) -> ManualClock {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    /// Move the clock to an absolute time.
    pub fn set(&self, to: SystemTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_when_told() {
        let clock = ManualClock::new(UNIX_EPOCH);
        assert_eq!(clock.now(), UNIX_EPOCH);
        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(30));
    }

    #[test]
    fn ntp_now_is_seconds_since_1900() {
        let clock = ManualClock::new(UNIX_EPOCH);
        assert_eq!(clock.ntp_now(), net_time::EPOCH_DELTA as f64);
    }

    #[test]
    fn distant_future_is_far_away() {
        let horizon = SystemTime::now() + Duration::from_secs(100 * 365 * 86_400);
        assert!(distant_future() > horizon);
    }
}
