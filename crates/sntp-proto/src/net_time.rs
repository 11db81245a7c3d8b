use crate::protocol::{ShortFormat, TimestampFormat};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The number of seconds from 1st January 1900 UTC to the start of the Unix epoch.
pub const EPOCH_DELTA: i64 = 2_208_988_800;

// Fixed-point fraction scales.
const SHORT_SCALE: f64 = 65_536.0; // 2^16
const TIMESTAMP_SCALE: f64 = 4_294_967_296.0; // 2^32

impl ShortFormat {
    /// Convert to a time interval in seconds.
    ///
    /// Exact: the 16.16 fixed-point value is representable in an `f64`
    /// without loss.
    pub fn to_interval(self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / SHORT_SCALE
    }

    /// Convert a time interval in seconds to NTP short format.
    ///
    /// A negative interval encodes to the maximum representable value
    /// (saturation, not wraparound), as does an interval beyond the format's
    /// range. The fractional part rounds to the nearest 2^-16 s. NaN encodes
    /// to zero. Never panics.
    pub fn from_interval(interval: f64) -> ShortFormat {
        let saturated = ShortFormat {
            seconds: u16::MAX,
            fraction: u16::MAX,
        };
        if interval.is_nan() {
            return ShortFormat::default();
        }
        if interval < 0.0 {
            return saturated;
        }
        let secs = interval.trunc();
        if secs > u16::MAX as f64 {
            return saturated;
        }
        let mut seconds = secs as u16;
        let mut fraction = ((interval - secs) * SHORT_SCALE).round() as u32;
        if fraction > u16::MAX as u32 {
            // The fractional part rounded up to a full second.
            if seconds == u16::MAX {
                return saturated;
            }
            seconds += 1;
            fraction = 0;
        }
        ShortFormat {
            seconds,
            fraction: fraction as u16,
        }
    }
}

impl TimestampFormat {
    /// Convert to a time interval in seconds since 1900-01-01T00:00 UTC.
    pub fn to_interval(self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / TIMESTAMP_SCALE
    }

    /// Convert a time interval in seconds since 1900-01-01T00:00 UTC to NTP
    /// timestamp format.
    ///
    /// A negative interval encodes to the maximum representable 64-bit value
    /// (saturation, not wraparound), as does an interval beyond the format's
    /// range. The fractional part rounds to the nearest representable
    /// fraction. NaN encodes to zero. Never panics.
    pub fn from_interval(interval: f64) -> TimestampFormat {
        let saturated = TimestampFormat {
            seconds: u32::MAX,
            fraction: u32::MAX,
        };
        if interval.is_nan() {
            return TimestampFormat::default();
        }
        if interval < 0.0 {
            return saturated;
        }
        let secs = interval.trunc();
        if secs > u32::MAX as f64 {
            return saturated;
        }
        let mut seconds = secs as u32;
        let mut fraction = ((interval - secs) * TIMESTAMP_SCALE).round() as u64;
        if fraction > u32::MAX as u64 {
            if seconds == u32::MAX {
                return saturated;
            }
            seconds += 1;
            fraction = 0;
        }
        TimestampFormat {
            seconds,
            fraction: fraction as u32,
        }
    }
}

/// The number of seconds since 1900-01-01T00:00 UTC at the given host time.
///
/// Times before the Unix epoch produce intervals smaller than
/// [`EPOCH_DELTA`]; times before 1900 produce negative intervals.
pub fn system_time_to_interval(t: SystemTime) -> f64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(since) => EPOCH_DELTA as f64 + since.as_secs_f64(),
        Err(e) => EPOCH_DELTA as f64 - e.duration().as_secs_f64(),
    }
}

/// The host time corresponding to an interval in seconds since
/// 1900-01-01T00:00 UTC.
///
/// A non-finite interval yields the Unix epoch rather than panicking.
pub fn interval_to_system_time(interval: f64) -> SystemTime {
    let unix = interval - EPOCH_DELTA as f64;
    if !unix.is_finite() {
        return UNIX_EPOCH;
    }
    if unix >= 0.0 {
        UNIX_EPOCH + Duration::from_secs_f64(unix)
    } else {
        UNIX_EPOCH - Duration::from_secs_f64(-unix)
    }
}
