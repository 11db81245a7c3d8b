// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for SNTP queries.
//!
//! Every error carries a recommended retry posture: transport-level and
//! malformed-response failures are retryable after a short delay, a RATE kiss
//! code is retryable only after an increased backoff, and DENY/RSTR kiss codes
//! and teardown are terminal for their server.
//!
//! Errors are `Clone` because a single query's outcome is delivered to every
//! coalesced caller; transport failures are therefore captured as an
//! [`io::ErrorKind`] plus message rather than the non-clonable [`io::Error`].

use std::fmt;
use std::io;

use sntp_proto::protocol::KissOfDeath;

/// Errors that can occur while querying a time server.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryError {
    /// A networking error occurred. Retryable after a short delay.
    Network {
        /// Kind of the underlying transport error.
        kind: io::ErrorKind,
        /// Description of the underlying transport error.
        message: String,
    },
    /// The server didn't answer in a timely manner. Retryable.
    Timeout,
    /// The server sent an invalid response. Retryable, though repeated
    /// occurrences indicate a misbehaving server.
    InvalidResponse(InvalidResponse),
    /// The server has asked us to stop sending requests (DENY or RSTR kiss
    /// code). Not retryable: the server must not be queried again.
    AccessDenied(KissOfDeath),
    /// The server wants us to send with bigger delays (RATE kiss code).
    /// Retryable only after an increased backoff.
    RateLimitExceeded,
    /// The client or manager was torn down while the query was outstanding.
    /// Not retryable.
    Cancelled,
}

/// Detail on why a server response was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum InvalidResponse {
    /// Response packet too short (< 48 bytes).
    ResponseTooShort {
        /// Number of bytes received.
        received: usize,
    },
    /// Response has wrong mode (expected Server).
    UnexpectedMode,
    /// Response carries an unsupported protocol version.
    UnsupportedVersion {
        /// The version the server sent.
        version: u8,
    },
    /// Originate timestamp does not match our request (stale or spoofed
    /// response).
    OriginTimestampMismatch,
    /// Server transmit timestamp is zero (unsent).
    ZeroTransmitTimestamp,
    /// Stratum outside the valid server range (16-255).
    InvalidStratum {
        /// The stratum the server sent.
        stratum: u8,
    },
    /// Server reports an unsynchronized clock (leap indicator 3).
    UnsynchronizedServer,
    /// Stratum-0 response with an unrecognized kiss code.
    UnknownKissCode {
        /// The raw four-byte code.
        code: [u8; 4],
    },
}

impl QueryError {
    /// Whether the caller may automatically query this server again.
    ///
    /// `AccessDenied` and `Cancelled` are terminal; everything else is
    /// retryable once the recommended next-request window has elapsed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, QueryError::AccessDenied(_) | QueryError::Cancelled)
    }
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Network { message, .. } => write!(f, "network error: {message}"),
            QueryError::Timeout => write!(f, "server did not answer in a timely manner"),
            QueryError::InvalidResponse(e) => write!(f, "invalid server response: {e}"),
            QueryError::AccessDenied(code) => {
                write!(f, "server sent kiss-o'-death {code}: stop querying this server")
            }
            QueryError::RateLimitExceeded => {
                write!(f, "server sent kiss-o'-death RATE: reduce request rate")
            }
            QueryError::Cancelled => write!(f, "query cancelled: client is shutting down"),
        }
    }
}

impl fmt::Display for InvalidResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidResponse::ResponseTooShort { received } => {
                write!(f, "response too short ({received} bytes)")
            }
            InvalidResponse::UnexpectedMode => {
                write!(f, "unexpected response mode (expected Server)")
            }
            InvalidResponse::UnsupportedVersion { version } => {
                write!(f, "unsupported version {version}")
            }
            InvalidResponse::OriginTimestampMismatch => {
                write!(f, "originate timestamp does not match our request")
            }
            InvalidResponse::ZeroTransmitTimestamp => {
                write!(f, "server transmit timestamp is zero")
            }
            InvalidResponse::InvalidStratum { stratum } => {
                write!(f, "invalid stratum {stratum}")
            }
            InvalidResponse::UnsynchronizedServer => {
                write!(f, "server reports unsynchronized clock")
            }
            InvalidResponse::UnknownKissCode { code } => {
                write!(f, "unknown kiss code {:?}", String::from_utf8_lossy(code))
            }
        }
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for QueryError {}
impl std::error::Error for InvalidResponse {}

// ── From conversions ────────────────────────────────────────────────

impl From<io::Error> for QueryError {
    fn from(err: io::Error) -> QueryError {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => QueryError::Timeout,
            kind => QueryError::Network {
                kind,
                message: err.to_string(),
            },
        }
    }
}

impl From<InvalidResponse> for QueryError {
    fn from(err: InvalidResponse) -> QueryError {
        QueryError::InvalidResponse(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_response_display() {
        let e = InvalidResponse::ResponseTooShort { received: 10 };
        assert_eq!(e.to_string(), "response too short (10 bytes)");
        let e = InvalidResponse::UnknownKissCode { code: *b"Foo " };
        assert_eq!(e.to_string(), "unknown kiss code \"Foo \"");
    }

    #[test]
    fn test_access_denied_display_names_code() {
        let e = QueryError::AccessDenied(KissOfDeath::Rstr);
        assert!(e.to_string().contains("RSTR"));
    }

    #[test]
    fn test_retryability() {
        assert!(QueryError::Timeout.is_retryable());
        assert!(QueryError::RateLimitExceeded.is_retryable());
        assert!(
            QueryError::InvalidResponse(InvalidResponse::UnexpectedMode).is_retryable()
        );
        assert!(!QueryError::AccessDenied(KissOfDeath::Deny).is_retryable());
        assert!(!QueryError::Cancelled.is_retryable());
    }

    #[test]
    fn test_from_io_error_maps_timeout() {
        let err: QueryError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert_eq!(err, QueryError::Timeout);

        let err: QueryError = io::Error::new(io::ErrorKind::ConnectionRefused, "nope").into();
        assert!(matches!(
            err,
            QueryError::Network {
                kind: io::ErrorKind::ConnectionRefused,
                ..
            }
        ));
    }
}
