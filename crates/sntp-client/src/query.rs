//! The single-exchange query engine.
//!
//! One run of [`query_server`] performs the full request/response protocol
//! against one server: build a version-4 client packet stamped with the local
//! time, exchange it over the transport, validate the response (including the
//! originate-timestamp echo and kiss-of-death classification), and compute
//! the round-trip clock offset and delay.

use log::debug;
use std::time::Duration;

use sntp_proto::packet::{MutablePacket, Packet};
use sntp_proto::protocol::{
    self, ConstPackedSizeBytes, KissOfDeath, LeapIndicator, Mode, RawPacket,
    ReferenceIdentifier, TimestampFormat,
};

use crate::clock::Clock;
use crate::error::{InvalidResponse, QueryError};
use crate::transport::{ServerAddress, Transport};

/// Maximum time to wait for a server response when the caller does not
/// configure one. Matches the classic SNTP client default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Floor for the next-request window, per the RFC 4330 minimum interval
/// between client requests. Applied to server-advertised poll intervals and
/// used as the fixed retry delay after retryable failures.
pub const MIN_POLL_INTERVAL: f64 = 15.0;

/// Ceiling for the next-request window: 2^MAXPOLL seconds, about 36 hours.
pub const MAX_POLL_INTERVAL: f64 = (1u64 << protocol::MAXPOLL) as f64;

/// The result of one successful query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryOutcome {
    /// Offset to add to the local clock to match network time, in seconds.
    ///
    /// Positive means the local clock is behind the server.
    pub clock_offset: f64,
    /// Round-trip delay between client and server, in seconds. Reported for
    /// diagnostics; a large delay does not invalidate the offset.
    pub round_trip_delay: f64,
    /// The server-advertised poll interval in seconds (2^poll, unclamped).
    pub poll_interval: f64,
    /// The validated response packet.
    pub packet: Packet,
}

/// Compute clock offset and round-trip delay from the four exchange
/// timestamps, each an interval in seconds since 1900-01-01T00:00 UTC:
/// T1 = client transmit, T2 = server receive, T3 = server transmit,
/// T4 = client receive.
///
/// `offset = ((T2 − T1) + (T3 − T4)) / 2`
/// `delay  = (T4 − T1) − (T3 − T2)`
pub fn compute_offset_delay(t1: f64, t2: f64, t3: f64, t4: f64) -> (f64, f64) {
    let offset = ((t2 - t1) + (t3 - t4)) / 2.0;
    let delay = (t4 - t1) - (t3 - t2);
    (offset, delay)
}

/// Build a client request packet stamped with the current local time.
///
/// Returns the serialized buffer and the transmit timestamp (T1), which the
/// server must echo back in the originate field.
pub(crate) fn build_request(
    clock: &dyn Clock,
) -> ([u8; RawPacket::PACKED_SIZE_BYTES], TimestampFormat) {
    let t1 = TimestampFormat::from_interval(clock.ntp_now());
    let mut request = MutablePacket::new();
    request.set_version(protocol::VERSION);
    request.set_mode(Mode::Client);
    request.set_transmit_timestamp_raw(t1);
    (request.data(), t1)
}

/// Validate a server response and compute the query outcome.
///
/// `t1` is the request's transmit timestamp; `t4` the local receive time as
/// an interval since 1900. Rejections follow RFC 4330 Section 5: length,
/// mode, version, originate echo, kiss-of-death classification at stratum 0,
/// then the remaining sanity checks.
pub(crate) fn validate_response(
    data: &[u8],
    t1: TimestampFormat,
    t4: f64,
) -> Result<QueryOutcome, QueryError> {
    if data.len() < RawPacket::PACKED_SIZE_BYTES {
        return Err(InvalidResponse::ResponseTooShort {
            received: data.len(),
        }
        .into());
    }
    let packet = Packet::from_bytes(data);

    if packet.mode() != Mode::Server {
        return Err(InvalidResponse::UnexpectedMode.into());
    }
    if packet.version() != protocol::VERSION {
        return Err(InvalidResponse::UnsupportedVersion {
            version: packet.version(),
        }
        .into());
    }
    // Anti-spoofing / stale-response check: the server must echo our
    // transmit timestamp bit-exactly.
    if packet.raw().originate_timestamp != t1 {
        return Err(InvalidResponse::OriginTimestampMismatch.into());
    }

    // Kiss-of-death classification (RFC 5905 Section 7.4).
    if packet.stratum() == 0 {
        return Err(match packet.reference_identifier() {
            ReferenceIdentifier::KissOfDeath(code @ (KissOfDeath::Deny | KissOfDeath::Rstr)) => {
                QueryError::AccessDenied(code)
            }
            ReferenceIdentifier::KissOfDeath(KissOfDeath::Rate) => QueryError::RateLimitExceeded,
            _ => InvalidResponse::UnknownKissCode {
                code: packet.raw_reference_identifier().to_be_bytes(),
            }
            .into(),
        });
    }

    if packet.stratum() >= protocol::MAXSTRAT {
        return Err(InvalidResponse::InvalidStratum {
            stratum: packet.stratum(),
        }
        .into());
    }
    if packet.raw().transmit_timestamp.is_zero() {
        return Err(InvalidResponse::ZeroTransmitTimestamp.into());
    }
    if packet.leap_indicator() == LeapIndicator::Unknown {
        return Err(InvalidResponse::UnsynchronizedServer.into());
    }

    let (clock_offset, round_trip_delay) = compute_offset_delay(
        t1.to_interval(),
        packet.receive_timestamp(),
        packet.transmit_timestamp(),
        t4,
    );

    Ok(QueryOutcome {
        clock_offset,
        round_trip_delay,
        poll_interval: packet.poll_interval(),
        packet,
    })
}

/// Run one request/response exchange against `server`.
///
/// A zero `timeout` is replaced by [`DEFAULT_TIMEOUT`].
pub(crate) async fn query_server(
    transport: &dyn Transport,
    clock: &dyn Clock,
    server: &ServerAddress,
    timeout: Duration,
) -> Result<QueryOutcome, QueryError> {
    let timeout = if timeout.is_zero() {
        DEFAULT_TIMEOUT
    } else {
        timeout
    };

    let (request, t1) = build_request(clock);
    debug!("querying {}", server);
    let response = transport.exchange(&request, server, timeout).await?;
    // Record T4 immediately on arrival, before any decoding.
    let t4 = clock.ntp_now();

    validate_response(&response, t1, t4)
}
