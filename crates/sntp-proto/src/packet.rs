// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Semantic packet views over the raw wire header.
//!
//! [`Packet`] is the read-only, wire-validated view used to interpret server
//! responses in physically meaningful units (seconds instead of exponents and
//! fixed-point words). [`MutablePacket`] is the read-write variant used to
//! construct outgoing requests (and server replies in tests), serialized via
//! [`MutablePacket::data`].

use crate::protocol::{
    ConstPackedSizeBytes, LeapIndicator, Mode, RawPacket, ReferenceIdentifier, ShortFormat,
    TimestampFormat,
};

/// A decoded, read-only SNTP packet.
///
/// Constructed from received bytes. Decoding never fails: a buffer shorter
/// than 48 bytes yields a packet for which [`Packet::is_empty`] is true, and
/// any real exchange carries a nonzero version and mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Packet {
    raw: RawPacket,
}

impl Packet {
    /// Decode a packet from received bytes.
    pub fn from_bytes(data: &[u8]) -> Packet {
        Packet {
            raw: RawPacket::decode(data),
        }
    }

    /// View over an already-decoded raw header.
    pub fn from_raw(raw: RawPacket) -> Packet {
        Packet { raw }
    }

    /// Access to the raw header fields, for bit-exact comparisons.
    pub fn raw(&self) -> &RawPacket {
        &self.raw
    }

    /// Whether this packet came from a buffer too short to decode.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Leap second indicator. Significant only in server messages.
    pub fn leap_indicator(&self) -> LeapIndicator {
        LeapIndicator::from_bits(self.raw.leap_indicator)
    }

    /// NTP/SNTP version number. Only version 4 is supported.
    pub fn version(&self) -> u8 {
        self.raw.version
    }

    /// Protocol mode.
    pub fn mode(&self) -> Mode {
        Mode::from_bits(self.raw.mode)
    }

    /// Stratum: 0 is a kiss-o'-death message, 1 a primary reference,
    /// 2-15 a secondary reference, 16-255 reserved.
    pub fn stratum(&self) -> u8 {
        self.raw.stratum
    }

    /// Poll interval as an exponent of two.
    pub fn raw_poll_interval(&self) -> u8 {
        self.raw.poll
    }

    /// Poll interval in seconds: the maximum interval between successive
    /// messages, derived as 2^poll.
    pub fn poll_interval(&self) -> f64 {
        2f64.powi(self.raw.poll as i32)
    }

    /// System clock precision as an exponent of two.
    pub fn raw_precision(&self) -> i8 {
        self.raw.precision
    }

    /// System clock precision in seconds, derived as 2^precision.
    pub fn precision(&self) -> f64 {
        2f64.powi(self.raw.precision as i32)
    }

    /// Total round-trip delay to the primary reference source, in seconds.
    pub fn root_delay(&self) -> f64 {
        self.raw.root_delay.to_interval()
    }

    /// Maximum error due to clock frequency tolerance, in seconds.
    pub fn root_dispersion(&self) -> f64 {
        self.raw.root_dispersion.to_interval()
    }

    /// Reference source, interpreted according to the stratum.
    pub fn reference_identifier(&self) -> ReferenceIdentifier {
        ReferenceIdentifier::from_raw(self.raw.stratum, self.raw.reference_id)
    }

    /// The raw 32-bit reference identifier.
    pub fn raw_reference_identifier(&self) -> u32 {
        self.raw.reference_id
    }

    /// The time the system clock was last set or corrected, as an interval
    /// relative to 1900-01-01T00:00 UTC.
    pub fn reference_timestamp(&self) -> f64 {
        self.raw.reference_timestamp.to_interval()
    }

    /// The time at which the request departed the client for the server,
    /// relative to 1900-01-01T00:00 UTC.
    pub fn originate_timestamp(&self) -> f64 {
        self.raw.originate_timestamp.to_interval()
    }

    /// The time at which the request arrived at the server, relative to
    /// 1900-01-01T00:00 UTC.
    pub fn receive_timestamp(&self) -> f64 {
        self.raw.receive_timestamp.to_interval()
    }

    /// The time at which the reply departed the server, relative to
    /// 1900-01-01T00:00 UTC.
    pub fn transmit_timestamp(&self) -> f64 {
        self.raw.transmit_timestamp.to_interval()
    }
}

/// A mutable SNTP packet, used to construct outgoing requests.
///
/// Setters accept the same physical units the [`Packet`] getters expose;
/// timestamps additionally have raw variants for bit-exact echoing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MutablePacket {
    raw: RawPacket,
}

impl MutablePacket {
    /// An all-zero packet; set at least version, mode, and the transmit
    /// timestamp before sending.
    pub fn new() -> MutablePacket {
        MutablePacket::default()
    }

    /// Set the leap second indicator.
    pub fn set_leap_indicator(&mut self, li: LeapIndicator) {
        self.raw.leap_indicator = li as u8;
    }

    /// Set the version number (masked to 3 bits).
    pub fn set_version(&mut self, version: u8) {
        self.raw.version = version & 0b111;
    }

    /// Set the protocol mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.raw.mode = mode as u8;
    }

    /// Set the stratum.
    pub fn set_stratum(&mut self, stratum: u8) {
        self.raw.stratum = stratum;
    }

    /// Set the poll interval exponent.
    pub fn set_raw_poll_interval(&mut self, poll: u8) {
        self.raw.poll = poll;
    }

    /// Set the precision exponent.
    pub fn set_raw_precision(&mut self, precision: i8) {
        self.raw.precision = precision;
    }

    /// Set the root delay from a time interval in seconds.
    pub fn set_root_delay(&mut self, interval: f64) {
        self.raw.root_delay = ShortFormat::from_interval(interval);
    }

    /// Set the root dispersion from a time interval in seconds.
    pub fn set_root_dispersion(&mut self, interval: f64) {
        self.raw.root_dispersion = ShortFormat::from_interval(interval);
    }

    /// Set the raw 32-bit reference identifier.
    pub fn set_reference_identifier(&mut self, raw: u32) {
        self.raw.reference_id = raw;
    }

    /// Set the reference timestamp from an interval since 1900-01-01T00:00 UTC.
    pub fn set_reference_timestamp(&mut self, interval: f64) {
        self.raw.reference_timestamp = TimestampFormat::from_interval(interval);
    }

    /// Set the originate timestamp from an interval since 1900-01-01T00:00 UTC.
    pub fn set_originate_timestamp(&mut self, interval: f64) {
        self.raw.originate_timestamp = TimestampFormat::from_interval(interval);
    }

    /// Set the originate timestamp bit-exactly (used to echo a request's
    /// transmit timestamp).
    pub fn set_originate_timestamp_raw(&mut self, ts: TimestampFormat) {
        self.raw.originate_timestamp = ts;
    }

    /// Set the receive timestamp from an interval since 1900-01-01T00:00 UTC.
    pub fn set_receive_timestamp(&mut self, interval: f64) {
        self.raw.receive_timestamp = TimestampFormat::from_interval(interval);
    }

    /// Set the transmit timestamp from an interval since 1900-01-01T00:00 UTC.
    pub fn set_transmit_timestamp(&mut self, interval: f64) {
        self.raw.transmit_timestamp = TimestampFormat::from_interval(interval);
    }

    /// Set the transmit timestamp bit-exactly.
    pub fn set_transmit_timestamp_raw(&mut self, ts: TimestampFormat) {
        self.raw.transmit_timestamp = ts;
    }

    /// Serialize into the 48-byte wire representation.
    pub fn data(&self) -> [u8; RawPacket::PACKED_SIZE_BYTES] {
        self.raw.encode()
    }

    /// The read-only view of this packet.
    pub fn freeze(self) -> Packet {
        Packet { raw: self.raw }
    }
}
