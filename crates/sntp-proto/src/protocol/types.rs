use core::fmt;

use super::ConstPackedSizeBytes;
use super::four_char_code;
use crate::error::ParseError;

/// **NTP Short Format** - Used in delay and dispersion header fields where the full resolution and
/// range of the other formats are not justified. It includes a 16-bit unsigned seconds field and a
/// 16-bit fraction field.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          Seconds              |           Fraction            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShortFormat {
    /// Seconds component (16-bit unsigned).
    pub seconds: u16,
    /// Fractional seconds component (16-bit unsigned).
    pub fraction: u16,
}

/// **NTP Timestamp Format** - Used in packet headers and other places with limited word size. It
/// includes a 32-bit unsigned seconds field spanning 136 years and a 32-bit fraction field
/// resolving 232 picoseconds.
///
/// The prime epoch is 0 h 1 January 1900 UTC, when all bits are zero.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Seconds                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Fraction                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimestampFormat {
    /// Seconds since 1900-01-01 00:00:00 UTC (32-bit unsigned).
    pub seconds: u32,
    /// Fractional seconds (32-bit unsigned, resolution of ~232 picoseconds).
    pub fraction: u32,
}

impl TimestampFormat {
    /// Whether both the seconds and fraction components are zero.
    ///
    /// A zero transmit timestamp in a server response marks the response as
    /// unsent/invalid (RFC 4330 Section 5).
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }
}

/// A 2-bit integer warning of an impending leap second to be inserted or deleted in the last
/// minute of the current month.
///
/// Note that this field is packed in the actual header.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum LeapIndicator {
    /// No leap required.
    #[default]
    NoWarning = 0,
    /// Last minute of the day has 61 seconds.
    AddOne = 1,
    /// Last minute of the day has 59 seconds.
    SubOne = 2,
    /// Clock unsynchronized.
    Unknown = 3,
}

impl LeapIndicator {
    /// Interpret the low two bits of `bits` as a leap indicator.
    ///
    /// Total: every 2-bit value is a valid leap indicator.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::AddOne,
            2 => LeapIndicator::SubOne,
            _ => LeapIndicator::Unknown,
        }
    }
}

/// A 3-bit integer representing the mode.
///
/// Note that while this struct is 8-bits, this field is packed to 3 in the actual header.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Reserved mode (value 0).
    Reserved = 0,
    /// Symmetric active mode (value 1).
    SymmetricActive = 1,
    /// Symmetric passive mode (value 2).
    SymmetricPassive = 2,
    /// Client mode (value 3).
    #[default]
    Client = 3,
    /// Server mode (value 4).
    Server = 4,
    /// Broadcast mode (value 5).
    Broadcast = 5,
    /// NTP control message mode (value 6).
    NtpControlMessage = 6,
    /// Reserved for private use (value 7).
    ReservedForPrivateUse = 7,
}

impl Mode {
    /// Interpret the low three bits of `bits` as a mode.
    ///
    /// Total: every 3-bit value is a valid mode.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::NtpControlMessage,
            _ => Mode::ReservedForPrivateUse,
        }
    }
}

/// If the Stratum field is 0, which implies unspecified or invalid, the Reference Identifier
/// field can be used to convey messages useful for status reporting and access control. These
/// are called **Kiss-o'-Death** (KoD) packets and the ASCII messages they convey are called
/// kiss codes.
///
/// Recipients of kiss codes MUST inspect them and, for the codes below, take the actions
/// described (RFC 5905 Section 7.4).
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KissOfDeath {
    /// The client MUST demobilize any associations to that server and stop sending packets to it.
    Deny = four_char_code(b"DENY"),
    /// The client MUST demobilize any associations to that server and stop sending packets to it.
    Rstr = four_char_code(b"RSTR"),
    /// The client MUST immediately reduce its polling interval to that server and continue to
    /// reduce it each time it receives a RATE kiss code.
    Rate = four_char_code(b"RATE"),
}

impl TryFrom<u32> for KissOfDeath {
    type Error = ParseError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            v if v == four_char_code(b"DENY") => Ok(KissOfDeath::Deny),
            v if v == four_char_code(b"RSTR") => Ok(KissOfDeath::Rstr),
            v if v == four_char_code(b"RATE") => Ok(KissOfDeath::Rate),
            _ => Err(ParseError::InvalidField {
                field: "kiss code",
                value,
            }),
        }
    }
}

impl fmt::Display for KissOfDeath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            KissOfDeath::Deny => "DENY",
            KissOfDeath::Rstr => "RSTR",
            KissOfDeath::Rate => "RATE",
        };
        write!(f, "{}", code)
    }
}

/// A 32-bit code identifying the particular server or reference clock.
///
/// The interpretation depends on the value in the stratum field:
///
/// - For packet stratum 0 (unspecified or invalid), this is a four-character ASCII
///   string, called the "kiss code", used for debugging and monitoring purposes.
/// - For stratum 1 (reference clock), this is a four-octet, left-justified, zero-padded ASCII
///   string assigned to the reference clock.
/// - For secondary servers (stratum 2-15), this is the IPv4 address of the synchronization
///   source, or the first four octets of the MD5 hash of its IPv6 address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReferenceIdentifier {
    /// Kiss-o'-Death packet code (stratum 0).
    KissOfDeath(KissOfDeath),
    /// Primary reference source identifier (stratum 1), a four-character ASCII code
    /// such as `GPS\0` or `DCF\0`.
    Primary([u8; 4]),
    /// The reference identifier of a secondary server (stratum 2-15). Can be used to
    /// detect timing loops.
    SecondaryOrClient([u8; 4]),
    /// An unrecognized 4-byte reference identifier: stratum 0 packets with non-standard
    /// kiss codes, and stratum 16+ (unsynchronized/reserved) packets.
    Unknown([u8; 4]),
}

impl ReferenceIdentifier {
    /// Interpret a raw reference identifier according to the packet's stratum
    /// (RFC 5905 Section 7.3).
    pub fn from_raw(stratum: u8, raw: u32) -> Self {
        let bytes = raw.to_be_bytes();
        match stratum {
            0 => match KissOfDeath::try_from(raw) {
                Ok(kod) => ReferenceIdentifier::KissOfDeath(kod),
                Err(_) => ReferenceIdentifier::Unknown(bytes),
            },
            1 => ReferenceIdentifier::Primary(bytes),
            2..=15 => ReferenceIdentifier::SecondaryOrClient(bytes),
            _ => ReferenceIdentifier::Unknown(bytes),
        }
    }

    /// Returns the raw 4-byte representation of the reference identifier.
    pub fn as_bytes(&self) -> [u8; 4] {
        match *self {
            ReferenceIdentifier::KissOfDeath(kod) => (kod as u32).to_be_bytes(),
            ReferenceIdentifier::Primary(arr) => arr,
            ReferenceIdentifier::SecondaryOrClient(arr) => arr,
            ReferenceIdentifier::Unknown(arr) => arr,
        }
    }

    /// Returns true if this is a Kiss-o'-Death reference identifier.
    pub fn is_kiss_of_death(&self) -> bool {
        matches!(self, ReferenceIdentifier::KissOfDeath(_))
    }
}

/// **Packet Header** - The raw 48-byte SNTP packet header, with the packed
/// LI/VN/Mode byte already unpacked into its three components.
///
/// All multi-byte fields are in host byte order; the codec converts to and from
/// network byte order. Field semantics follow RFC 5905 Section 7.3:
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |LI | VN  |Mode |    Stratum     |     Poll      |  Precision   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Delay                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Dispersion                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Reference ID                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                     Reference Timestamp (64)                  +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                      Origin Timestamp (64)                    +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                      Receive Timestamp (64)                   +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                      Transmit Timestamp (64)                  +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RawPacket {
    /// Leap indicator warning of impending leap second (2 bits).
    pub leap_indicator: u8,
    /// NTP protocol version number (3 bits).
    pub version: u8,
    /// Association mode (3 bits).
    pub mode: u8,
    /// Stratum level of the time source.
    pub stratum: u8,
    /// Maximum interval between successive messages, in log2 seconds.
    pub poll: u8,
    /// Precision of the system clock, in log2 seconds.
    pub precision: i8,
    /// Total round-trip delay to the reference clock, in NTP short format.
    pub root_delay: ShortFormat,
    /// Total dispersion to the reference clock, in NTP short format.
    pub root_dispersion: ShortFormat,
    /// Code identifying the particular server or reference clock.
    pub reference_id: u32,
    /// Time when the system clock was last set or corrected.
    pub reference_timestamp: TimestampFormat,
    /// Time at the client when the request departed for the server.
    pub originate_timestamp: TimestampFormat,
    /// Time at the server when the request arrived from the client.
    pub receive_timestamp: TimestampFormat,
    /// Time at the server when the response left for the client.
    pub transmit_timestamp: TimestampFormat,
}

impl RawPacket {
    /// Decode a raw SNTP datagram.
    ///
    /// Never fails: a buffer shorter than 48 bytes yields the all-zero packet,
    /// not a partial parse. Callers must treat the all-zero packet as
    /// empty/invalid using [`RawPacket::is_empty`]; a real exchange always
    /// carries a nonzero version and mode.
    pub fn decode(data: &[u8]) -> RawPacket {
        use super::FromBytes;
        match RawPacket::from_bytes(data) {
            Ok((packet, _)) => packet,
            Err(_) => RawPacket::default(),
        }
    }

    /// Encode the packet into its 48-byte wire representation.
    ///
    /// Always succeeds; fields are packed at their RFC 5905 bit offsets in
    /// network byte order. The LI/VN/Mode byte is assembled with explicit
    /// shifts and masks.
    pub fn encode(&self) -> [u8; Self::PACKED_SIZE_BYTES] {
        let mut buf = [0u8; Self::PACKED_SIZE_BYTES];
        buf[0] = (self.leap_indicator & 0b11) << 6
            | (self.version & 0b111) << 3
            | (self.mode & 0b111);
        buf[1] = self.stratum;
        buf[2] = self.poll;
        buf[3] = self.precision as u8;
        buf[4..6].copy_from_slice(&self.root_delay.seconds.to_be_bytes());
        buf[6..8].copy_from_slice(&self.root_delay.fraction.to_be_bytes());
        buf[8..10].copy_from_slice(&self.root_dispersion.seconds.to_be_bytes());
        buf[10..12].copy_from_slice(&self.root_dispersion.fraction.to_be_bytes());
        buf[12..16].copy_from_slice(&self.reference_id.to_be_bytes());
        for (i, ts) in [
            self.reference_timestamp,
            self.originate_timestamp,
            self.receive_timestamp,
            self.transmit_timestamp,
        ]
        .iter()
        .enumerate()
        {
            let base = 16 + i * 8;
            buf[base..base + 4].copy_from_slice(&ts.seconds.to_be_bytes());
            buf[base + 4..base + 8].copy_from_slice(&ts.fraction.to_be_bytes());
        }
        buf
    }

    /// Whether the packet is the all-zero packet produced by decoding a short
    /// buffer.
    ///
    /// Version and mode are nonzero in any real exchange, so this cannot be
    /// confused with a legitimate server response.
    pub fn is_empty(&self) -> bool {
        self.version == 0 && self.mode == 0
    }
}

// Size implementations.

impl ConstPackedSizeBytes for ShortFormat {
    const PACKED_SIZE_BYTES: usize = 4;
}

impl ConstPackedSizeBytes for TimestampFormat {
    const PACKED_SIZE_BYTES: usize = 8;
}

impl ConstPackedSizeBytes for RawPacket {
    const PACKED_SIZE_BYTES: usize = 1
        + 1
        + 2
        + ShortFormat::PACKED_SIZE_BYTES * 2
        + 4
        + TimestampFormat::PACKED_SIZE_BYTES * 4;
}
