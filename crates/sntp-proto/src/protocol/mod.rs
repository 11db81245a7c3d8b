//! Types and constants that precisely match the wire specification.
//!
//! Provides `ReadBytes` and `WriteBytes` implementations which extend the
//! byteorder crate `WriteBytesExt` and `ReadBytesExt` traits with the ability
//! to read and write the SNTP header types, plus `FromBytes`/`ToBytes`
//! slice-level equivalents used by the infallible packet codec.
//!
//! Documentation is largely derived from IETF RFC 5905 and RFC 4330.

/// NTP port number.
pub const PORT: u16 = 123;

/// The NTP version this implementation speaks (RFC 5905).
pub const VERSION: u8 = 4;

/// Minimum poll exponent (16 s).
pub const MINPOLL: u8 = 4;

/// Maximum poll exponent (36 h).
pub const MAXPOLL: u8 = 17;

/// Maximum stratum number.
pub const MAXSTRAT: u8 = 16;

/// Convert a four-character ASCII code to its big-endian u32 representation.
pub(crate) const fn four_char_code(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

mod bytes;
mod io;
mod traits;
mod types;

pub use self::traits::*;
pub use self::types::*;
