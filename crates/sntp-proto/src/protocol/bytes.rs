use crate::error::ParseError;

use super::{ConstPackedSizeBytes, FromBytes, RawPacket, ShortFormat, TimestampFormat, ToBytes};

impl FromBytes for ShortFormat {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        if buf.len() < Self::PACKED_SIZE_BYTES {
            return Err(ParseError::BufferTooShort {
                needed: Self::PACKED_SIZE_BYTES,
                available: buf.len(),
            });
        }
        let seconds = u16::from_be_bytes([buf[0], buf[1]]);
        let fraction = u16::from_be_bytes([buf[2], buf[3]]);
        Ok((ShortFormat { seconds, fraction }, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for TimestampFormat {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        if buf.len() < Self::PACKED_SIZE_BYTES {
            return Err(ParseError::BufferTooShort {
                needed: Self::PACKED_SIZE_BYTES,
                available: buf.len(),
            });
        }
        let seconds = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let fraction = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        Ok((
            TimestampFormat { seconds, fraction },
            Self::PACKED_SIZE_BYTES,
        ))
    }
}

impl FromBytes for RawPacket {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        if buf.len() < Self::PACKED_SIZE_BYTES {
            return Err(ParseError::BufferTooShort {
                needed: Self::PACKED_SIZE_BYTES,
                available: buf.len(),
            });
        }
        let li_vn_mode = buf[0];
        let (root_delay, _) = ShortFormat::from_bytes(&buf[4..])?;
        let (root_dispersion, _) = ShortFormat::from_bytes(&buf[8..])?;
        let (reference_timestamp, _) = TimestampFormat::from_bytes(&buf[16..])?;
        let (originate_timestamp, _) = TimestampFormat::from_bytes(&buf[24..])?;
        let (receive_timestamp, _) = TimestampFormat::from_bytes(&buf[32..])?;
        let (transmit_timestamp, _) = TimestampFormat::from_bytes(&buf[40..])?;
        Ok((
            RawPacket {
                leap_indicator: li_vn_mode >> 6,
                version: (li_vn_mode >> 3) & 0b111,
                mode: li_vn_mode & 0b111,
                stratum: buf[1],
                poll: buf[2],
                precision: buf[3] as i8,
                root_delay,
                root_dispersion,
                reference_id: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
                reference_timestamp,
                originate_timestamp,
                receive_timestamp,
                transmit_timestamp,
            },
            Self::PACKED_SIZE_BYTES,
        ))
    }
}

impl ToBytes for ShortFormat {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        if buf.len() < Self::PACKED_SIZE_BYTES {
            return Err(ParseError::BufferTooShort {
                needed: Self::PACKED_SIZE_BYTES,
                available: buf.len(),
            });
        }
        buf[0..2].copy_from_slice(&self.seconds.to_be_bytes());
        buf[2..4].copy_from_slice(&self.fraction.to_be_bytes());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for TimestampFormat {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        if buf.len() < Self::PACKED_SIZE_BYTES {
            return Err(ParseError::BufferTooShort {
                needed: Self::PACKED_SIZE_BYTES,
                available: buf.len(),
            });
        }
        buf[0..4].copy_from_slice(&self.seconds.to_be_bytes());
        buf[4..8].copy_from_slice(&self.fraction.to_be_bytes());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for RawPacket {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        if buf.len() < Self::PACKED_SIZE_BYTES {
            return Err(ParseError::BufferTooShort {
                needed: Self::PACKED_SIZE_BYTES,
                available: buf.len(),
            });
        }
        buf[..Self::PACKED_SIZE_BYTES].copy_from_slice(&self.encode());
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_too_short() {
        for len in 0..RawPacket::PACKED_SIZE_BYTES {
            let buf = vec![0xFFu8; len];
            assert!(matches!(
                RawPacket::from_bytes(&buf),
                Err(ParseError::BufferTooShort { .. })
            ));
        }
    }

    #[test]
    fn to_bytes_matches_encode() {
        let pkt = RawPacket {
            version: 4,
            mode: 4,
            stratum: 2,
            reference_id: 0x0A00_0001,
            ..RawPacket::default()
        };
        let mut buf = [0u8; RawPacket::PACKED_SIZE_BYTES];
        let written = pkt.to_bytes(&mut buf[..]).unwrap();
        assert_eq!(written, RawPacket::PACKED_SIZE_BYTES);
        assert_eq!(buf, pkt.encode());
    }

    #[test]
    fn from_bytes_consumes_48() {
        let buf = [0u8; 64];
        let (_, consumed) = RawPacket::from_bytes(&buf).unwrap();
        assert_eq!(consumed, 48);
    }
}
