use proptest::prelude::*;
use sntp_proto::protocol::{
    ConstPackedSizeBytes, FromBytes, RawPacket, ShortFormat, TimestampFormat, ToBytes,
};

/// Strategy that generates exactly 48 random bytes.
fn arb_48_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 48)
}

proptest! {
    #[test]
    fn short_format_roundtrip(seconds in any::<u16>(), fraction in any::<u16>()) {
        let sf = ShortFormat { seconds, fraction };
        let mut buf = [0u8; 4];
        let written = sf.to_bytes(&mut buf).unwrap();
        prop_assert_eq!(written, 4);
        let (parsed, consumed) = ShortFormat::from_bytes(&buf).unwrap();
        prop_assert_eq!(consumed, 4);
        prop_assert_eq!(sf, parsed);
    }

    #[test]
    fn timestamp_format_roundtrip(seconds in any::<u32>(), fraction in any::<u32>()) {
        let ts = TimestampFormat { seconds, fraction };
        let mut buf = [0u8; 8];
        let written = ts.to_bytes(&mut buf).unwrap();
        prop_assert_eq!(written, 8);
        let (parsed, consumed) = TimestampFormat::from_bytes(&buf).unwrap();
        prop_assert_eq!(consumed, 8);
        prop_assert_eq!(ts, parsed);
    }

    /// Decoding then re-encoding any 48-byte buffer is byte-identical: the
    /// packed LI/VN/Mode byte and every raw field survive the roundtrip.
    #[test]
    fn packet_roundtrip_is_byte_identical(bytes in arb_48_bytes()) {
        let packet = RawPacket::decode(&bytes);
        prop_assert_eq!(&packet.encode()[..], &bytes[..]);
    }

    /// Buffers shorter than 48 bytes always decode to the all-zero packet.
    #[test]
    fn short_buffers_decode_all_zero(len in 0usize..48, fill in any::<u8>()) {
        let buf = vec![fill; len];
        let packet = RawPacket::decode(&buf);
        prop_assert_eq!(packet, RawPacket::default());
        prop_assert!(packet.is_empty());
        prop_assert!(matches!(RawPacket::from_bytes(&buf), Err(_)));
    }

    /// Short-format interval conversions reproduce the value within the
    /// 2^-16 s resolution, and never panic.
    #[test]
    fn short_format_interval_roundtrip(interval in 0.0f64..65_536.0) {
        let back = ShortFormat::from_interval(interval).to_interval();
        prop_assert!((back - interval).abs() <= 1.0 / 65_536.0);
    }

    /// Timestamp interval conversions reproduce the value within the format
    /// resolution (bounded by f64 precision at large magnitudes).
    #[test]
    fn timestamp_interval_roundtrip(interval in 0.0f64..4_294_967_296.0) {
        let back = TimestampFormat::from_interval(interval).to_interval();
        // At ~2^32 seconds an f64 resolves ~2^-20 s; allow that bound.
        prop_assert!((back - interval).abs() <= 1e-6, "{} -> {}", interval, back);
    }

    /// Negative intervals always saturate to the maximum encoded value.
    #[test]
    fn negative_intervals_saturate(interval in f64::MIN..0.0) {
        prop_assume!(interval < 0.0);
        let sf = ShortFormat::from_interval(interval);
        prop_assert_eq!(sf, ShortFormat { seconds: u16::MAX, fraction: u16::MAX });
        let ts = TimestampFormat::from_interval(interval);
        prop_assert_eq!(ts, TimestampFormat { seconds: u32::MAX, fraction: u32::MAX });
    }

    /// Conversions never panic for any input, including extreme magnitudes.
    #[test]
    fn interval_conversions_never_panic(interval in any::<f64>()) {
        let _ = ShortFormat::from_interval(interval);
        let _ = TimestampFormat::from_interval(interval);
    }
}

const _: () = assert!(RawPacket::PACKED_SIZE_BYTES == 48);
