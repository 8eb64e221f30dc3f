//! Decode-side conversions between wire types and target types, as the other
//! bindings of the format expect them to behave.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use keypack::{pack, unpack, Bytes, PackError};

#[test]
fn integer_widening() {
    let encoded = pack(&42u8).unwrap();
    assert_eq!(unpack::<i64>(&encoded).unwrap(), 42);
    assert_eq!(unpack::<u16>(&encoded).unwrap(), 42);
    assert_eq!(unpack::<i128>(&encoded).unwrap(), 42);
    assert_eq!(unpack::<usize>(&encoded).unwrap(), 42);
}

#[test]
fn integer_overflow_checked() {
    let encoded = pack(&300i64).unwrap();
    assert_eq!(
        unpack::<u8>(&encoded).unwrap_err(),
        PackError::NumericOverflow { offset: 0 }
    );
    assert_eq!(
        unpack::<i8>(&encoded).unwrap_err(),
        PackError::NumericOverflow { offset: 0 }
    );
    let negative = pack(&-1i64).unwrap();
    assert_eq!(
        unpack::<u64>(&negative).unwrap_err(),
        PackError::NumericOverflow { offset: 0 }
    );
}

#[test]
fn integer_to_float() {
    let encoded = pack(&42i64).unwrap();
    assert_eq!(unpack::<f64>(&encoded).unwrap(), 42.0);
    assert_eq!(unpack::<f32>(&encoded).unwrap(), 42.0);
}

#[test]
fn float_to_integer_narrows() {
    assert_eq!(unpack::<i64>(&pack(&3.7f64).unwrap()).unwrap(), 3);
    assert_eq!(unpack::<i64>(&pack(&-3.7f64).unwrap()).unwrap(), -3);
    assert_eq!(unpack::<i32>(&pack(&2.0f32).unwrap()).unwrap(), 2);
}

#[test]
fn string_to_number_parses() {
    assert_eq!(unpack::<i64>(&pack(&"1234").unwrap()).unwrap(), 1234);
    assert_eq!(unpack::<i64>(&pack(&"-77").unwrap()).unwrap(), -77);
    assert_eq!(unpack::<f64>(&pack(&"12.5").unwrap()).unwrap(), 12.5);
    assert_eq!(
        unpack::<i64>(&pack(&"twelve").unwrap()).unwrap_err(),
        PackError::MalformedInput { offset: 0 }
    );
}

#[test]
fn nil_decodes_to_defaults() {
    let nil = pack(&None::<i64>).unwrap();
    assert_eq!(unpack::<i64>(&nil).unwrap(), 0);
    assert_eq!(unpack::<f64>(&nil).unwrap(), 0.0);
    assert_eq!(unpack::<bool>(&nil).unwrap(), false);
    assert_eq!(unpack::<String>(&nil).unwrap(), "");
    assert_eq!(unpack::<Vec<u8>>(&nil).unwrap(), Vec::<u8>::new());
    assert_eq!(unpack::<char>(&nil).unwrap(), '\0');
    assert_eq!(
        unpack::<keypack::Uuid64>(&nil).unwrap(),
        keypack::Uuid64::default()
    );
    assert_eq!(
        unpack::<keypack::Versionstamp>(&nil).unwrap(),
        keypack::Versionstamp::complete([0; 10])
    );
}

#[test]
fn bytes_to_string() {
    let encoded = pack(&Bytes::from(&b"hi"[..])).unwrap();
    assert_eq!(unpack::<String>(&encoded).unwrap(), "hi");

    let invalid = pack(&Bytes::from(&b"\xfe\xfe"[..])).unwrap();
    assert_eq!(
        unpack::<String>(&invalid).unwrap_err(),
        PackError::MalformedInput { offset: 1 }
    );
}

#[test]
fn truthiness() {
    assert_eq!(unpack::<bool>(&pack(&7i64).unwrap()).unwrap(), true);
    assert_eq!(unpack::<bool>(&pack(&0i64).unwrap()).unwrap(), false);
    assert_eq!(unpack::<bool>(&pack(&0.5f64).unwrap()).unwrap(), true);
    assert_eq!(unpack::<bool>(&pack(&0.0f32).unwrap()).unwrap(), false);
    assert_eq!(unpack::<bool>(&pack(&"x").unwrap()).unwrap(), true);
    assert_eq!(unpack::<bool>(&pack(&"").unwrap()).unwrap(), false);
    assert_eq!(
        unpack::<bool>(&pack(&Bytes::default()).unwrap()).unwrap(),
        false
    );
    // a payload holding just an escaped NUL is non-empty
    assert_eq!(
        unpack::<bool>(&pack(&Bytes::from(&b"\x00"[..])).unwrap()).unwrap(),
        true
    );
}

#[test]
fn bytes_to_char() {
    assert_eq!(unpack::<char>(&pack(&Bytes::default()).unwrap()).unwrap(), '\0');
    assert_eq!(
        unpack::<char>(&pack(&Bytes::from(&b"A"[..])).unwrap()).unwrap(),
        'A'
    );
    assert!(unpack::<char>(&pack(&Bytes::from(&b"ab"[..])).unwrap()).is_err());
    assert_eq!(unpack::<char>(&pack(&"é").unwrap()).unwrap(), 'é');
    assert!(unpack::<char>(&pack(&"ab").unwrap()).is_err());
}

#[test]
fn small_integer_to_ipv4() {
    let encoded = pack(&0x7f00_0001i64).unwrap();
    assert_eq!(
        unpack::<Ipv4Addr>(&encoded).unwrap(),
        Ipv4Addr::new(127, 0, 0, 1)
    );
    assert_eq!(
        unpack::<IpAddr>(&encoded).unwrap(),
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    );
    assert_eq!(
        unpack::<Ipv4Addr>(&pack(&0x1_0000_0000u64).unwrap()).unwrap_err(),
        PackError::NumericOverflow { offset: 0 }
    );
}

#[test]
fn uuid_sized_payload_to_ipv6() {
    // a 128-bit UUID element is sixteen address octets
    let mut encoded = vec![0x30];
    encoded.extend_from_slice(&[
        0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x42,
    ]);
    let expected = Ipv6Addr::new(0x2001, 0x0db8, 0, 0, 0, 0, 0, 0x42);
    assert_eq!(unpack::<Ipv6Addr>(&encoded).unwrap(), expected);
    assert_eq!(unpack::<IpAddr>(&encoded).unwrap(), IpAddr::V6(expected));
}

#[test]
fn decimal_is_unimplemented_for_every_target() {
    let mut encoded = vec![0x23];
    encoded.extend_from_slice(&[0; 16]);
    assert_eq!(
        unpack::<i64>(&encoded).unwrap_err(),
        PackError::Unimplemented { offset: 0 }
    );
    assert_eq!(
        unpack::<bool>(&encoded).unwrap_err(),
        PackError::Unimplemented { offset: 0 }
    );
}

#[test]
fn unsupported_coercions_are_rejected() {
    assert_eq!(
        unpack::<String>(&pack(&true).unwrap()).unwrap_err(),
        PackError::UnsupportedCoercion {
            code: 0x27,
            offset: 0
        }
    );
    assert_eq!(
        unpack::<i64>(&pack(&Bytes::from(&b"99"[..])).unwrap()).unwrap_err(),
        PackError::UnsupportedCoercion {
            code: 0x01,
            offset: 0
        }
    );
    assert_eq!(
        unpack::<Ipv6Addr>(&pack(&1i64).unwrap()).unwrap_err(),
        PackError::UnsupportedCoercion {
            code: 0x15,
            offset: 0
        }
    );
}

#[cfg(feature = "uuid")]
mod uuid_coercions {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn string_to_uuid() {
        let id = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        let encoded = pack(&id.to_string()).unwrap();
        assert_eq!(unpack::<Uuid>(&encoded).unwrap(), id);

        let garbage = pack(&"not-a-uuid").unwrap();
        assert_eq!(
            unpack::<Uuid>(&garbage).unwrap_err(),
            PackError::MalformedInput { offset: 0 }
        );
    }

    #[test]
    fn nil_to_uuid() {
        assert_eq!(
            unpack::<Uuid>(&pack(&None::<i64>).unwrap()).unwrap(),
            Uuid::nil()
        );
    }
}

#[cfg(feature = "chrono")]
mod chrono_coercions {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    #[test]
    fn ticks_to_datetime() {
        // 2020-01-01T00:00:00Z in 100ns ticks since 0001-01-01
        let ticks = 637_134_336_000_000_000i64;
        let expected = DateTime::<Utc>::from_timestamp(1_577_836_800, 0).unwrap();
        assert_eq!(
            unpack::<DateTime<Utc>>(&pack(&ticks).unwrap()).unwrap(),
            expected
        );
    }

    #[test]
    fn fractional_days_to_datetime() {
        let expected = DateTime::<Utc>::from_timestamp(43_200, 0).unwrap();
        assert_eq!(
            unpack::<DateTime<Utc>>(&pack(&0.5f64).unwrap()).unwrap(),
            expected
        );
    }

    #[test]
    fn seconds_to_duration() {
        assert_eq!(
            unpack::<Duration>(&pack(&1.5f64).unwrap()).unwrap(),
            Duration::nanoseconds(1_500_000_000)
        );
        assert_eq!(
            unpack::<Duration>(&pack(&-2.0f32).unwrap()).unwrap(),
            Duration::seconds(-2)
        );
    }
}
