use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Identifier parse failure. Both trace and span ids reject non-hex input
/// and out-of-range lengths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidId {
    #[error("id '{0}' is not a hex string")]
    NotHex(String),
    #[error("id length must be within 1..={max}, got {got}")]
    Length { got: usize, max: usize },
}

/// 128-bit trace identifier, stored as a (high, low) pair of 64-bit words.
///
/// The canonical text form is 16 lowercase hex characters when `high` is
/// zero and 32 otherwise; parsing accepts 1..=32 characters with leading
/// zeros omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId {
    pub high: u64,
    pub low: u64,
}

impl TraceId {
    pub fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    pub fn is_zero(&self) -> bool {
        self.high == 0 && self.low == 0
    }

    /// Big-endian 16-byte representation used on the gRPC wire.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.high.to_be_bytes());
        out[8..].copy_from_slice(&self.low.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidId> {
        if bytes.len() != 16 {
            return Err(InvalidId::Length {
                got: bytes.len(),
                max: 16,
            });
        }
        let mut high = [0u8; 8];
        let mut low = [0u8; 8];
        high.copy_from_slice(&bytes[..8]);
        low.copy_from_slice(&bytes[8..]);
        Ok(Self {
            high: u64::from_be_bytes(high),
            low: u64::from_be_bytes(low),
        })
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.high == 0 {
            write!(f, "{:016x}", self.low)
        } else {
            write!(f, "{:016x}{:016x}", self.high, self.low)
        }
    }
}

impl FromStr for TraceId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 32 {
            return Err(InvalidId::Length {
                got: s.len(),
                max: 32,
            });
        }
        if s.len() <= 16 {
            Ok(Self {
                high: 0,
                low: parse_hex_u64(s)?,
            })
        } else {
            let split = s.len() - 16;
            Ok(Self {
                high: parse_hex_u64(&s[..split])?,
                low: parse_hex_u64(&s[split..])?,
            })
        }
    }
}

impl Serialize for TraceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TraceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 64-bit span identifier with the same hex text form as [`TraceId`],
/// capped at 16 characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(pub u64);

impl SpanId {
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidId> {
        if bytes.len() != 8 {
            return Err(InvalidId::Length {
                got: bytes.len(),
                max: 8,
            });
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(Self(u64::from_be_bytes(buf)))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SpanId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 16 {
            return Err(InvalidId::Length {
                got: s.len(),
                max: 16,
            });
        }
        parse_hex_u64(s).map(Self)
    }
}

impl Serialize for SpanId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpanId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_hex_u64(s: &str) -> Result<u64, InvalidId> {
    u64::from_str_radix(s, 16).map_err(|_| InvalidId::NotHex(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn trace_id_round_trips_through_text() {
        let cases = [
            TraceId::new(0, 1),
            TraceId::new(0, u64::MAX),
            TraceId::new(1, 0),
            TraceId::new(u64::MAX, u64::MAX),
            TraceId::new(0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210),
        ];
        for id in cases {
            let text = id.to_string();
            assert!(text.len() == 16 || text.len() == 32);
            assert_eq!(text.parse::<TraceId>().unwrap(), id);
        }
    }

    #[test]
    fn short_input_parses_into_low_word() {
        let id: TraceId = "beef".parse().unwrap();
        assert_eq!(id, TraceId::new(0, 0xbeef));
        let id: TraceId = "0000000000000001".parse().unwrap();
        assert_eq!(id, TraceId::new(0, 1));
    }

    #[test]
    fn long_input_splits_into_high_and_low() {
        let id: TraceId = "10000000000000002".parse().unwrap();
        assert_eq!(id, TraceId::new(1, 2));
        let id: TraceId = "ffffffffffffffffffffffffffffffff".parse().unwrap();
        assert_eq!(id, TraceId::new(u64::MAX, u64::MAX));
    }

    #[test]
    fn rejects_non_hex_and_bad_lengths() {
        assert_eq!(
            "xyz".parse::<TraceId>(),
            Err(InvalidId::NotHex("xyz".to_string()))
        );
        assert_eq!(
            "".parse::<TraceId>(),
            Err(InvalidId::Length { got: 0, max: 32 })
        );
        assert!("0".repeat(33).parse::<TraceId>().is_err());
        assert!("0".repeat(17).parse::<SpanId>().is_err());
    }

    #[test]
    fn byte_round_trip() {
        let id = TraceId::new(0x0102030405060708, 0x090a0b0c0d0e0f10);
        assert_eq!(TraceId::from_bytes(&id.to_bytes()).unwrap(), id);
        let sid = SpanId(0x1122334455667788);
        assert_eq!(SpanId::from_bytes(&sid.to_bytes()).unwrap(), sid);
    }
}
