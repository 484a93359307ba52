// Big integers travel over the wire as base-10 strings.
use rsa::BigUint;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Canonical decimal encoding of a big integer.
pub fn to_decimal(value: &BigUint) -> String {
    value.to_str_radix(10)
}

/// Parse a canonical decimal string: ASCII digits only, no sign, and no leading
/// zeros except for the literal `"0"`.
pub fn parse_decimal(s: &str) -> Result<BigUint, String> {
    if s.is_empty() {
        return Err("empty decimal string".to_owned());
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid decimal string {:?}", s));
    }
    if s.len() > 1 && s.starts_with('0') {
        return Err(format!("decimal string {:?} has leading zeros", s));
    }
    BigUint::parse_bytes(s.as_bytes(), 10).ok_or_else(|| format!("invalid decimal string {:?}", s))
}

// For use in `#[serde(with = "serde_decimal")]`
pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_decimal(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_decimal(&s).map_err(de::Error::custom)
}
