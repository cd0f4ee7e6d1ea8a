//! Serde helpers for SSZ container types, matching the Ethereum
//! `0x`-prefixed hex and quoted-integer conventions.

pub mod hex {
    //! Formatting and parsing of `0x`-prefixed hex strings.

    use serde::de::{self, Visitor};
    use std::fmt;

    /// Encode `data` as a `0x`-prefixed, lower-case hex string.
    pub fn encode<T: AsRef<[u8]>>(data: T) -> String {
        let hex = ::hex::encode(data);
        let mut s = "0x".to_string();
        s.push_str(&hex);
        s
    }

    /// Decode `string` as a `0x`-prefixed hex string.
    pub fn decode(string: &str) -> Result<Vec<u8>, String> {
        if let Some(stripped) = string.strip_prefix("0x") {
            ::hex::decode(stripped).map_err(|e| format!("invalid hex: {:?}", e))
        } else {
            Err("hex must have 0x prefix".to_string())
        }
    }

    pub struct PrefixedHexVisitor;

    impl<'de> Visitor<'de> for PrefixedHexVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a hex string with 0x prefix")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            decode(value).map_err(de::Error::custom)
        }
    }
}

pub mod quoted_u64 {
    //! Serde support for u64 values that may arrive quoted, as in the
    //! Ethereum preset and config YAML/JSON files.

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(QuotedU64Visitor)
    }

    struct QuotedU64Visitor;

    impl<'de> Visitor<'de> for QuotedU64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a quoted or unquoted integer")
        }

        fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
            s.parse::<u64>().map_err(de::Error::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
    }
}

pub mod hex_var_list {
    //! Serialize `VariableList<u8, N>` as a 0x-prefixed hex string.

    use super::hex::{self, PrefixedHexVisitor};
    use crate::VariableList;
    use serde::{Deserializer, Serializer};
    use typenum::Unsigned;

    pub fn serialize<S, N>(bytes: &VariableList<u8, N>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        N: Unsigned,
    {
        serializer.serialize_str(&hex::encode(&**bytes))
    }

    pub fn deserialize<'de, D, N>(deserializer: D) -> Result<VariableList<u8, N>, D::Error>
    where
        D: Deserializer<'de>,
        N: Unsigned,
    {
        let bytes = deserializer.deserialize_str(PrefixedHexVisitor)?;
        VariableList::new(bytes)
            .map_err(|e| serde::de::Error::custom(format!("invalid variable list: {:?}", e)))
    }
}

pub mod hex_fixed_vec {
    //! Serialize `FixedVector<u8, N>` as a 0x-prefixed hex string.

    use super::hex::{self, PrefixedHexVisitor};
    use crate::FixedVector;
    use serde::{Deserializer, Serializer};
    use typenum::Unsigned;

    pub fn serialize<S, N>(bytes: &FixedVector<u8, N>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        N: Unsigned,
    {
        serializer.serialize_str(&hex::encode(&bytes[..]))
    }

    pub fn deserialize<'de, D, N>(deserializer: D) -> Result<FixedVector<u8, N>, D::Error>
    where
        D: Deserializer<'de>,
        N: Unsigned,
    {
        let vec = deserializer.deserialize_str(PrefixedHexVisitor)?;
        FixedVector::new(vec)
            .map_err(|e| serde::de::Error::custom(format!("invalid fixed vector: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(hex::encode(&[0u8, 1, 0xab]), "0x0001ab");
        assert_eq!(hex::decode("0x0001ab"), Ok(vec![0, 1, 0xab]));
        assert!(hex::decode("0001ab").is_err());
    }
}
