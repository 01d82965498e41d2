//! Serde adapters for binary fields carried as standard base64 in JSON.
//!
//! Logs written in Go emit `null` for a nil byte slice and `""` for an empty
//! one. Fields that may be nil use the `Option` adapters so a decoded value
//! re-serializes to the same JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

fn decode<E: serde::de::Error>(text: &str) -> Result<Vec<u8>, E> {
    STANDARD.decode(text).map_err(E::custom)
}

/// `Vec<u8>` as one base64 string. `null` is rejected.
pub mod base64_bytes {
    use super::*;

    /// Serialize bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize a base64 string into bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        decode(&String::deserialize(deserializer)?)
    }
}

/// `Option<Vec<u8>>` as a base64 string, with `None` as `null`.
pub mod base64_option {
    use super::*;

    /// Serialize `Some` as a base64 string and `None` as `null`.
    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize a base64 string or `null`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| decode::<D::Error>(&text))
            .transpose()
    }
}

/// `Option<Vec<Vec<u8>>>` as an array of base64 strings, with `None` as `null`.
pub mod base64_list {
    use super::*;
    use serde::ser::SerializeSeq;

    /// Serialize each element as a base64 string, or `null` for `None`.
    pub fn serialize<S: Serializer>(
        items: &Option<Vec<Vec<u8>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let Some(items) = items else {
            return serializer.serialize_none();
        };
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }

    /// Deserialize an array of base64 strings or `null`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<Vec<u8>>>, D::Error> {
        Option::<Vec<String>>::deserialize(deserializer)?
            .map(|items| {
                items
                    .iter()
                    .map(|text| decode::<D::Error>(text))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
    }
}
