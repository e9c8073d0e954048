//! Payload codecs for the remote backend.
//!
//! The codec is an injected strategy: the cache never inspects payload bytes
//! beyond two framing rules.
//!
//! - The explicit-empty marker is [`NULL_MARKER`], the empty byte sequence. A
//!   codec that produces an empty encoding for a real value is rejected, so the
//!   marker can never collide with a payload.
//! - Versioned entries are framed as `version (u64, big-endian) ‖ payload`; that
//!   framing lives in the storage crate, not here.

use crate::error::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reserved encoding of "explicitly cached absence".
pub const NULL_MARKER: &[u8] = b"";

/// Serialization strategy for cached values.
pub trait CacheCodec<V>: Send + Sync {
    /// Encode a value
    fn serialize(&self, value: &V) -> CacheResult<Vec<u8>>;

    /// Decode a value stored under `key`
    fn deserialize(&self, key: &str, bytes: &[u8]) -> CacheResult<V>;
}

/// Encode a value-or-empty into store bytes.
pub fn encode_entry<V>(codec: &dyn CacheCodec<V>, value: Option<&V>) -> CacheResult<Vec<u8>> {
    match value {
        None => Ok(NULL_MARKER.to_vec()),
        Some(v) => {
            let bytes = codec.serialize(v)?;
            if bytes.is_empty() {
                return Err(CacheError::Serialization(
                    "codec produced an empty encoding, which is reserved for the empty marker"
                        .to_string(),
                ));
            }
            Ok(bytes)
        }
    }
}

/// Decode store bytes into a value-or-empty.
pub fn decode_entry<V>(
    codec: &dyn CacheCodec<V>,
    key: &str,
    bytes: &[u8],
) -> CacheResult<Option<V>> {
    if bytes == NULL_MARKER {
        return Ok(None);
    }
    codec.deserialize(key, bytes).map(Some)
}

fn decode_error(key: &str, err: impl std::fmt::Display) -> CacheError {
    CacheError::Deserialization {
        key: key.to_string(),
        message: err.to_string(),
    }
}

/// Compact binary codec (bincode).
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<V> CacheCodec<V> for BincodeCodec
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> CacheResult<Vec<u8>> {
        bincode::serialize(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(&self, key: &str, bytes: &[u8]) -> CacheResult<V> {
        bincode::deserialize(bytes).map_err(|e| decode_error(key, e))
    }
}

/// Plain JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<V> CacheCodec<V> for JsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(&self, key: &str, bytes: &[u8]) -> CacheResult<V> {
        serde_json::from_slice(bytes).map_err(|e| decode_error(key, e))
    }
}

/// JSON codec that tags each payload with its Rust type name and refuses to
/// decode a payload written for a different type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedJsonCodec;

#[derive(Serialize)]
struct TypedRef<'a, V> {
    #[serde(rename = "@type")]
    type_name: &'a str,
    value: &'a V,
}

#[derive(Deserialize)]
struct TypedOwned<V> {
    #[serde(rename = "@type")]
    type_name: String,
    value: V,
}

impl<V> CacheCodec<V> for TypedJsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> CacheResult<Vec<u8>> {
        let tagged = TypedRef {
            type_name: std::any::type_name::<V>(),
            value,
        };
        serde_json::to_vec(&tagged).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(&self, key: &str, bytes: &[u8]) -> CacheResult<V> {
        let tagged: TypedOwned<V> =
            serde_json::from_slice(bytes).map_err(|e| decode_error(key, e))?;
        let expected = std::any::type_name::<V>();
        if tagged.type_name != expected {
            return Err(decode_error(
                key,
                format!("type tag {} does not match {}", tagged.type_name, expected),
            ));
        }
        Ok(tagged.value)
    }
}

/// MessagePack codec (rmp-serde), struct fields encoded by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackCodec;

impl<V> CacheCodec<V> for MessagePackCodec
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> CacheResult<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(&self, key: &str, bytes: &[u8]) -> CacheResult<V> {
        rmp_serde::from_slice(bytes).map_err(|e| decode_error(key, e))
    }
}

/// Codec selector used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecKind {
    /// [`BincodeCodec`]
    #[default]
    Bincode,
    /// [`JsonCodec`]
    Json,
    /// [`TypedJsonCodec`]
    TypedJson,
    /// [`MessagePackCodec`]
    Msgpack,
}

impl CodecKind {
    /// Instantiate the selected codec for `V`.
    pub fn build<V>(self) -> Arc<dyn CacheCodec<V>>
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        match self {
            CodecKind::Bincode => Arc::new(BincodeCodec),
            CodecKind::Json => Arc::new(JsonCodec),
            CodecKind::TypedJson => Arc::new(TypedJsonCodec),
            CodecKind::Msgpack => Arc::new(MessagePackCodec),
        }
    }
}
