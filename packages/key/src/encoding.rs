//! Compact binary encoding shared by key structures and keyset documents

use crate::{KeysetError, Result};
use serde::{Serialize, de::DeserializeOwned};

/// Encode a value with the standard bincode configuration
///
/// # Errors
///
/// Returns `Serialization` if the value cannot be encoded.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(KeysetError::serialization)
}

/// Decode a value, rejecting trailing bytes
///
/// # Errors
///
/// Returns `Serialization` if the bytes are malformed or not fully consumed.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(KeysetError::serialization)?;
    if read != bytes.len() {
        return Err(KeysetError::serialization(format!(
            "{} trailing bytes after encoded value",
            bytes.len() - read
        )));
    }
    Ok(value)
}
