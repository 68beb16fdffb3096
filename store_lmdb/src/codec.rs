//! Value encoding and table helpers shared by all tables.

use heed::types::Bytes;
use heed::{Database, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::LmdbError;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Read and decode a single value.
pub(crate) fn get_value<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    rtxn: &RoTxn<'_>,
    key: &[u8],
) -> Result<Option<T>, LmdbError> {
    match db.get(rtxn, key)? {
        Some(bytes) => Ok(Some(decode(bytes)?)),
        None => Ok(None),
    }
}

/// Decode every value in a table, in key order.
pub(crate) fn all_values<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    rtxn: &RoTxn<'_>,
) -> Result<Vec<T>, LmdbError> {
    let mut out = Vec::new();
    for entry in db.iter(rtxn)? {
        let (_, bytes) = entry?;
        out.push(decode(bytes)?);
    }
    Ok(out)
}
