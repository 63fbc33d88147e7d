// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Converts cached values to and from the bytes handed to storage backends.
///
/// # Examples
///
/// ```
/// use stowage_tier::Codec;
///
/// let bytes = Codec::Json.encode(&vec![1, 2, 3])?;
/// assert_eq!(bytes, b"[1,2,3]");
///
/// let back: Vec<i32> = Codec::Json.decode(&bytes)?;
/// assert_eq!(back, [1, 2, 3]);
/// # Ok::<(), stowage_tier::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Codec {
    /// Human-readable JSON via `serde_json`.
    #[default]
    Json,
    /// Compact binary encoding via `bincode`.
    Bincode,
}

impl Codec {
    /// Encodes `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the value cannot be serialized.
    pub fn encode<V>(self, value: &V) -> Result<Vec<u8>>
    where
        V: Serialize + ?Sized,
    {
        match self {
            Self::Json => serde_json::to_vec(value).map_err(Error::codec),
            Self::Bincode => bincode::serialize(value).map_err(Error::codec),
        }
    }

    /// Decodes a value previously produced by [`Codec::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if `bytes` are not a valid encoding of `V`.
    pub fn decode<V>(self, bytes: &[u8]) -> Result<V>
    where
        V: DeserializeOwned,
    {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(Error::codec),
            Self::Bincode => bincode::deserialize(bytes).map_err(Error::codec),
        }
    }
}
