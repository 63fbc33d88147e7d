// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Error, Result};

/// The maximum length of a cache key, in bytes.
pub const MAX_KEY_LENGTH: usize = 64;

/// Characters that may not appear in cache keys, namespaces or tags.
pub const RESERVED_CHARACTERS: &[char] = &['{', '}', '(', ')', '/', '\\', '@', ':'];

/// Syntax rules for cache keys and tags.
///
/// A key is legal when it is 1 to [`MAX_KEY_LENGTH`] bytes long and contains none of the
/// [`RESERVED_CHARACTERS`]. Tags follow the same character rule without the length cap, and
/// must additionally contain no `,`, no control characters and no surrounding whitespace so
/// they survive the flat-file and INI journal formats unchanged.
///
/// # Examples
///
/// ```
/// use stowage_tier::KeyValidator;
///
/// assert!(KeyValidator::is_key_valid("user.42"));
/// assert!(!KeyValidator::is_key_valid("users/42"));
/// assert!(KeyValidator::validate_keys(["a", "b"]).is_ok());
/// assert!(KeyValidator::validate_keys(["a", ""]).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValidator;

impl KeyValidator {
    /// Returns `true` if `key` is a legal cache key.
    #[must_use]
    pub fn is_key_valid(key: &str) -> bool {
        !key.is_empty() && key.len() <= MAX_KEY_LENGTH && !key.contains(RESERVED_CHARACTERS)
    }

    /// Fails with [`Error::InvalidKey`] unless `key` is a legal cache key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an illegal key.
    pub fn validate_key(key: &str) -> Result<()> {
        if Self::is_key_valid(key) {
            Ok(())
        } else {
            Err(Error::InvalidKey(key.to_string()))
        }
    }

    /// Validates a batch of keys; the whole batch fails on the first illegal key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] naming the first illegal key.
    pub fn validate_keys<I, S>(keys: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter().try_for_each(|key| Self::validate_key(key.as_ref()))
    }

    /// Returns `true` if `tag` is a legal tag.
    #[must_use]
    pub fn is_tag_valid(tag: &str) -> bool {
        !tag.is_empty()
            && tag.trim() == tag
            && !tag.contains(RESERVED_CHARACTERS)
            && !tag.chars().any(|c| c == ',' || c.is_control())
    }

    /// Validates a batch of tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`] naming the first illegal tag.
    pub fn validate_tags<I, S>(tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter().try_for_each(|tag| {
            let tag = tag.as_ref();
            if Self::is_tag_valid(tag) {
                Ok(())
            } else {
                Err(Error::InvalidTag(tag.to_string()))
            }
        })
    }
}
