use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Row id of a piece of content; never leaves the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId(pub u32);

/// Id handed to clients: a keyed permutation of a [`ContentId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalContentId(pub u32);

impl ExternalContentId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ExternalContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExternalContentId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ExternalContentId)
    }
}

/// Converts between internal and external content ids
pub trait ContentIdObfuscator: Send + Sync {
    fn obfuscate(&self, id: ContentId) -> ExternalContentId;
    fn reveal(&self, id: ExternalContentId) -> ContentId;
}

/// Keyed 32-bit permutation (Skip32) over content ids
#[derive(Clone)]
pub struct Skip32Obfuscator {
    key: [u8; 10],
}

impl Skip32Obfuscator {
    pub const fn new(key: [u8; 10]) -> Self {
        Self { key }
    }

    /// Key given as 20 hex digits
    pub fn from_hex(key: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 10];
        hex::decode_to_slice(key.trim(), &mut bytes)?;
        Ok(Self::new(bytes))
    }
}

impl fmt::Debug for Skip32Obfuscator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skip32Obfuscator").finish_non_exhaustive()
    }
}

impl ContentIdObfuscator for Skip32Obfuscator {
    fn obfuscate(&self, id: ContentId) -> ExternalContentId {
        ExternalContentId(skip32::encode(&self.key, id.0))
    }

    fn reveal(&self, id: ExternalContentId) -> ContentId {
        ContentId(skip32::decode(&self.key, id.0))
    }
}
