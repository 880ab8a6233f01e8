use std::fmt;
use std::str::FromStr;

use oap_common::bitcoin::hex::{DisplayHex, FromHex};
use url::Url;

use crate::{Error, Result};

/// Length of a [`PointerKind::Hash`] value.
pub const HASH_LEN: usize = 20;

/// Prefix of marker metadata referencing a definition by url.
const URL_METADATA_PREFIX: &[u8] = b"u=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// The content hash of the definition.
    Hash,

    /// A url the definition can be retrieved from.
    Url,
}

impl PointerKind {
    fn tag(self) -> u8 {
        match self {
            PointerKind::Hash => 0x00,
            PointerKind::Url => 0x01,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0x00 => Ok(PointerKind::Hash),
            0x01 => Ok(PointerKind::Url),
            other => Err(Error::Pointer(format!("unknown pointer kind {:#04x}", other))),
        }
    }
}

/// Reference to an asset definition, either by content hash or by url.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetDefinitionPointer {
    kind: PointerKind,
    value: Vec<u8>,
}

impl AssetDefinitionPointer {
    pub fn create(kind: PointerKind, value: Vec<u8>) -> Result<Self> {
        match kind {
            PointerKind::Hash if value.len() != HASH_LEN => {
                return Err(Error::Pointer(format!(
                    "hash pointer must be {} bytes, got {}",
                    HASH_LEN,
                    value.len()
                )))
            }
            PointerKind::Hash => (),
            PointerKind::Url => {
                let text = std::str::from_utf8(&value)
                    .map_err(|_| Error::Pointer("url pointer is not utf-8".into()))?;
                Url::parse(text).map_err(|e| Error::Pointer(format!("{}: {}", text, e)))?;
            }
        }
        Ok(AssetDefinitionPointer {
            kind,
            value,
        })
    }

    pub fn from_hash(hash: [u8; HASH_LEN]) -> Self {
        AssetDefinitionPointer {
            kind: PointerKind::Hash,
            value: hash.to_vec(),
        }
    }

    pub fn from_url(url: &Url) -> Self {
        AssetDefinitionPointer {
            kind: PointerKind::Url,
            value: url.as_str().as_bytes().to_vec(),
        }
    }

    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn url(&self) -> Option<Url> {
        match self.kind {
            PointerKind::Url => std::str::from_utf8(&self.value).ok().and_then(|s| Url::parse(s).ok()),
            PointerKind::Hash => None,
        }
    }

    /// One kind byte followed by the raw value.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.value.len());
        bytes.push(self.kind.tag());
        bytes.extend_from_slice(&self.value);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (tag, value) =
            bytes.split_first().ok_or_else(|| Error::Pointer("empty pointer".into()))?;
        Self::create(PointerKind::from_tag(*tag)?, value.to_vec())
    }

    /// Recognizes the `u=<url>` marker metadata convention.
    pub fn from_metadata(metadata: &[u8]) -> Option<Self> {
        let url = metadata.strip_prefix(URL_METADATA_PREFIX)?;
        Self::create(PointerKind::Url, url.to_vec()).ok()
    }

    /// Marker metadata referencing this pointer, only url pointers have one.
    pub fn to_metadata(&self) -> Option<Vec<u8>> {
        match self.kind {
            PointerKind::Url => Some([URL_METADATA_PREFIX, &self.value].concat()),
            PointerKind::Hash => None,
        }
    }
}

impl fmt::Display for AssetDefinitionPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bytes().to_lower_hex_string())
    }
}

/// Parses the hex of [`AssetDefinitionPointer::to_bytes`]. A bare 20-byte hex hash that is
/// not a valid tagged pointer is read as a hash pointer.
impl FromStr for AssetDefinitionPointer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = Vec::<u8>::from_hex(s).map_err(|e| Error::Pointer(format!("{}: {}", s, e)))?;
        match Self::from_bytes(&bytes) {
            Err(_) if bytes.len() == HASH_LEN => Self::create(PointerKind::Hash, bytes),
            res => res,
        }
    }
}
