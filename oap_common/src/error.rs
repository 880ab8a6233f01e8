use bitcoin::hex::DisplayHex;

/// Errors raised while encoding or decoding the protocol's binary and textual forms.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed or invalid address, asset id or asset address.
    #[error("addressing error: {0}")]
    Addressing(String),

    /// The payload of a marker output does not follow the Open Assets layout.
    #[error("invalid marker output ({reason}) at offset {offset}: {bytes}")]
    MarkerFormat {
        reason: &'static str,
        offset: usize,
        bytes: String,
    },

    /// A LEB128 value is not terminated before the end of its buffer.
    #[error("truncated or malformed LEB128 value at offset {offset}: {bytes}")]
    VarInt {
        offset: usize,
        bytes: String,
    },

    /// Writing past the end of a destination buffer.
    #[error("buffer of {len} bytes too small, needed {needed}")]
    Bounds {
        len: usize,
        needed: usize,
    },
}

impl Error {
    pub(crate) fn marker(reason: &'static str, offset: usize, bytes: &[u8]) -> Self {
        Error::MarkerFormat {
            reason,
            offset,
            bytes: bytes.to_lower_hex_string(),
        }
    }

    pub(crate) fn varint(offset: usize, bytes: &[u8]) -> Self {
        Error::VarInt {
            offset,
            bytes: bytes.to_lower_hex_string(),
        }
    }

    /// Whether the error comes from the marker output codec, LEB128 included.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::MarkerFormat { .. } | Error::VarInt { .. } | Error::Bounds { .. })
    }
}

pub fn err<R>(str: &str) -> Result<R, Error> {
    Err(Error::Addressing(str.into()))
}

impl From<bitcoin::base58::Error> for Error {
    fn from(err: bitcoin::base58::Error) -> Self {
        Error::Addressing(err.to_string())
    }
}
