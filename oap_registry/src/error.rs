use std::io;

/// Contains all the error variants possibly happening in this library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The asset definition document is missing a field or has an invalid one
    #[error("invalid asset definition: {0}")]
    Definition(String),

    /// Thrown when a pointer is built from an invalid kind and value combination
    #[error("invalid asset definition pointer: {0}")]
    Pointer(String),

    /// An asset definition with the same content hash is already stored
    #[error("asset definition {0} already exists")]
    DefinitionExists(String),

    /// Thrown when an asset id or a pointer doesn't resolve to a stored definition
    #[error("asset definition not found: {0}")]
    NotFound(String),

    /// Wraps errors from the protocol codecs, mostly invalid asset ids
    #[error(transparent)]
    Common(#[from] oap_common::Error),

    /// Wraps json errors
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// Wraps IO errors
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Wraps errors happened when serializing or deserializing the persisted store
    #[error(transparent)]
    SerdeCbor(#[from] serde_cbor::Error),

    /// Wraps http errors
    #[error(transparent)]
    Ureq(#[from] ureq::Error),

    /// Wraps url parsing errors
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
