use oap_coloring::Error as ColoringError;
use oap_common::Error as CommonError;
use oap_registry::Error as RegistryError;
use serde::{Deserialize, Serialize};

pub const CODE_ADDRESSING: i32 = 1;
pub const CODE_DEFINITION: i32 = 2;
pub const CODE_POINTER: i32 = 3;
pub const CODE_MARKER_FORMAT: i32 = 4;
pub const CODE_DEFINITION_EXISTS: i32 = 5;
pub const CODE_NOT_FOUND: i32 = 6;
pub const CODE_NOT_OPEN_ASSETS_OUTPUT: i32 = 7;
pub const CODE_INVALID_QUANTITY: i32 = 8;
pub const CODE_COLLABORATOR: i32 = 9;
pub const CODE_CONFIG: i32 = 10;
pub const CODE_IO: i32 = 11;
pub const CODE_OTHER: i32 = 99;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    JsonFrom(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Coloring(#[from] ColoringError),

    #[error("invalid log level {0:?}")]
    LogLevel(String),

    #[error("invalid hex {0}")]
    InvalidHex(String),

    #[error("method not found: {0:?}")]
    MethodNotFound(String),
}

/// The serialized form of an [`Error`] returned to api callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JsonError {
    pub code: i32,
    pub error: String,
    pub message: String,
}

impl Error {
    /// Stable numeric code of the error kind.
    pub fn to_code(&self) -> i32 {
        match self {
            Error::Common(e) => common_code(e),
            Error::Registry(e) => match e {
                RegistryError::Definition(_) => CODE_DEFINITION,
                RegistryError::Pointer(_) | RegistryError::Url(_) => CODE_POINTER,
                RegistryError::DefinitionExists(_) => CODE_DEFINITION_EXISTS,
                RegistryError::NotFound(_) => CODE_NOT_FOUND,
                RegistryError::Common(e) => common_code(e),
                RegistryError::SerdeJson(_) => CODE_CONFIG,
                RegistryError::Io(_) | RegistryError::SerdeCbor(_) => CODE_IO,
                RegistryError::Ureq(_) => CODE_COLLABORATOR,
            },
            Error::Coloring(e) => match e {
                ColoringError::NotOpenAssetsOutput(_) => CODE_NOT_OPEN_ASSETS_OUTPUT,
                ColoringError::InvalidQuantity(_) => CODE_INVALID_QUANTITY,
                ColoringError::TransactionNotFound(_)
                | ColoringError::OutputNotFound(_)
                | ColoringError::Collaborator(_) => CODE_COLLABORATOR,
                ColoringError::MaxDepthExceeded(_) => CODE_OTHER,
                ColoringError::Common(e) => common_code(e),
            },
            Error::JsonFrom(_) | Error::LogLevel(_) | Error::InvalidHex(_) => CODE_CONFIG,
            Error::Other(_) | Error::MethodNotFound(_) => CODE_OTHER,
        }
    }

    /// Short identifier of the error kind, paired with [`Error::to_code`].
    pub fn to_error_id(&self) -> &'static str {
        match self.to_code() {
            CODE_ADDRESSING => "id_invalid_address",
            CODE_DEFINITION => "id_invalid_asset_definition",
            CODE_POINTER => "id_invalid_definition_pointer",
            CODE_MARKER_FORMAT => "id_invalid_marker_output",
            CODE_DEFINITION_EXISTS => "id_asset_definition_exists",
            CODE_NOT_FOUND => "id_not_found",
            CODE_NOT_OPEN_ASSETS_OUTPUT => "id_not_an_asset_output",
            CODE_INVALID_QUANTITY => "id_invalid_quantity",
            CODE_COLLABORATOR => "id_backend_error",
            CODE_CONFIG => "id_invalid_params",
            CODE_IO => "id_io_error",
            _ => "id_unknown",
        }
    }
}

fn common_code(e: &CommonError) -> i32 {
    if e.is_format_error() {
        CODE_MARKER_FORMAT
    } else {
        CODE_ADDRESSING
    }
}

impl From<Error> for JsonError {
    fn from(e: Error) -> Self {
        JsonError {
            code: e.to_code(),
            error: e.to_error_id().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Error {
        Error::Other(e)
    }
}
