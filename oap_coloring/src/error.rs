use oap_common::bitcoin::{OutPoint, Txid};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A colored output was required but the output carries no asset
    #[error("{0} is not an Open Assets output")]
    NotOpenAssetsOutput(OutPoint),

    #[error("invalid asset quantity: {0}")]
    InvalidQuantity(String),

    #[error("transaction {0} not found")]
    TransactionNotFound(Txid),

    #[error("output {0} not found")]
    OutputNotFound(OutPoint),

    /// Resolving a transfer required following too many ancestors
    #[error("asset history deeper than {0} transactions")]
    MaxDepthExceeded(u32),

    /// Failure reported by the chain or wallet backend
    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error(transparent)]
    Common(#[from] oap_common::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
