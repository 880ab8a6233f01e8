//! Open Assets codecs: LEB128 quantities, marker outputs, asset ids and asset addresses.

#[macro_use]
mod util;

pub mod address;
pub mod asset_id;
pub mod error;
pub mod marker;
pub mod network;
pub mod varint;

pub use address::{AssetAddress, ChainAddress};
pub use asset_id::AssetId;
pub use error::Error;
pub use marker::{strip_marker_prefix, MarkerOutput};
pub use network::{Network, NetworkParameters};

pub use bitcoin;
pub use log;

pub type Result<T> = std::result::Result<T, Error>;
