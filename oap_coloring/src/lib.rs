//! Colors transaction outputs with Open Assets quantities.
//!
//! The chain and the wallet are reached through the [`Chain`] and [`Wallet`] traits, in-memory
//! implementations of both are available with the `testing` feature.

pub mod chain;
mod error;
pub mod output;
pub mod resolver;
pub mod wallet;

pub use chain::Chain;
pub use error::{Error, Result};
pub use output::ColoredOutput;
pub use resolver::ColoringResolver;
pub use wallet::{
    AccountAddress, AssetUnspent, AssetWallet, AssetWalletTx, TxCategory, UnspentCoin, Wallet, WalletTx,
};

#[cfg(any(test, feature = "testing"))]
pub use chain::MemoryChain;
#[cfg(any(test, feature = "testing"))]
pub use wallet::MemoryWallet;
