use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bitcoin::base58;
use bitcoin::hashes::{hash160, Hash};
use bitcoin::Script;

use crate::address::ChainAddress;
use crate::error::{err, Error};
use crate::network::Network;
use crate::util::split_hash;
use crate::Result;

/// Identifies an asset class.
///
/// The hash is the hash160 of the locking script of the issuing address, so an asset id is
/// derived one-way from a chain address and can't be turned back into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId {
    version: u8,
    hash: [u8; 20],
}

impl AssetId {
    pub fn new(version: u8, hash: [u8; 20]) -> Result<Self> {
        if Network::from_asset_version(version).is_none() {
            return Err(Error::Addressing(format!("unknown asset id version {:#04x}", version)));
        }
        Ok(AssetId {
            version,
            hash,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }

    pub fn network(&self) -> Network {
        Network::from_asset_version(self.version).unwrap_or(Network::Mainnet)
    }

    /// The asset issued by outputs paying to `address`.
    pub fn from_chain_address(address: &ChainAddress) -> Self {
        Self::from_script(&address.script_pubkey(), address.network())
    }

    /// The asset issued by an input spending an output locked by `script`.
    pub fn from_script(script: &Script, network: Network) -> Self {
        AssetId {
            version: network.asset_version(),
            hash: hash160::Hash::hash(script.as_bytes()).to_byte_array(),
        }
    }
}

impl FromStr for AssetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let payload = base58::decode_check(s)?;
        let (version, hash) = match split_hash(&payload) {
            Some(split) => split,
            None => return err(&format!("{} has a wrong hash length", s)),
        };
        if Network::from_address_version(version).is_some() {
            return err(&format!("{} is a chain address, not an asset id", s));
        }
        AssetId::new(version, hash)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.version);
        payload.extend_from_slice(&self.hash);
        f.write_str(&base58::encode_check(&payload))
    }
}

impl Ord for AssetId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for AssetId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

crate::impl_string_serde!(AssetId);
