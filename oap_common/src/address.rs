use std::fmt;
use std::str::FromStr;

use bitcoin::base58;
use bitcoin::{Script, ScriptBuf};

use crate::error::{err, Error};
use crate::network::{AddressKind, Network, ASSET_ADDRESS_NAMESPACE};
use crate::util::split_hash;
use crate::Result;

/// An ordinary base58check address of the underlying chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainAddress {
    version: u8,
    hash: [u8; 20],
}

impl ChainAddress {
    pub fn new(version: u8, hash: [u8; 20]) -> Result<Self> {
        if Network::from_address_version(version).is_none() {
            return Err(Error::Addressing(format!("unknown address version {:#04x}", version)));
        }
        Ok(ChainAddress {
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
        self.network_kind().0
    }

    pub fn kind(&self) -> AddressKind {
        self.network_kind().1
    }

    fn network_kind(&self) -> (Network, AddressKind) {
        // `version` is checked on construction
        Network::from_address_version(self.version).unwrap_or((Network::Mainnet, AddressKind::PubkeyHash))
    }

    /// The locking script paying to this address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        let mut script = Vec::with_capacity(25);
        match self.kind() {
            AddressKind::PubkeyHash => {
                // OP_DUP OP_HASH160 OP_PUSHBYTES_20 <hash> OP_EQUALVERIFY OP_CHECKSIG
                script.extend_from_slice(&[0x76, 0xa9, 0x14]);
                script.extend_from_slice(&self.hash);
                script.extend_from_slice(&[0x88, 0xac]);
            }
            AddressKind::ScriptHash => {
                // OP_HASH160 OP_PUSHBYTES_20 <hash> OP_EQUAL
                script.extend_from_slice(&[0xa9, 0x14]);
                script.extend_from_slice(&self.hash);
                script.push(0x87);
            }
        }
        ScriptBuf::from_bytes(script)
    }

    /// The address a P2PKH or P2SH `script` pays to, `None` for any other script.
    pub fn from_script(script: &Script, network: Network) -> Option<Self> {
        let bytes = script.as_bytes();
        let (kind, hash) = if script.is_p2pkh() {
            (AddressKind::PubkeyHash, &bytes[3..23])
        } else if script.is_p2sh() {
            (AddressKind::ScriptHash, &bytes[2..22])
        } else {
            return None;
        };
        Some(ChainAddress {
            version: network.address_version(kind),
            hash: hash.try_into().ok()?,
        })
    }
}

impl FromStr for ChainAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let payload = base58::decode_check(s)?;
        match split_hash(&payload) {
            Some((version, hash)) => ChainAddress::new(version, hash),
            None => err(&format!("{} is not a chain address", s)),
        }
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.version);
        payload.extend_from_slice(&self.hash);
        f.write_str(&base58::encode_check(&payload))
    }
}

crate::impl_string_serde!(ChainAddress);

/// A chain address re-encoded under the asset namespace, used to receive assets.
///
/// Its binary form is `namespace | version | hash`, the version being the one of the
/// underlying chain address so that the conversion is invertible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetAddress {
    address: ChainAddress,
}

impl AssetAddress {
    pub fn namespace(&self) -> u8 {
        ASSET_ADDRESS_NAMESPACE
    }

    pub fn version(&self) -> u8 {
        self.address.version
    }

    pub fn public_key_hash(&self) -> &[u8; 20] {
        &self.address.hash
    }

    pub fn to_chain_address(&self) -> ChainAddress {
        self.address
    }

    /// Whether `s` decodes as an asset address.
    pub fn is_asset_address(s: &str) -> bool {
        AssetAddress::from_str(s).is_ok()
    }
}

impl From<ChainAddress> for AssetAddress {
    fn from(address: ChainAddress) -> Self {
        AssetAddress {
            address,
        }
    }
}

impl From<AssetAddress> for ChainAddress {
    fn from(address: AssetAddress) -> Self {
        address.address
    }
}

impl FromStr for AssetAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let payload = base58::decode_check(s)?;
        match payload.split_first() {
            Some((&ASSET_ADDRESS_NAMESPACE, rest)) => match split_hash(rest) {
                Some((version, hash)) => Ok(ChainAddress::new(version, hash)?.into()),
                None => err(&format!("{} has a wrong hash length", s)),
            },
            _ => err(&format!("{} is not in the asset address namespace", s)),
        }
    }
}

impl fmt::Display for AssetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(22);
        payload.push(ASSET_ADDRESS_NAMESPACE);
        payload.push(self.address.version);
        payload.extend_from_slice(&self.address.hash);
        f.write_str(&base58::encode_check(&payload))
    }
}

crate::impl_string_serde!(AssetAddress);
