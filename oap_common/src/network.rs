use serde::{Deserialize, Serialize};

/// Value, in satoshi, carried by every colored output.
pub const DEFAULT_DUST: u64 = 600;

/// How many ancestor transactions are followed when resolving transferred color.
pub const DEFAULT_MAX_DEPTH: u32 = 1000;

/// Leading byte of the binary form of every asset address.
pub const ASSET_ADDRESS_NAMESPACE: u8 = 0x13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    PubkeyHash,
    ScriptHash,
}

const MAINNET_ADDRESS_VERSIONS: [(u8, AddressKind); 3] =
    [(0x00, AddressKind::PubkeyHash), (0x05, AddressKind::ScriptHash), (0x1c, AddressKind::PubkeyHash)];

const TESTNET_ADDRESS_VERSIONS: [(u8, AddressKind); 3] =
    [(0x6f, AddressKind::PubkeyHash), (0xc4, AddressKind::ScriptHash), (0x3a, AddressKind::PubkeyHash)];

const MAINNET_ASSET_VERSION: u8 = 0x17;
const TESTNET_ASSET_VERSION: u8 = 0x73;

impl Network {
    pub fn iter() -> impl Iterator<Item = Network> {
        [Network::Mainnet, Network::Testnet].into_iter()
    }

    fn address_versions(self) -> &'static [(u8, AddressKind); 3] {
        match self {
            Network::Mainnet => &MAINNET_ADDRESS_VERSIONS,
            Network::Testnet => &TESTNET_ADDRESS_VERSIONS,
        }
    }

    pub fn asset_version(self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_ASSET_VERSION,
            Network::Testnet => TESTNET_ASSET_VERSION,
        }
    }

    /// The version byte used when a script of `kind` is rendered as an address.
    pub fn address_version(self, kind: AddressKind) -> u8 {
        // the first two entries of each table are the canonical versions
        match kind {
            AddressKind::PubkeyHash => self.address_versions()[0].0,
            AddressKind::ScriptHash => self.address_versions()[1].0,
        }
    }

    /// Network and script kind of a chain address version byte.
    pub fn from_address_version(version: u8) -> Option<(Network, AddressKind)> {
        Network::iter().find_map(|network| {
            network
                .address_versions()
                .iter()
                .find(|(v, _)| *v == version)
                .map(|(_, kind)| (network, *kind))
        })
    }

    pub fn from_asset_version(version: u8) -> Option<Network> {
        Network::iter().find(|network| network.asset_version() == version)
    }
}

/// Protocol parameters shared by every component of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameters {
    pub network: Network,

    /// Colored outputs carry exactly this value.
    #[serde(default = "default_dust")]
    pub dust: u64,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_dust() -> u64 {
    DEFAULT_DUST
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

impl Default for NetworkParameters {
    fn default() -> Self {
        NetworkParameters {
            network: Network::Mainnet,
            dust: DEFAULT_DUST,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl NetworkParameters {
    pub fn new(network: Network) -> Self {
        NetworkParameters {
            network,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tables() {
        assert_eq!(Network::from_address_version(0x00), Some((Network::Mainnet, AddressKind::PubkeyHash)));
        assert_eq!(Network::from_address_version(0x05), Some((Network::Mainnet, AddressKind::ScriptHash)));
        assert_eq!(Network::from_address_version(0xc4), Some((Network::Testnet, AddressKind::ScriptHash)));
        assert_eq!(Network::from_address_version(0x17), None);
        assert_eq!(Network::from_address_version(0x80), None);

        assert_eq!(Network::from_asset_version(0x17), Some(Network::Mainnet));
        assert_eq!(Network::from_asset_version(0x73), Some(Network::Testnet));
        assert_eq!(Network::from_asset_version(0x00), None);

        assert_eq!(Network::Testnet.address_version(AddressKind::PubkeyHash), 0x6f);
        assert_eq!(Network::Mainnet.address_version(AddressKind::ScriptHash), 0x05);
    }

    #[test]
    fn parameters_deserialization() {
        let params: NetworkParameters = serde_json::from_str(r#"{"network":"testnet"}"#).unwrap();
        assert_eq!(params, NetworkParameters::new(Network::Testnet));

        let params: NetworkParameters =
            serde_json::from_str(r#"{"network":"mainnet","dust":546,"max_depth":3}"#).unwrap();
        assert_eq!(params.dust, 546);
        assert_eq!(params.max_depth, 3);

        assert!(serde_json::from_str::<NetworkParameters>(r#"{"network":"regtest"}"#).is_err());
    }
}
