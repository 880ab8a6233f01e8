use std::path::PathBuf;

use oap_common::bitcoin::Txid;
use oap_common::{AssetId, ChainAddress, NetworkParameters};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_ACCOUNT: &str = "default";

/// Process-wide configuration given to [`crate::OapSession::new`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InitParam {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory persisting asset definitions, kept in memory when missing
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    #[serde(default)]
    pub network: NetworkParameters,

    /// Timeout of the http calls retrieving definitions by url, they are not retrieved when
    /// missing
    #[serde(default)]
    pub registry_timeout_secs: Option<u64>,

    /// Optional proxy to use for those calls
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for InitParam {
    fn default() -> Self {
        InitParam {
            log_level: default_log_level(),
            store_dir: None,
            network: NetworkParameters::default(),
            registry_timeout_secs: None,
            proxy: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_account() -> String {
    DEFAULT_ACCOUNT.into()
}

fn default_max_conf() -> u32 {
    u32::MAX
}

fn default_count() -> usize {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateAssetDefinitionParams {
    pub asset_id: AssetId,

    /// The definition document, `asset_ids` is filled with `asset_id` when missing
    pub definition: Value,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GetAssetDefinitionParams {
    /// An asset id or the hex of a definition pointer
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ListUnspentParams {
    #[serde(default)]
    pub min_conf: u32,

    #[serde(default = "default_max_conf")]
    pub max_conf: u32,

    /// All the wallet addresses when empty
    #[serde(default)]
    pub addresses: Vec<ChainAddress>,

    #[serde(default = "default_true")]
    pub include_assets: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ListTransactionsParams {
    #[serde(default = "default_account")]
    pub account: String,

    #[serde(default = "default_count")]
    pub count: usize,

    #[serde(default)]
    pub skip: usize,

    #[serde(default)]
    pub include_watch_only: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AccountParams {
    #[serde(default = "default_account")]
    pub account: String,

    #[serde(default)]
    pub include_watch_only: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AssetBalancesParams {
    #[serde(default)]
    pub min_conf: u32,

    #[serde(default)]
    pub addresses: Vec<ChainAddress>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OutPointParams {
    pub txid: Txid,
    pub vout: u32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BuildMarkerParams {
    pub quantities: Vec<u32>,

    /// Free form metadata, usually `u=<url of the definition>`
    #[serde(default)]
    pub metadata: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ParseMarkerParams {
    /// Hex of the output script
    pub script: String,
}
