//! Entry point of the Open Assets stack.
//!
//! An [`OapSession`] is built once with its chain and wallet backends and passed to whoever
//! needs asset information, either through its typed methods or through
//! [`OapSession::handle_call`] with json in and out.

pub mod error;
pub mod params;

use std::io::Write;
use std::str::FromStr;
use std::sync::Once;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use oap_coloring::{AssetWallet, Chain, ColoringResolver, Wallet};
use oap_common::bitcoin::hex::{DisplayHex, FromHex};
use oap_common::bitcoin::OutPoint;
use oap_common::log::{self, debug, info, LevelFilter, Metadata, Record};
use oap_common::MarkerOutput;
use oap_registry::{
    AssetDefinition, AssetDefinitionPointer, DefinitionFetcher, HttpFetcher, PointerKind, Registry,
};
use serde::Serialize;
use serde_json::{json, Value};

pub use crate::error::{Error, JsonError};
pub use crate::params::InitParam;
use crate::params::*;

pub type Result<T> = std::result::Result<T, Error>;

static INIT_LOGGER: Once = Once::new();

/// The configured protocol stack: definition registry, coloring resolver and asset wallet.
pub struct OapSession<W, C> {
    registry: Registry,
    wallet: AssetWallet<W, C>,
    fetcher: Option<HttpFetcher>,
}

impl<W: Wallet, C: Chain> OapSession<W, C> {
    pub fn new(param: &InitParam, wallet: W, chain: C) -> Result<Self> {
        let registry = match param.store_dir.as_ref() {
            Some(dir) => Registry::open(dir)?,
            None => Registry::in_memory(),
        };
        let fetcher = param
            .registry_timeout_secs
            .map(|secs| HttpFetcher::new(param.proxy.as_deref(), Duration::from_secs(secs)))
            .transpose()?;
        info!(
            "session on {:?} dust {} store {:?} http {}",
            param.network.network,
            param.network.dust,
            param.store_dir,
            fetcher.is_some()
        );
        let resolver = ColoringResolver::new(chain, param.network.clone());
        Ok(OapSession {
            registry,
            wallet: AssetWallet::new(wallet, resolver),
            fetcher,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn wallet(&self) -> &AssetWallet<W, C> {
        &self.wallet
    }

    pub fn resolver(&self) -> &ColoringResolver<C> {
        self.wallet.resolver()
    }

    /// Looks up a definition by asset id or pointer; url pointers missing from the registry
    /// are retrieved when http is configured.
    pub fn get_asset_definition(&mut self, id: &str) -> Result<AssetDefinition> {
        let res = self.registry.get_asset_definition(id);
        if let Err(oap_registry::Error::NotFound(_)) = res {
            if let (Ok(pointer), Some(fetcher)) = (AssetDefinitionPointer::from_str(id), self.fetcher.as_ref()) {
                if pointer.kind() == PointerKind::Url {
                    return Ok(self.registry.resolve_pointer(&pointer, Some(fetcher))?);
                }
            }
        }
        Ok(res?)
    }

    /// The definition of the asset carried by `outpoint`.
    ///
    /// Assets unknown to the registry are looked up through the `u=<url>` metadata of their
    /// issuance marker.
    pub fn get_output_asset_definition(&mut self, outpoint: &OutPoint) -> Result<AssetDefinition> {
        let output = self.resolver().require_colored(outpoint)?;
        let asset_id = match output.asset_id() {
            Some(asset_id) => *asset_id,
            None => return Err(oap_coloring::Error::NotOpenAssetsOutput(*outpoint).into()),
        };
        if self.registry.get_pointer(&asset_id)?.is_some() {
            return self.get_asset_definition(&asset_id.to_string());
        }

        let pointer = self
            .resolver()
            .issuance_marker(outpoint)?
            .and_then(|marker| AssetDefinitionPointer::from_metadata(marker.metadata()))
            .ok_or_else(|| oap_registry::Error::NotFound(asset_id.to_string()))?;
        debug!("{} defined at {}", asset_id, pointer);
        let fetcher = self.fetcher.as_ref().map(|f| f as &dyn DefinitionFetcher);
        let definition = self.registry.resolve_pointer(&pointer, fetcher)?;
        if !definition.asset_ids().contains(&asset_id) {
            return Err(oap_registry::Error::Definition(format!("{} does not define {}", pointer, asset_id)).into());
        }
        Ok(definition)
    }

    /// Dispatches `method` with its json `input`, returning the json result.
    pub fn handle_call(&mut self, method: &str, input: &str) -> Result<String> {
        let start = Instant::now();
        debug!("handle_call {} {}", method, input);
        let input: Value = if input.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(input)?
        };

        let res = match method {
            "create_asset_definition" => {
                let params: CreateAssetDefinitionParams = serde_json::from_value(input)?;
                let text = serde_json::to_string(&params.definition)?;
                to_string(&self.registry.create_asset_definition(&params.asset_id, &text)?)?
            }
            "get_asset_definition" => {
                let params: GetAssetDefinitionParams = serde_json::from_value(input)?;
                to_string(&self.get_asset_definition(&params.id)?)?
            }
            "get_output_asset_definition" => {
                let params: OutPointParams = serde_json::from_value(input)?;
                let outpoint = OutPoint::new(params.txid, params.vout);
                to_string(&self.get_output_asset_definition(&outpoint)?)?
            }
            "get_colored_output" => {
                let params: OutPointParams = serde_json::from_value(input)?;
                to_string(&self.resolver().resolve(&OutPoint::new(params.txid, params.vout))?)?
            }
            "list_unspent" => {
                let params: ListUnspentParams = serde_json::from_value(input)?;
                to_string(&self.wallet.list_unspent(
                    params.min_conf,
                    params.max_conf,
                    &params.addresses,
                    params.include_assets,
                )?)?
            }
            "list_transactions" => {
                let params: ListTransactionsParams = serde_json::from_value(input)?;
                to_string(&self.wallet.list_transactions(
                    &params.account,
                    params.count,
                    params.skip,
                    params.include_watch_only,
                )?)?
            }
            "get_addresses_by_account" => {
                let params: AccountParams = serde_json::from_value(input)?;
                to_string(&self.wallet.get_addresses_by_account(&params.account, params.include_watch_only)?)?
            }
            "get_receiving_address" => {
                let params: AccountParams = serde_json::from_value(input)?;
                to_string(&self.wallet.get_receiving_address(&params.account)?)?
            }
            "get_asset_balances" => {
                let params: AssetBalancesParams = serde_json::from_value(input)?;
                to_string(&self.wallet.get_asset_balances(params.min_conf, &params.addresses)?)?
            }
            "build_marker_output" => {
                let params: BuildMarkerParams = serde_json::from_value(input)?;
                let script = MarkerOutput::build(&params.quantities, params.metadata.as_bytes())?;
                to_string(&json!({ "script": script.as_bytes().to_lower_hex_string() }))?
            }
            "parse_marker_output" => {
                let params: ParseMarkerParams = serde_json::from_value(input)?;
                let bytes = Vec::<u8>::from_hex(&params.script)
                    .map_err(|e| Error::InvalidHex(format!("{}: {}", params.script, e)))?;
                to_string(&MarkerOutput::parse(&bytes)?)?
            }
            _ => return Err(Error::MethodNotFound(method.to_string())),
        };

        info!("`{}` took {:?}", method, start.elapsed());

        Ok(res)
    }

    /// Like [`OapSession::handle_call`] with errors serialized as [`JsonError`].
    pub fn call(&mut self, method: &str, input: &str) -> std::result::Result<String, String> {
        self.handle_call(method, input).map_err(|e| {
            log::warn!("`{}` failed: {}", method, e);
            serde_json::to_string(&JsonError::from(e)).unwrap_or_default()
        })
    }
}

/// Parses the log level of `param` and installs the logger.
pub fn init(param: &InitParam) -> Result<()> {
    let level = LevelFilter::from_str(&param.log_level).map_err(|_| Error::LogLevel(param.log_level.clone()))?;
    init_logging(level);
    Ok(())
}

/// Initialize the logging framework.
/// Note that once initialized it cannot be changed, only by restarting the process.
pub fn init_logging(level: LevelFilter) {
    INIT_LOGGER.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    });
}

fn to_string<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

static LOGGER: SimpleLogger = SimpleLogger;

pub struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let level = metadata.level();
        if level > log::Level::Debug {
            level <= log::max_level()
        } else {
            level <= log::max_level()
                && !metadata.target().starts_with("rustls")
                && !metadata.target().starts_with("ureq")
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
            let _ = writeln!(
                std::io::stdout(),
                "{:02}.{:03} {} - {}",
                ts.as_secs() % 60,
                ts.subsec_millis(),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}
