use std::collections::BTreeMap;

use log::{debug, info};
use oap_common::bitcoin::{Amount, OutPoint, ScriptBuf, TxOut, Txid};
use oap_common::{AssetAddress, AssetId, ChainAddress};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::output::ColoredOutput;
use crate::resolver::ColoringResolver;
use crate::{Error, Result};

/// An unspent output as reported by the wallet backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentCoin {
    pub outpoint: OutPoint,
    pub address: ChainAddress,
    pub script_pubkey: ScriptBuf,
    /// satoshi
    pub value: u64,
    pub confirmations: u32,
}

impl UnspentCoin {
    pub fn txout(&self) -> TxOut {
        TxOut {
            value: Amount::from_sat(self.value),
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxCategory {
    Send,
    Receive,
}

/// One wallet history entry, referencing the output it moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTx {
    pub txid: Txid,
    pub vout: u32,
    pub account: String,
    pub address: Option<ChainAddress>,
    pub category: TxCategory,
    /// satoshi, negative when sending
    pub amount: i64,
    pub confirmations: u32,
}

/// Backend enumerating the coins and history of a wallet.
pub trait Wallet {
    fn list_unspent_raw(
        &self,
        min_conf: u32,
        max_conf: u32,
        addresses: &[ChainAddress],
    ) -> Result<Vec<UnspentCoin>>;

    fn list_transactions_raw(
        &self,
        account: &str,
        count: usize,
        skip: usize,
        include_watch_only: bool,
    ) -> Result<Vec<WalletTx>>;

    fn get_addresses_by_account(&self, account: &str, include_watch_only: bool) -> Result<Vec<ChainAddress>>;

    fn get_receiving_address(&self, account: &str) -> Result<ChainAddress>;
}

impl<T: Wallet + ?Sized> Wallet for Box<T> {
    fn list_unspent_raw(&self, min_conf: u32, max_conf: u32, addresses: &[ChainAddress]) -> Result<Vec<UnspentCoin>> {
        (**self).list_unspent_raw(min_conf, max_conf, addresses)
    }

    fn list_transactions_raw(
        &self,
        account: &str,
        count: usize,
        skip: usize,
        include_watch_only: bool,
    ) -> Result<Vec<WalletTx>> {
        (**self).list_transactions_raw(account, count, skip, include_watch_only)
    }

    fn get_addresses_by_account(&self, account: &str, include_watch_only: bool) -> Result<Vec<ChainAddress>> {
        (**self).get_addresses_by_account(account, include_watch_only)
    }

    fn get_receiving_address(&self, account: &str) -> Result<ChainAddress> {
        (**self).get_receiving_address(account)
    }
}

/// An unspent coin with its asset, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUnspent {
    #[serde(flatten)]
    pub coin: UnspentCoin,
    pub asset_id: Option<AssetId>,
    pub quantity: Option<u32>,
}

impl AssetUnspent {
    fn new(coin: UnspentCoin, output: &ColoredOutput) -> Self {
        AssetUnspent {
            coin,
            asset_id: output.asset_id().copied(),
            quantity: output.is_colored().then(|| output.quantity()),
        }
    }

    pub fn is_colored(&self) -> bool {
        self.asset_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetWalletTx {
    #[serde(flatten)]
    pub tx: WalletTx,
    pub asset_id: Option<AssetId>,
    pub quantity: Option<u32>,
}

/// A chain address together with its asset address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAddress {
    pub address: ChainAddress,
    pub asset_address: AssetAddress,
}

impl From<ChainAddress> for AccountAddress {
    fn from(address: ChainAddress) -> Self {
        AccountAddress {
            address,
            asset_address: address.into(),
        }
    }
}

/// Asset-aware view over a [`Wallet`].
pub struct AssetWallet<W, C> {
    wallet: W,
    resolver: ColoringResolver<C>,
}

impl<W: Wallet, C: Chain> AssetWallet<W, C> {
    pub fn new(wallet: W, resolver: ColoringResolver<C>) -> Self {
        AssetWallet {
            wallet,
            resolver,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn resolver(&self) -> &ColoringResolver<C> {
        &self.resolver
    }

    /// Lists the unspent coins of `addresses`, all of the wallet's when empty.
    ///
    /// Zero-value coins are never listed. Dust-valued coins are resolved on the chain when
    /// `include_assets` is set and skipped otherwise, so that they can't be spent as plain
    /// coins.
    pub fn list_unspent(
        &self,
        min_conf: u32,
        max_conf: u32,
        addresses: &[ChainAddress],
        include_assets: bool,
    ) -> Result<Vec<AssetUnspent>> {
        let dust = self.resolver.params().dust;
        let coins = self.wallet.list_unspent_raw(min_conf, max_conf, addresses)?;
        let total = coins.len();

        let mut unspent = Vec::with_capacity(total);
        for coin in coins {
            if coin.value == 0 || (coin.value == dust && !include_assets) {
                continue;
            }
            let output = self.resolver.resolve_unspent(&coin.outpoint, coin.txout())?;
            unspent.push(AssetUnspent::new(coin, &output));
        }
        debug!("listed {} of {} unspent coins", unspent.len(), total);
        Ok(unspent)
    }

    pub fn list_transactions(
        &self,
        account: &str,
        count: usize,
        skip: usize,
        include_watch_only: bool,
    ) -> Result<Vec<AssetWalletTx>> {
        let dust = self.resolver.params().dust;
        let txs = self.wallet.list_transactions_raw(account, count, skip, include_watch_only)?;
        txs.into_iter()
            .map(|tx| -> Result<AssetWalletTx> {
                let output = if tx.amount.unsigned_abs() == dust {
                    Some(self.resolver.resolve(&OutPoint::new(tx.txid, tx.vout))?)
                } else {
                    None
                };
                Ok(AssetWalletTx {
                    asset_id: output.as_ref().and_then(|o| o.asset_id().copied()),
                    quantity: output.as_ref().filter(|o| o.is_colored()).map(|o| o.quantity()),
                    tx,
                })
            })
            .collect()
    }

    pub fn get_addresses_by_account(&self, account: &str, include_watch_only: bool) -> Result<Vec<AccountAddress>> {
        Ok(self
            .wallet
            .get_addresses_by_account(account, include_watch_only)?
            .into_iter()
            .map(AccountAddress::from)
            .collect())
    }

    pub fn get_receiving_address(&self, account: &str) -> Result<AccountAddress> {
        Ok(self.wallet.get_receiving_address(account)?.into())
    }

    /// Total quantity of each asset held by the unspent coins of `addresses`.
    pub fn get_asset_balances(
        &self,
        min_conf: u32,
        addresses: &[ChainAddress],
    ) -> Result<BTreeMap<AssetId, u64>> {
        let mut balances = BTreeMap::new();
        for unspent in self.list_unspent(min_conf, u32::MAX, addresses, true)? {
            if let (Some(asset_id), Some(quantity)) = (unspent.asset_id, unspent.quantity) {
                *balances.entry(asset_id).or_insert(0u64) += quantity as u64;
            }
        }
        Ok(balances)
    }

    /// Picks colored coins of `asset_id`, oldest confirmations first, until `quantity` is
    /// covered.
    pub fn select_asset_coins(
        &self,
        asset_id: &AssetId,
        quantity: u64,
        min_conf: u32,
        addresses: &[ChainAddress],
    ) -> Result<Vec<AssetUnspent>> {
        if quantity == 0 {
            return Err(Error::InvalidQuantity("cannot send a zero quantity".into()));
        }
        let mut candidates: Vec<AssetUnspent> = self
            .list_unspent(min_conf, u32::MAX, addresses, true)?
            .into_iter()
            .filter(|u| u.asset_id.as_ref() == Some(asset_id))
            .collect();
        candidates.sort_by(|a, b| b.coin.confirmations.cmp(&a.coin.confirmations));

        let mut selected = Vec::new();
        let mut covered = 0u64;
        for candidate in candidates {
            if covered >= quantity {
                break;
            }
            covered += candidate.quantity.unwrap_or_default() as u64;
            selected.push(candidate);
        }
        if covered < quantity {
            return Err(Error::InvalidQuantity(format!(
                "{} of {} available, {} requested",
                covered, asset_id, quantity
            )));
        }
        info!("selected {} coins holding {} of {}", selected.len(), covered, asset_id);
        Ok(selected)
    }
}

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryWallet;

#[cfg(any(test, feature = "testing"))]
mod memory {
    use std::collections::HashMap;

    use super::*;

    /// A wallet backed by vectors, the unspent coins and history being whatever is added.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryWallet {
        coins: Vec<UnspentCoin>,
        txs: Vec<WalletTx>,
        accounts: HashMap<String, Vec<ChainAddress>>,
        watch_only: Vec<ChainAddress>,
    }

    impl MemoryWallet {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_address(&mut self, account: &str, address: ChainAddress) {
            self.accounts.entry(account.to_string()).or_default().push(address);
        }

        pub fn add_watch_only(&mut self, address: ChainAddress) {
            self.watch_only.push(address);
        }

        pub fn add_coin(&mut self, coin: UnspentCoin) {
            self.coins.push(coin);
        }

        pub fn add_transaction(&mut self, tx: WalletTx) {
            self.txs.push(tx);
        }
    }

    impl Wallet for MemoryWallet {
        fn list_unspent_raw(
            &self,
            min_conf: u32,
            max_conf: u32,
            addresses: &[ChainAddress],
        ) -> Result<Vec<UnspentCoin>> {
            Ok(self
                .coins
                .iter()
                .filter(|c| c.confirmations >= min_conf && c.confirmations <= max_conf)
                .filter(|c| addresses.is_empty() || addresses.contains(&c.address))
                .cloned()
                .collect())
        }

        fn list_transactions_raw(
            &self,
            account: &str,
            count: usize,
            skip: usize,
            include_watch_only: bool,
        ) -> Result<Vec<WalletTx>> {
            Ok(self
                .txs
                .iter()
                .filter(|tx| account == "*" || tx.account == account)
                .filter(|tx| {
                    include_watch_only
                        || tx.address.map_or(true, |a| !self.watch_only.contains(&a))
                })
                .skip(skip)
                .take(count)
                .cloned()
                .collect())
        }

        fn get_addresses_by_account(
            &self,
            account: &str,
            include_watch_only: bool,
        ) -> Result<Vec<ChainAddress>> {
            let mut addresses = self.accounts.get(account).cloned().unwrap_or_default();
            if !include_watch_only {
                addresses.retain(|a| !self.watch_only.contains(a));
            }
            Ok(addresses)
        }

        fn get_receiving_address(&self, account: &str) -> Result<ChainAddress> {
            self.accounts
                .get(account)
                .and_then(|addresses| addresses.last().copied())
                .ok_or_else(|| Error::Collaborator(format!("account {} has no address", account)))
        }
    }
}
