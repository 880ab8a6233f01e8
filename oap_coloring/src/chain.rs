use oap_common::bitcoin::{OutPoint, Transaction, TxOut, Txid};

use crate::Result;

/// Read access to the transactions of the underlying blockchain.
pub trait Chain {
    fn get_transaction(&self, txid: &Txid) -> Result<Option<Transaction>>;

    fn get_transaction_output(&self, outpoint: &OutPoint) -> Result<Option<TxOut>> {
        Ok(self
            .get_transaction(&outpoint.txid)?
            .and_then(|tx| tx.output.get(outpoint.vout as usize).cloned()))
    }
}

impl<T: Chain + ?Sized> Chain for &T {
    fn get_transaction(&self, txid: &Txid) -> Result<Option<Transaction>> {
        (**self).get_transaction(txid)
    }
}

impl<T: Chain + ?Sized> Chain for Box<T> {
    fn get_transaction(&self, txid: &Txid) -> Result<Option<Transaction>> {
        (**self).get_transaction(txid)
    }
}

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryChain;

#[cfg(any(test, feature = "testing"))]
mod memory {
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use super::*;
    use crate::Error;

    /// A chain made of the transactions inserted in it, cloned handles share them.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryChain {
        txs: Arc<RwLock<HashMap<Txid, Transaction>>>,
    }

    impl MemoryChain {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, tx: Transaction) -> Txid {
            let txid = tx.compute_txid();
            if let Ok(mut txs) = self.txs.write() {
                txs.insert(txid, tx);
            }
            txid
        }

        pub fn len(&self) -> usize {
            self.txs.read().map(|txs| txs.len()).unwrap_or_default()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl Chain for MemoryChain {
        fn get_transaction(&self, txid: &Txid) -> Result<Option<Transaction>> {
            let txs = self.txs.read().map_err(|e| Error::Collaborator(e.to_string()))?;
            Ok(txs.get(txid).cloned())
        }
    }
}
