use oap_common::bitcoin::{Amount, TxOut};
use oap_common::AssetId;
use serde::{Deserialize, Serialize};

/// A transaction output, optionally tagged with the asset it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColoredOutput {
    Plain {
        txout: TxOut,
    },
    Colored {
        txout: TxOut,
        asset_id: AssetId,
        quantity: u32,
    },
}

impl ColoredOutput {
    pub fn plain(txout: TxOut) -> Self {
        ColoredOutput::Plain {
            txout,
        }
    }

    pub fn colored(txout: TxOut, asset_id: AssetId, quantity: u32) -> Self {
        ColoredOutput::Colored {
            txout,
            asset_id,
            quantity,
        }
    }

    pub fn is_colored(&self) -> bool {
        matches!(self, ColoredOutput::Colored { .. })
    }

    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            ColoredOutput::Colored {
                asset_id,
                ..
            } => Some(asset_id),
            ColoredOutput::Plain {
                ..
            } => None,
        }
    }

    /// The asset quantity, zero for plain outputs.
    pub fn quantity(&self) -> u32 {
        match self {
            ColoredOutput::Colored {
                quantity,
                ..
            } => *quantity,
            ColoredOutput::Plain {
                ..
            } => 0,
        }
    }

    pub fn txout(&self) -> &TxOut {
        match self {
            ColoredOutput::Plain {
                txout,
            }
            | ColoredOutput::Colored {
                txout,
                ..
            } => txout,
        }
    }

    pub fn value(&self) -> Amount {
        self.txout().value
    }

    pub fn into_txout(self) -> TxOut {
        match self {
            ColoredOutput::Plain {
                txout,
            }
            | ColoredOutput::Colored {
                txout,
                ..
            } => txout,
        }
    }
}

impl From<TxOut> for ColoredOutput {
    fn from(txout: TxOut) -> Self {
        ColoredOutput::plain(txout)
    }
}
