//! The marker output: a zero-value `OP_RETURN` output whose payload assigns asset quantities
//! to the outputs preceding it.
//!
//! Layout of the locking script:
//!
//! ```text
//! 0x6a | len | 'O' 'A' | 0x01 0x00 | n | n * LEB128 quantity | m | m * metadata byte
//! ```
//!
//! where `len` counts every byte after itself.

use bitcoin::hex::DisplayHex;
use bitcoin::{Amount, Script, ScriptBuf, Transaction, TxOut};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::{varint, Result};

pub const OP_RETURN: u8 = 0x6a;

/// The `OA` tag following the length byte.
pub const PROTOCOL_MARKER: [u8; 2] = [0x4f, 0x41];

pub const PROTOCOL_VERSION: [u8; 2] = [0x01, 0x00];

/// Maximum size of a marker output locking script.
pub const MAX_SCRIPT_LEN: usize = 80;

const HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerOutput {
    quantities: Vec<u32>,
    metadata: Vec<u8>,
}

impl MarkerOutput {
    pub fn new(quantities: Vec<u32>, metadata: Vec<u8>) -> Self {
        MarkerOutput {
            quantities,
            metadata,
        }
    }

    /// Quantities assigned to the outputs preceding the marker, in output order.
    pub fn quantities(&self) -> &[u32] {
        &self.quantities
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    /// Decodes the locking script of a marker output.
    pub fn parse(script: &[u8]) -> Result<Self> {
        if script.first() != Some(&OP_RETURN) {
            return Err(Error::marker("missing OP_RETURN", 0, script));
        }
        match script.get(1) {
            Some(len) if *len as usize + 2 == script.len() => (),
            _ => return Err(Error::marker("declared length mismatch", 1, script)),
        }
        if script.len() <= HEADER_LEN {
            return Err(Error::marker("truncated header", script.len(), script));
        }
        if script[2..4] != PROTOCOL_MARKER {
            return Err(Error::marker("unknown protocol marker", 2, script));
        }
        if script[4..6] != PROTOCOL_VERSION {
            return Err(Error::marker("unsupported protocol version", 4, script));
        }

        let count = script[HEADER_LEN] as usize;
        let mut offset = HEADER_LEN + 1;
        let mut quantities = Vec::with_capacity(count);
        for _ in 0..count {
            let (quantity, next) = varint::decode_at(script, offset)?;
            quantities.push(quantity);
            offset = next;
        }

        let metadata_len = match script.get(offset) {
            Some(len) => *len as usize,
            None => return Err(Error::marker("missing metadata length", offset, script)),
        };
        if offset + 1 + metadata_len != script.len() {
            return Err(Error::marker("metadata length mismatch", offset, script));
        }
        let metadata = script[offset + 1..].to_vec();

        trace!("parsed marker {:?} from {}", quantities, script.to_lower_hex_string());

        Ok(MarkerOutput {
            quantities,
            metadata,
        })
    }

    /// Encodes `quantities` and `metadata` into a marker output locking script.
    ///
    /// Fails when the script would exceed [`MAX_SCRIPT_LEN`] bytes, which also covers
    /// quantity arrays or metadata too long for their single length byte.
    pub fn build(quantities: &[u32], metadata: &[u8]) -> Result<ScriptBuf> {
        let quantities_len: usize = quantities.iter().map(|q| varint::encoded_len(*q)).sum();
        let script_len = HEADER_LEN + 1 + quantities_len + 1 + metadata.len();
        if script_len > MAX_SCRIPT_LEN || quantities.len() > u8::MAX as usize {
            return Err(Error::MarkerFormat {
                reason: "payload exceeds 80 bytes",
                offset: MAX_SCRIPT_LEN,
                bytes: format!("{} quantities, {} metadata bytes", quantities.len(), metadata.len()),
            });
        }

        let mut script = vec![0u8; script_len];
        script[0] = OP_RETURN;
        script[1] = (script_len - 2) as u8;
        script[2..4].copy_from_slice(&PROTOCOL_MARKER);
        script[4..6].copy_from_slice(&PROTOCOL_VERSION);
        script[HEADER_LEN] = quantities.len() as u8;

        let mut offset = HEADER_LEN + 1;
        for quantity in quantities {
            offset = varint::encode_into(*quantity, &mut script, offset)?;
        }
        script[offset] = metadata.len() as u8;
        script[offset + 1..].copy_from_slice(metadata);

        Ok(ScriptBuf::from_bytes(script))
    }

    pub fn to_script(&self) -> Result<ScriptBuf> {
        Self::build(&self.quantities, &self.metadata)
    }

    /// A zero-value output carrying this marker.
    pub fn to_txout(&self) -> Result<TxOut> {
        Ok(TxOut {
            value: Amount::ZERO,
            script_pubkey: self.to_script()?,
        })
    }

    /// Locates the marker output of `tx`.
    ///
    /// A transaction carries color only when exactly one of its outputs is a zero-value,
    /// well-formed marker. Malformed `OP_RETURN` outputs are not markers.
    pub fn find_in(tx: &Transaction) -> Option<(usize, MarkerOutput)> {
        let mut found = tx
            .output
            .iter()
            .enumerate()
            .filter(|(_, output)| output.value == Amount::ZERO)
            .filter(|(_, output)| output.script_pubkey.is_op_return())
            .filter_map(|(vout, output)| match Self::parse(output.script_pubkey.as_bytes()) {
                Ok(marker) => Some((vout, marker)),
                Err(e) => {
                    debug!("tx {} output {} is not a marker: {}", tx.compute_txid(), vout, e);
                    None
                }
            });

        let first = found.next()?;
        if found.next().is_some() {
            debug!("tx {} has more than one marker output", tx.compute_txid());
            return None;
        }
        Some(first)
    }
}

/// Removes the `OP_RETURN` opcode and the length byte of a marker script; any other script is
/// returned unchanged.
pub fn strip_marker_prefix(script: &Script) -> &[u8] {
    let bytes = script.as_bytes();
    match bytes.first() {
        Some(&OP_RETURN) if bytes.len() >= 2 => &bytes[2..],
        Some(&OP_RETURN) => &bytes[1..],
        _ => bytes,
    }
}
