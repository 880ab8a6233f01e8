use std::collections::HashMap;

use log::{debug, trace};
use oap_common::bitcoin::{Amount, OutPoint, Transaction, TxOut, Txid};
use oap_common::{AssetId, MarkerOutput, NetworkParameters};

use crate::chain::Chain;
use crate::output::ColoredOutput;
use crate::{Error, Result};

type Memo = HashMap<Txid, Vec<ColoredOutput>>;

/// What to do with the transaction on top of the work stack.
enum Step {
    Known,
    Colored(Txid, Vec<ColoredOutput>),
    Parents(Vec<(Transaction, u32)>),
}

/// Computes which outputs carry assets.
///
/// Outputs preceding the marker output receive the quantities of the marker in order. When
/// no input is colored the quantities are issued under the asset id of the first input's
/// previous output script. Otherwise the colored inputs are drained in input order: an
/// output takes its whole quantity from inputs of a single asset, and if the inputs can't
/// cover the outputs every output of the transaction is plain. Unassigned input quantity is
/// destroyed.
pub struct ColoringResolver<C> {
    chain: C,
    params: NetworkParameters,
}

impl<C: Chain> ColoringResolver<C> {
    pub fn new(chain: C, params: NetworkParameters) -> Self {
        ColoringResolver {
            chain,
            params,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn params(&self) -> &NetworkParameters {
        &self.params
    }

    pub fn dust(&self) -> Amount {
        Amount::from_sat(self.params.dust)
    }

    /// One entry per output of `tx`.
    pub fn color_transaction(&self, tx: &Transaction) -> Result<Vec<ColoredOutput>> {
        self.color(tx, &mut Memo::new())
    }

    pub fn resolve(&self, outpoint: &OutPoint) -> Result<ColoredOutput> {
        self.resolve_with(outpoint, &mut Memo::new())
    }

    /// The marker of the transaction that issued the asset carried by `outpoint`, `None`
    /// when the output is plain.
    ///
    /// Walks back through the first input holding the same asset until a transaction
    /// spends none.
    pub fn issuance_marker(&self, outpoint: &OutPoint) -> Result<Option<MarkerOutput>> {
        let mut memo = Memo::new();
        let asset_id = match self.resolve_with(outpoint, &mut memo)?.asset_id() {
            Some(asset_id) => *asset_id,
            None => return Ok(None),
        };
        let mut txid = outpoint.txid;
        for _ in 0..=self.params.max_depth {
            let tx = self.fetch(&txid)?;
            let mut parent = None;
            for txin in tx.input.iter().filter(|txin| !txin.previous_output.is_null()) {
                if self.resolve_with(&txin.previous_output, &mut memo)?.asset_id() == Some(&asset_id) {
                    parent = Some(txin.previous_output.txid);
                    break;
                }
            }
            match parent {
                Some(parent) => txid = parent,
                None => {
                    trace!("{} issued {}", txid, asset_id);
                    return Ok(MarkerOutput::find_in(&tx).map(|(_, marker)| marker));
                }
            }
        }
        Err(Error::MaxDepthExceeded(self.params.max_depth))
    }

    fn resolve_with(&self, outpoint: &OutPoint, memo: &mut Memo) -> Result<ColoredOutput> {
        let tx = self.fetch(&outpoint.txid)?;
        self.color(&tx, memo)?
            .into_iter()
            .nth(outpoint.vout as usize)
            .ok_or(Error::OutputNotFound(*outpoint))
    }

    /// Like [`ColoringResolver::resolve`] for an unspent coin whose output is known: only
    /// dust-valued coins are looked up on the chain.
    pub fn resolve_unspent(&self, outpoint: &OutPoint, txout: TxOut) -> Result<ColoredOutput> {
        if txout.value != self.dust() {
            return Ok(ColoredOutput::plain(txout));
        }
        self.resolve(outpoint)
    }

    /// The colored output at `outpoint`, failing if it carries no asset.
    pub fn require_colored(&self, outpoint: &OutPoint) -> Result<ColoredOutput> {
        let output = self.resolve(outpoint)?;
        if !output.is_colored() {
            return Err(Error::NotOpenAssetsOutput(*outpoint));
        }
        Ok(output)
    }

    fn fetch(&self, txid: &Txid) -> Result<Transaction> {
        self.chain.get_transaction(txid)?.ok_or(Error::TransactionNotFound(*txid))
    }

    /// Walks the ancestors of `tx` with an explicit stack, a transaction is colored once all
    /// the transactions it spends from are in the memo.
    fn color(&self, tx: &Transaction, memo: &mut Memo) -> Result<Vec<ColoredOutput>> {
        let root = tx.compute_txid();
        let mut stack = vec![(tx.clone(), 0u32)];
        loop {
            let step = match stack.last() {
                Some((tx, depth)) => self.step(tx, *depth, memo)?,
                None => break,
            };
            match step {
                Step::Known => {
                    stack.pop();
                }
                Step::Colored(txid, outputs) => {
                    stack.pop();
                    memo.insert(txid, outputs);
                }
                Step::Parents(parents) => stack.extend(parents),
            }
        }
        memo.get(&root).cloned().ok_or(Error::TransactionNotFound(root))
    }

    fn step(&self, tx: &Transaction, depth: u32, memo: &Memo) -> Result<Step> {
        let txid = tx.compute_txid();
        if memo.contains_key(&txid) {
            return Ok(Step::Known);
        }
        if depth > self.params.max_depth {
            return Err(Error::MaxDepthExceeded(self.params.max_depth));
        }

        let (marker_index, marker) = match MarkerOutput::find_in(tx) {
            Some(found) => found,
            None => return Ok(Step::Colored(txid, all_plain(tx))),
        };
        if marker.quantities().len() > marker_index {
            debug!("{} declares {} quantities for {} outputs", txid, marker.quantities().len(), marker_index);
            return Ok(Step::Colored(txid, all_plain(tx)));
        }

        let mut missing: Vec<Txid> = Vec::new();
        for txin in tx.input.iter() {
            let prev = txin.previous_output;
            if !prev.is_null() && !memo.contains_key(&prev.txid) && !missing.contains(&prev.txid) {
                missing.push(prev.txid);
            }
        }
        if !missing.is_empty() {
            trace!("{} at depth {} waits for {} parents", txid, depth, missing.len());
            let parents = missing
                .iter()
                .map(|txid| Ok((self.fetch(txid)?, depth + 1)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Step::Parents(parents));
        }

        trace!("coloring {} at depth {}", txid, depth);
        Ok(Step::Colored(txid, self.color_marked(tx, &marker, memo)?))
    }

    /// Colors `tx` from its marker, its parents are already in `memo`.
    fn color_marked(&self, tx: &Transaction, marker: &MarkerOutput, memo: &Memo) -> Result<Vec<ColoredOutput>> {
        let quantities = marker.quantities();

        let mut inputs = Vec::with_capacity(tx.input.len());
        for txin in tx.input.iter() {
            let prev = txin.previous_output;
            if prev.is_null() {
                inputs.push(None);
                continue;
            }
            let prev_output = memo
                .get(&prev.txid)
                .and_then(|outputs| outputs.get(prev.vout as usize))
                .cloned()
                .ok_or(Error::OutputNotFound(prev))?;
            inputs.push(Some(prev_output));
        }

        let colored_inputs: Vec<(AssetId, u64)> = inputs
            .iter()
            .flatten()
            .filter_map(|input| input.asset_id().map(|id| (*id, input.quantity() as u64)))
            .collect();

        let assigned = if colored_inputs.is_empty() {
            let issuer = match inputs.first() {
                Some(Some(first)) => first.txout().script_pubkey.clone(),
                _ => {
                    debug!("{} has no input to issue from", tx.compute_txid());
                    return Ok(all_plain(tx));
                }
            };
            let asset_id = AssetId::from_script(&issuer, self.params.network);
            quantities.iter().map(|q| (*q > 0).then_some((asset_id, *q))).collect()
        } else {
            match transfer(colored_inputs, quantities) {
                Some(assigned) => assigned,
                None => {
                    debug!("{} transfers more than its inputs hold", tx.compute_txid());
                    return Ok(all_plain(tx));
                }
            }
        };

        Ok(tx
            .output
            .iter()
            .enumerate()
            .map(|(vout, txout)| match assigned.get(vout) {
                Some(Some((asset_id, quantity))) => {
                    ColoredOutput::colored(txout.clone(), *asset_id, *quantity)
                }
                _ => ColoredOutput::plain(txout.clone()),
            })
            .collect())
    }
}

/// Distributes the colored inputs, in order, over the output quantities.
///
/// Returns `None` when the inputs can't cover the quantities or an output would receive two
/// different assets.
fn transfer(mut inputs: Vec<(AssetId, u64)>, quantities: &[u32]) -> Option<Vec<Option<(AssetId, u32)>>> {
    let mut pos = 0;
    let mut assigned = Vec::with_capacity(quantities.len());
    for quantity in quantities.iter().copied() {
        if quantity == 0 {
            assigned.push(None);
            continue;
        }
        let mut needed = quantity as u64;
        let mut asset_id = None;
        while needed > 0 {
            while inputs.get(pos)?.1 == 0 {
                pos += 1;
            }
            let (input_asset, available) = &mut inputs[pos];
            match asset_id {
                Some(id) if id != *input_asset => return None,
                _ => asset_id = Some(*input_asset),
            }
            let taken = needed.min(*available);
            *available -= taken;
            needed -= taken;
        }
        assigned.push(asset_id.map(|id| (id, quantity)));
    }
    Some(assigned)
}

fn all_plain(tx: &Transaction) -> Vec<ColoredOutput> {
    tx.output.iter().cloned().map(ColoredOutput::plain).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use oap_common::bitcoin::{
        absolute, transaction, Amount, ScriptBuf, Sequence, TxIn, Witness,
    };
    use oap_common::{ChainAddress, Network};

    const DUST: u64 = 600;

    fn address(byte: u8) -> ChainAddress {
        ChainAddress::new(0x00, [byte; 20]).unwrap()
    }

    fn pay(address: &ChainAddress, value: u64) -> TxOut {
        TxOut {
            value: Amount::from_sat(value),
            script_pubkey: address.script_pubkey(),
        }
    }

    fn marker(quantities: &[u32]) -> TxOut {
        MarkerOutput::new(quantities.to_vec(), vec![]).to_txout().unwrap()
    }

    fn spend(outpoints: &[OutPoint], output: Vec<TxOut>) -> Transaction {
        Transaction {
            version: transaction::Version::ONE,
            lock_time: absolute::LockTime::ZERO,
            input: outpoints
                .iter()
                .map(|outpoint| TxIn {
                    previous_output: *outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output,
        }
    }

    /// A coinbase-like transaction funding `address`, unique per `tag`.
    fn fund(chain: &MemoryChain, address: &ChainAddress, value: u64, tag: u32) -> OutPoint {
        let mut tx = spend(&[OutPoint::null()], vec![pay(address, value)]);
        tx.lock_time = absolute::LockTime::from_consensus(tag);
        OutPoint::new(chain.insert(tx), 0)
    }

    fn resolver(chain: &MemoryChain) -> ColoringResolver<MemoryChain> {
        ColoringResolver::new(chain.clone(), NetworkParameters::new(Network::Mainnet))
    }

    /// Issues `quantities` from `issuer` to `to`, returns the issuance txid.
    fn issue(chain: &MemoryChain, issuer: &ChainAddress, quantities: &[u32], tag: u32) -> Txid {
        let funding = fund(chain, issuer, 100_000, tag);
        let mut output: Vec<TxOut> = quantities.iter().map(|_| pay(issuer, DUST)).collect();
        output.push(marker(quantities));
        chain.insert(spend(&[funding], output))
    }

    #[test]
    fn issuance() {
        let _ = env_logger::try_init();
        let chain = MemoryChain::new();
        let a = address(1);
        let funding = fund(&chain, &a, 10_000, 0);
        let txid = chain.insert(spend(&[funding], vec![pay(&a, DUST), marker(&[1000])]));
        let resolver = resolver(&chain);

        let o0 = resolver.resolve(&OutPoint::new(txid, 0)).unwrap();
        assert!(o0.is_colored());
        assert_eq!(o0.quantity(), 1000);
        assert_eq!(o0.asset_id(), Some(&AssetId::from_chain_address(&a)));

        let o1 = resolver.resolve(&OutPoint::new(txid, 1)).unwrap();
        assert!(!o1.is_colored());
        assert_eq!(o1.value(), Amount::ZERO);
    }

    #[test]
    fn no_marker_is_plain() {
        let chain = MemoryChain::new();
        let a = address(1);
        let funding = fund(&chain, &a, 10_000, 0);
        let tx = spend(&[funding], vec![pay(&a, DUST), pay(&a, 5000)]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert!(outputs.iter().all(|o| !o.is_colored()));
    }

    #[test]
    fn outputs_after_marker_are_plain() {
        let chain = MemoryChain::new();
        let a = address(1);
        let funding = fund(&chain, &a, 10_000, 0);
        let tx = spend(&[funding], vec![pay(&a, DUST), marker(&[5, 0]), pay(&a, DUST)]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert_eq!(outputs.iter().map(|o| o.quantity()).collect::<Vec<_>>(), vec![5, 0, 0]);
    }

    #[test]
    fn zero_quantity_is_plain() {
        let chain = MemoryChain::new();
        let a = address(1);
        let funding = fund(&chain, &a, 10_000, 0);
        let tx = spend(&[funding], vec![pay(&a, DUST), pay(&a, DUST), marker(&[0, 3])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert!(!outputs[0].is_colored());
        assert_eq!(outputs[1].quantity(), 3);
    }

    #[test]
    fn too_many_quantities() {
        let chain = MemoryChain::new();
        let a = address(1);
        let funding = fund(&chain, &a, 10_000, 0);
        let tx = spend(&[funding], vec![pay(&a, DUST), marker(&[1, 2])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert!(outputs.iter().all(|o| !o.is_colored()));
    }

    #[test]
    fn two_markers_are_plain() {
        let chain = MemoryChain::new();
        let a = address(1);
        let funding = fund(&chain, &a, 10_000, 0);
        let tx = spend(&[funding], vec![pay(&a, DUST), marker(&[1]), marker(&[1, 1])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert!(outputs.iter().all(|o| !o.is_colored()));
    }

    #[test]
    fn coinbase_cannot_issue() {
        let chain = MemoryChain::new();
        let a = address(1);
        let tx = spend(&[OutPoint::null()], vec![pay(&a, DUST), marker(&[1])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert!(!outputs[0].is_colored());
    }

    #[test]
    fn transfer_splits() {
        let _ = env_logger::try_init();
        let chain = MemoryChain::new();
        let (a, b, c) = (address(1), address(2), address(3));
        let issuance = issue(&chain, &a, &[1000], 0);
        let fee = fund(&chain, &b, 10_000, 1);
        let txid = chain.insert(spend(
            &[OutPoint::new(issuance, 0), fee],
            vec![pay(&b, DUST), pay(&c, DUST), marker(&[400, 600]), pay(&b, 5000)],
        ));

        let resolver = resolver(&chain);
        let asset_id = AssetId::from_chain_address(&a);
        let outputs = resolver.color_transaction(&chain.get_transaction(&txid).unwrap().unwrap()).unwrap();
        assert_eq!(outputs[0].asset_id(), Some(&asset_id));
        assert_eq!(outputs[0].quantity(), 400);
        assert_eq!(outputs[1].asset_id(), Some(&asset_id));
        assert_eq!(outputs[1].quantity(), 600);
        assert!(!outputs[2].is_colored());
        assert!(!outputs[3].is_colored());
    }

    #[test]
    fn transfer_destroys_leftover() {
        let chain = MemoryChain::new();
        let a = address(1);
        let issuance = issue(&chain, &a, &[1000], 0);
        let tx = spend(&[OutPoint::new(issuance, 0)], vec![pay(&a, DUST), marker(&[10])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert_eq!(outputs[0].quantity(), 10);
    }

    #[test]
    fn transfer_over_supply_is_plain() {
        let chain = MemoryChain::new();
        let a = address(1);
        let issuance = issue(&chain, &a, &[100], 0);
        let tx = spend(&[OutPoint::new(issuance, 0)], vec![pay(&a, DUST), pay(&a, DUST), marker(&[60, 41])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert!(outputs.iter().all(|o| !o.is_colored()));
    }

    #[test]
    fn transfer_merges_same_asset() {
        let chain = MemoryChain::new();
        let a = address(1);
        let issuance = issue(&chain, &a, &[100, 100], 0);
        let tx = spend(
            &[OutPoint::new(issuance, 0), OutPoint::new(issuance, 1)],
            vec![pay(&a, DUST), marker(&[150])],
        );
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert_eq!(outputs[0].quantity(), 150);
    }

    #[test]
    fn transfer_cannot_straddle_assets() {
        let chain = MemoryChain::new();
        let (a, b) = (address(1), address(2));
        let first = issue(&chain, &a, &[100], 0);
        let second = issue(&chain, &b, &[100], 1);
        let inputs = [OutPoint::new(first, 0), OutPoint::new(second, 0)];

        let tx = spend(&inputs, vec![pay(&a, DUST), marker(&[150])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert!(!outputs[0].is_colored());

        let tx = spend(&inputs, vec![pay(&a, DUST), pay(&b, DUST), marker(&[100, 100])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert_eq!(outputs[0].asset_id(), Some(&AssetId::from_chain_address(&a)));
        assert_eq!(outputs[1].asset_id(), Some(&AssetId::from_chain_address(&b)));
    }

    #[test]
    fn spending_without_marker_uncolors() {
        let chain = MemoryChain::new();
        let a = address(1);
        let issuance = issue(&chain, &a, &[100], 0);
        let txid = chain.insert(spend(&[OutPoint::new(issuance, 0)], vec![pay(&a, DUST)]));
        let output = resolver(&chain).resolve(&OutPoint::new(txid, 0)).unwrap();
        assert!(!output.is_colored());
    }

    #[test]
    fn p2sh_issuer() {
        let chain = MemoryChain::new();
        let issuer = ChainAddress::new(0x05, [4u8; 20]).unwrap();
        let funding = fund(&chain, &issuer, 10_000, 0);
        let tx = spend(&[funding], vec![pay(&issuer, DUST), marker(&[1])]);
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert_eq!(outputs[0].asset_id(), Some(&AssetId::from_chain_address(&issuer)));
    }

    #[test]
    fn missing_transactions() {
        let chain = MemoryChain::new();
        let resolver = resolver(&chain);
        let outpoint = OutPoint::new(OutPoint::null().txid, 3);
        assert!(matches!(resolver.resolve(&outpoint), Err(Error::TransactionNotFound(_))));

        let a = address(1);
        let funding = fund(&chain, &a, 10_000, 0);
        assert!(matches!(
            resolver.resolve(&OutPoint::new(funding.txid, 5)),
            Err(Error::OutputNotFound(_))
        ));

        // the marker transaction needs its inputs
        let orphan = spend(&[OutPoint::new(funding.txid, 9)], vec![pay(&a, DUST), marker(&[1])]);
        assert!(matches!(resolver.color_transaction(&orphan), Err(Error::OutputNotFound(_))));
    }

    #[test]
    fn max_depth() {
        let chain = MemoryChain::new();
        let a = address(1);
        let mut txid = issue(&chain, &a, &[100], 0);
        for _ in 0..3 {
            txid = chain.insert(spend(&[OutPoint::new(txid, 0)], vec![pay(&a, DUST), marker(&[100])]));
        }
        let tip = OutPoint::new(txid, 0);

        let mut params = NetworkParameters::new(Network::Mainnet);
        params.max_depth = 2;
        let shallow = ColoringResolver::new(chain.clone(), params);
        assert!(matches!(shallow.resolve(&tip), Err(Error::MaxDepthExceeded(2))));

        let output = resolver(&chain).resolve(&tip).unwrap();
        assert_eq!(output.quantity(), 100);
        assert_eq!(output.asset_id(), Some(&AssetId::from_chain_address(&a)));
    }

    #[test]
    fn long_transfer_chain() {
        let chain = MemoryChain::new();
        let a = address(1);
        let mut txid = issue(&chain, &a, &[100], 0);
        for _ in 0..oap_common::network::DEFAULT_MAX_DEPTH - 1 {
            txid = chain.insert(spend(&[OutPoint::new(txid, 0)], vec![pay(&a, DUST), marker(&[100])]));
        }

        let output = resolver(&chain).resolve(&OutPoint::new(txid, 0)).unwrap();
        assert_eq!(output.quantity(), 100);
        assert_eq!(output.asset_id(), Some(&AssetId::from_chain_address(&a)));
    }

    #[test]
    fn shared_parent() {
        let chain = MemoryChain::new();
        let a = address(1);
        let issuance = issue(&chain, &a, &[3, 4], 0);
        let tx = spend(
            &[OutPoint::new(issuance, 0), OutPoint::new(issuance, 1)],
            vec![pay(&a, DUST), marker(&[7])],
        );
        let outputs = resolver(&chain).color_transaction(&tx).unwrap();
        assert_eq!(outputs[0].quantity(), 7);
    }

    #[test]
    fn issuance_marker() {
        let chain = MemoryChain::new();
        let (a, b) = (address(1), address(2));
        let funding = fund(&chain, &a, 10_000, 0);
        let issued = MarkerOutput::new(vec![100], b"u=https://cpr.sm/Yi6KfG4z8o".to_vec());
        let issuance = chain.insert(spend(&[funding], vec![pay(&a, DUST), issued.to_txout().unwrap()]));
        let fee = fund(&chain, &b, 10_000, 1);
        let transfer = chain.insert(spend(
            &[fee, OutPoint::new(issuance, 0)],
            vec![pay(&b, DUST), marker(&[100])],
        ));
        let resolver = resolver(&chain);

        assert_eq!(resolver.issuance_marker(&OutPoint::new(transfer, 0)).unwrap(), Some(issued.clone()));
        assert_eq!(resolver.issuance_marker(&OutPoint::new(issuance, 0)).unwrap(), Some(issued));
        assert_eq!(resolver.issuance_marker(&OutPoint::new(transfer, 1)).unwrap(), None);
    }

    #[test]
    fn require_colored() {
        let chain = MemoryChain::new();
        let a = address(1);
        let issuance = issue(&chain, &a, &[7], 0);
        let resolver = resolver(&chain);
        assert_eq!(resolver.require_colored(&OutPoint::new(issuance, 0)).unwrap().quantity(), 7);
        let marker_outpoint = OutPoint::new(issuance, 1);
        assert!(matches!(
            resolver.require_colored(&marker_outpoint),
            Err(Error::NotOpenAssetsOutput(o)) if o == marker_outpoint
        ));
    }

    #[test]
    fn resolve_unspent_skips_non_dust() {
        let chain = MemoryChain::new();
        let resolver = resolver(&chain);
        let unknown = OutPoint::new(OutPoint::null().txid, 0);
        let output = resolver.resolve_unspent(&unknown, pay(&address(1), 5000)).unwrap();
        assert!(!output.is_colored());
        assert!(resolver.resolve_unspent(&unknown, pay(&address(1), DUST)).is_err());
    }

    #[test]
    fn idempotent() {
        let chain = MemoryChain::new();
        let issuance = issue(&chain, &address(1), &[9, 8], 0);
        let resolver = resolver(&chain);
        let outpoint = OutPoint::new(issuance, 1);
        assert_eq!(resolver.resolve(&outpoint).unwrap(), resolver.resolve(&outpoint).unwrap());
    }
}
