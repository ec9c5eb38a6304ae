//! # Cross-Chain Shared Memory
//!
//! Value moves between chains through escrow records. The source chain
//! puts a UTXO into shared memory addressed to the destination; the
//! destination later imports (removes) it.
//!
//! Records written by the reward chain carry a timestamp. Reads are only
//! eventually consistent, so the executor refuses records younger than the
//! configured sync bound; see `executor::atomic`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::ids::{Address, Id, UtxoId};
use crate::utxo::Utxo;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SharedMemoryError {
    #[error("no shared memory record {utxo_id} from chain {chain_id}")]
    NotFound { chain_id: Id, utxo_id: UtxoId },
}

/// An escrowed UTXO and how it is indexed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicUtxo {
    pub utxo: Utxo,
    /// Unix seconds the source chain accepted the record, if it tracks that.
    pub timestamp: Option<u64>,
    /// Addresses the record can be looked up by.
    pub traits: Vec<Address>,
}

/// Requests against one peer chain's shared memory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicOps {
    /// Records imported from the peer, to delete.
    pub remove: Vec<UtxoId>,
    /// Records exported to the peer.
    pub put: Vec<AtomicUtxo>,
}

impl AtomicOps {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.put.is_empty()
    }

    pub fn extend(&mut self, other: AtomicOps) {
        self.remove.extend(other.remove);
        self.put.extend(other.put);
    }
}

/// Read side of shared memory, as seen from this chain.
pub trait SharedMemory {
    /// Records from `source_chain` with exactly these ids, in order.
    fn get(&self, source_chain: &Id, ids: &[UtxoId]) -> Result<Vec<AtomicUtxo>, SharedMemoryError>;

    /// Every record from `source_chain` indexed under any of `traits`,
    /// ordered by utxo id.
    fn indexed(
        &self,
        source_chain: &Id,
        traits: &[Address],
    ) -> Result<Vec<AtomicUtxo>, SharedMemoryError>;
}

/// In-memory shared memory for a single local chain.
#[derive(Clone, Debug, Default)]
pub struct MemorySharedMemory {
    /// Records other chains escrowed for us, by source chain.
    inbound: BTreeMap<Id, BTreeMap<UtxoId, AtomicUtxo>>,
    /// Records we escrowed for other chains, by destination chain.
    outbound: BTreeMap<Id, BTreeMap<UtxoId, AtomicUtxo>>,
}

impl MemorySharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Escrow a record from `source_chain` for this chain to import.
    pub fn insert_inbound(&mut self, source_chain: Id, record: AtomicUtxo) {
        self.inbound
            .entry(source_chain)
            .or_default()
            .insert(record.utxo.id, record);
    }

    /// Records this chain exported to `destination_chain`.
    pub fn outbound(&self, destination_chain: &Id) -> Vec<AtomicUtxo> {
        self.outbound
            .get(destination_chain)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn inbound_len(&self, source_chain: &Id) -> usize {
        self.inbound.get(source_chain).map_or(0, BTreeMap::len)
    }

    /// Apply the atomic requests of an accepted transaction or block.
    pub fn apply_requests(&mut self, requests: BTreeMap<Id, AtomicOps>) {
        for (peer, ops) in requests {
            if let Some(inbound) = self.inbound.get_mut(&peer) {
                for id in &ops.remove {
                    inbound.remove(id);
                }
            }
            let outbound = self.outbound.entry(peer).or_default();
            for record in ops.put {
                outbound.insert(record.utxo.id, record);
            }
        }
    }
}

impl SharedMemory for MemorySharedMemory {
    fn get(&self, source_chain: &Id, ids: &[UtxoId]) -> Result<Vec<AtomicUtxo>, SharedMemoryError> {
        let records = self.inbound.get(source_chain);
        ids.iter()
            .map(|id| {
                records
                    .and_then(|r| r.get(id))
                    .cloned()
                    .ok_or(SharedMemoryError::NotFound {
                        chain_id: *source_chain,
                        utxo_id: *id,
                    })
            })
            .collect()
    }

    fn indexed(
        &self,
        source_chain: &Id,
        traits: &[Address],
    ) -> Result<Vec<AtomicUtxo>, SharedMemoryError> {
        let Some(records) = self.inbound.get(source_chain) else {
            return Ok(Vec::new());
        };
        Ok(records
            .values()
            .filter(|record| record.traits.iter().any(|t| traits.contains(t)))
            .cloned()
            .collect())
    }
}
