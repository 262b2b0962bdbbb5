use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

fn hash_concat(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchHeader {
    pub height: u64,
    pub prev_hash: [u8; 32],
    pub transactions_root: [u8; 32],
    pub state_root: [u8; 32],
    pub timestamp: u64,
}

/// An ordered run of transactions that all executed successfully.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Batch {
    pub header: BatchHeader,
    pub transactions: Vec<Transaction>,
}

impl Batch {
    pub fn transactions_root(txs: &[Transaction]) -> [u8; 32] {
        if txs.is_empty() {
            return [0u8; 32];
        }

        let mut level: Vec<[u8; 32]> = txs.iter().map(|tx| tx.id()).collect();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| {
                    let left = pair[0];
                    let right = pair.get(1).copied().unwrap_or(left);
                    hash_concat(&left, &right)
                })
                .collect();
        }
        level[0]
    }

    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&bincode::serialize(&self.header).expect("batch header serialization"));
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::LedgerInstruction;

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            sender: [1u8; 32],
            nonce,
            instruction: LedgerInstruction::ClaimRewards,
            signature: vec![],
        }
    }

    #[test]
    fn empty_root_is_zero() {
        assert_eq!(Batch::transactions_root(&[]), [0u8; 32]);
    }

    #[test]
    fn root_depends_on_order() {
        let a = Batch::transactions_root(&[tx(0), tx(1), tx(2)]);
        let b = Batch::transactions_root(&[tx(1), tx(0), tx(2)]);
        assert_ne!(a, b);
        assert_eq!(Batch::transactions_root(&[tx(0)]), tx(0).id());
    }
}
