//! Key-value persistence for ledger state and sequenced batches.
//!
//! Values are bincode-encoded. Keys:
//! `global_state`, `batch_height_{n}`, `batch_hash_{hex}` and `tip`.

use anyhow::{anyhow, Result};
use lef_types::batch::Batch;
use lef_types::state::GlobalState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

const STATE_KEY: &[u8] = b"global_state";
const TIP_KEY: &[u8] = b"tip";

pub trait KvBackend: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Process-local backend, for tests and nodes started without a data directory.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("memory backend poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("memory backend poisoned"))?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

#[cfg(feature = "rocksdb")]
pub struct RocksBackend {
    db: rocksdb::DB,
}

#[cfg(feature = "rocksdb")]
impl RocksBackend {
    pub fn open(path: &str) -> Result<Self> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        let db = rocksdb::DB::open(&opts, path).map_err(|e| anyhow!("Failed to open DB: {}", e))?;
        Ok(Self { db })
    }
}

#[cfg(feature = "rocksdb")]
impl KvBackend for RocksBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db.get(key).map_err(|e| anyhow!("DB read error: {}", e))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value).map_err(|e| anyhow!("DB write error: {}", e))
    }
}

pub struct Storage<B: KvBackend> {
    backend: B,
}

impl Storage<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }
}

#[cfg(feature = "rocksdb")]
impl Storage<RocksBackend> {
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(RocksBackend::open(path)?))
    }
}

impl<B: KvBackend> Storage<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    fn put_encoded<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let encoded = bincode::serialize(value).map_err(|e| anyhow!("Serialization error: {}", e))?;
        self.backend.put(key, &encoded)
    }

    fn get_decoded<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.backend.get(key)? {
            Some(bytes) => {
                let decoded = bincode::deserialize(&bytes).map_err(|e| anyhow!("Deserialization error: {}", e))?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }

    pub fn save_state(&self, state: &GlobalState) -> Result<()> {
        self.put_encoded(STATE_KEY, state)
    }

    /// `None` on a fresh store; the node then builds state from genesis.
    pub fn load_state(&self) -> Result<Option<GlobalState>> {
        self.get_decoded(STATE_KEY)
    }

    pub fn save_batch(&self, batch: &Batch) -> Result<()> {
        let height_key = format!("batch_height_{}", batch.header.height);
        let hash_key = format!("batch_hash_{}", hex::encode(batch.hash()));
        self.put_encoded(height_key.as_bytes(), batch)?;
        self.put_encoded(hash_key.as_bytes(), batch)?;
        self.put_encoded(TIP_KEY, &batch.header.height)
    }

    pub fn load_batch_by_height(&self, height: u64) -> Result<Option<Batch>> {
        self.get_decoded(format!("batch_height_{}", height).as_bytes())
    }

    pub fn load_batch_by_hash(&self, hash: &[u8; 32]) -> Result<Option<Batch>> {
        self.get_decoded(format!("batch_hash_{}", hex::encode(hash)).as_bytes())
    }

    /// Height of the last persisted batch, 0 before the first one.
    pub fn tip(&self) -> Result<u64> {
        Ok(self.get_decoded(TIP_KEY)?.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lef_types::batch::BatchHeader;
    use lef_types::instruction::LedgerInstruction;
    use lef_types::transaction::Transaction;

    fn batch(height: u64) -> Batch {
        let transactions = vec![Transaction {
            sender: [9u8; 32],
            nonce: height,
            instruction: LedgerInstruction::ClaimRewards,
            signature: vec![1, 2, 3],
        }];
        Batch {
            header: BatchHeader {
                height,
                prev_hash: [0u8; 32],
                transactions_root: Batch::transactions_root(&transactions),
                state_root: [height as u8; 32],
                timestamp: 1_700_000_000 + height,
            },
            transactions,
        }
    }

    #[test]
    fn fresh_store_is_empty() {
        let storage = Storage::in_memory();
        assert!(storage.load_state().unwrap().is_none());
        assert_eq!(storage.tip().unwrap(), 0);
        assert!(storage.load_batch_by_height(1).unwrap().is_none());
    }

    #[test]
    fn state_survives_round_trip() {
        let storage = Storage::in_memory();
        let mut state = GlobalState::default();
        state.ledger.total_supply = 42;
        state.ledger.accounts.entry([3u8; 32]).or_default().balance = 42;
        state.ledger.acc_rewards_per_token = 7u64.into();

        storage.save_state(&state).unwrap();
        let loaded = storage.load_state().unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.root_hash(), state.root_hash());
    }

    #[test]
    fn batches_indexed_by_height_and_hash() {
        let storage = Storage::in_memory();
        let first = batch(1);
        let second = batch(2);
        storage.save_batch(&first).unwrap();
        storage.save_batch(&second).unwrap();

        assert_eq!(storage.tip().unwrap(), 2);
        assert_eq!(storage.load_batch_by_height(1).unwrap(), Some(first.clone()));
        assert_eq!(storage.load_batch_by_hash(&second.hash()).unwrap(), Some(second));
        assert!(storage.load_batch_by_hash(&[0xEE; 32]).unwrap().is_none());
    }
}
