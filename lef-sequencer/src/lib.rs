use anyhow::Result;
use lef_execution::{execute_transaction, ExecutionContext, LedgerError};
use lef_storage::{KvBackend, Storage};
use lef_types::batch::{Batch, BatchHeader};
use lef_types::state::GlobalState;
use lef_types::transaction::Transaction;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{error, info, warn};

/// Orders submitted transactions into batches and applies them to the live state.
pub struct SequencerService<B: KvBackend> {
    state: Arc<RwLock<GlobalState>>,
    storage: Arc<Storage<B>>,
    tx_rx: mpsc::Receiver<Transaction>,
    queue: Vec<Transaction>,
    batch_interval: Duration,
    height: u64,
    last_batch_hash: [u8; 32],
    last_timestamp: u64,
}

impl<B: KvBackend> SequencerService<B> {
    pub fn new(
        state: Arc<RwLock<GlobalState>>,
        storage: Arc<Storage<B>>,
        tx_rx: mpsc::Receiver<Transaction>,
        batch_interval: Duration,
    ) -> Result<Self> {
        let height = storage.tip()?;
        let (last_batch_hash, last_timestamp) = match storage.load_batch_by_height(height)? {
            Some(batch) => (batch.hash(), batch.header.timestamp),
            None => ([0u8; 32], 0),
        };
        if height > 0 {
            info!(height, "recovered batch tip");
        }

        Ok(Self {
            state,
            storage,
            tx_rx,
            queue: Vec::new(),
            batch_interval,
            height,
            last_batch_hash,
            last_timestamp,
        })
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Runs until `shutdown` flips to true or every sender is gone. Either way
    /// whatever is still queued is sealed into a final batch before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.batch_interval.as_millis() as u64, "sequencer started");
        let mut interval = tokio::time::interval(self.batch_interval);

        loop {
            tokio::select! {
                maybe_tx = self.tx_rx.recv() => match maybe_tx {
                    Some(tx) => self.queue.push(tx),
                    None => {
                        info!("submission channel closed; sequencer stopping");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested; sequencer stopping");
                        break;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.seal_batch(unix_now()).await {
                        error!("batch {} failed: {}", self.height + 1, e);
                    }
                }
            }
        }

        self.tx_rx.close();
        while let Ok(tx) = self.tx_rx.try_recv() {
            self.queue.push(tx);
        }
        if let Err(e) = self.seal_batch(unix_now()).await {
            error!("final batch failed: {}", e);
        }
    }

    /// Executes the queued transactions and persists the resulting batch.
    ///
    /// The batch runs against a copy of the live state, which is replaced only
    /// once the batch and state are stored. On a storage error the live state is
    /// untouched and the transactions go back to the front of the queue.
    /// `timestamp` never moves backwards across batches.
    pub async fn seal_batch(&mut self, timestamp: u64) -> Result<Option<Batch>> {
        if self.queue.is_empty() {
            return Ok(None);
        }
        let txs: Vec<Transaction> = self.queue.drain(..).collect();
        let height = self.height + 1;
        let timestamp = timestamp.max(self.last_timestamp);

        let mut live = self.state.write().await;
        let mut next = live.clone();
        let Some(batch) = build_batch(&mut next, txs.clone(), height, self.last_batch_hash, timestamp) else {
            return Ok(None);
        };

        let persisted = self
            .storage
            .save_batch(&batch)
            .and_then(|()| self.storage.save_state(&next));
        if let Err(e) = persisted {
            let mut requeued = txs;
            requeued.append(&mut self.queue);
            self.queue = requeued;
            return Err(e);
        }

        *live = next;
        self.height = height;
        self.last_batch_hash = batch.hash();
        self.last_timestamp = timestamp;

        info!(
            height,
            txs = batch.transactions.len(),
            total_supply = live.ledger.total_supply,
            composite = live.index.composite,
            "batch sealed"
        );
        Ok(Some(batch))
    }
}

/// Applies `txs` in order and returns the batch of those that reached the ledger.
///
/// A transaction whose instruction fails has still consumed its nonce, so it is
/// kept in the batch and replays to the same state. Transactions rejected at the
/// envelope (signature or nonce) leave no trace and are dropped.
pub fn build_batch(
    state: &mut GlobalState,
    txs: Vec<Transaction>,
    height: u64,
    prev_hash: [u8; 32],
    timestamp: u64,
) -> Option<Batch> {
    let mut included = Vec::new();
    {
        let mut ctx = ExecutionContext {
            state: &mut *state,
            height,
            timestamp,
        };

        for tx in txs {
            let id = hex::encode(tx.id());
            match execute_transaction(&tx, &mut ctx) {
                Ok(()) => included.push(tx),
                Err(e @ (LedgerError::InvalidSignature | LedgerError::InvalidNonce { .. })) => {
                    warn!(tx = %id, error = %e, "transaction dropped");
                }
                Err(e) => {
                    warn!(tx = %id, error = %e, kind = ?e.kind(), "instruction rejected");
                    included.push(tx);
                }
            }
        }
    }

    if included.is_empty() {
        return None;
    }

    Some(Batch {
        header: BatchHeader {
            height,
            prev_hash,
            transactions_root: Batch::transactions_root(&included),
            state_root: state.root_hash(),
            timestamp,
        },
        transactions: included,
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lef_crypto::signatures::{address_of, generate_keypair, sign, SigningKey};
    use lef_execution::ledger;
    use lef_storage::MemoryBackend;
    use lef_types::instruction::LedgerInstruction;

    /// Reads see an empty store; every write fails.
    struct BrokenBackend;

    impl KvBackend for BrokenBackend {
        fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn signed(key: &SigningKey, nonce: u64, instruction: LedgerInstruction) -> Transaction {
        let mut tx = Transaction {
            sender: address_of(key),
            nonce,
            instruction,
            signature: vec![],
        };
        tx.signature = sign(key, &tx.signing_bytes());
        tx
    }

    fn funded(key: &SigningKey, amount: u128) -> GlobalState {
        let mut state = GlobalState::default();
        ledger::mint(&mut state.ledger, &address_of(key), amount).unwrap();
        state
    }

    #[test]
    fn batch_keeps_nonce_consuming_transactions() {
        let kp = generate_keypair();
        let mut state = funded(&kp, 1_000);

        let txs = vec![
            signed(&kp, 0, LedgerInstruction::Transfer { to: [2u8; 32], amount: 100 }),
            // Replayed nonce: dropped.
            signed(&kp, 0, LedgerInstruction::Transfer { to: [2u8; 32], amount: 100 }),
            // Overdraw: rejected but consumes nonce 1.
            signed(&kp, 1, LedgerInstruction::Transfer { to: [2u8; 32], amount: 10_000 }),
            signed(&kp, 2, LedgerInstruction::Burn { amount: 10 }),
        ];

        let batch = build_batch(&mut state, txs, 1, [0u8; 32], 100).unwrap();
        assert_eq!(batch.transactions.len(), 3);
        assert_eq!(batch.header.state_root, state.root_hash());
        assert_eq!(batch.header.transactions_root, Batch::transactions_root(&batch.transactions));
        assert_eq!(state.ledger.nonce_of(&address_of(&kp)), 3);
        assert_eq!(state.ledger.total_supply, 990);
    }

    #[test]
    fn replaying_a_batch_reaches_the_same_root() {
        let kp = generate_keypair();
        let genesis = funded(&kp, 1_000);
        let txs = vec![
            signed(&kp, 0, LedgerInstruction::Transfer { to: [2u8; 32], amount: 300 }),
            signed(&kp, 1, LedgerInstruction::ClaimRewards),
        ];

        let mut live = genesis.clone();
        let batch = build_batch(&mut live, txs, 1, [0u8; 32], 100).unwrap();

        let mut replica = genesis;
        let replayed = build_batch(&mut replica, batch.transactions.clone(), 1, [0u8; 32], 100).unwrap();
        assert_eq!(replayed.header, batch.header);
    }

    #[test]
    fn empty_batch_is_skipped() {
        let kp = generate_keypair();
        let mut state = funded(&kp, 1_000);
        let forged = Transaction {
            sender: address_of(&kp),
            nonce: 0,
            instruction: LedgerInstruction::Burn { amount: 1 },
            signature: vec![0u8; 64],
        };
        assert!(build_batch(&mut state, vec![forged], 1, [0u8; 32], 100).is_none());
        assert_eq!(state.ledger.nonce_of(&address_of(&kp)), 0);
    }

    #[tokio::test]
    async fn sealed_batches_are_persisted_and_chained() {
        let kp = generate_keypair();
        let state = Arc::new(RwLock::new(funded(&kp, 1_000)));
        let storage = Arc::new(Storage::new(MemoryBackend::default()));
        let (tx_sender, tx_rx) = mpsc::channel(16);
        let mut sequencer = SequencerService::new(state.clone(), storage.clone(), tx_rx, Duration::from_millis(10)).unwrap();

        tx_sender
            .send(signed(&kp, 0, LedgerInstruction::Transfer { to: [2u8; 32], amount: 100 }))
            .await
            .unwrap();
        sequencer.queue.push(sequencer.tx_rx.recv().await.unwrap());
        let first = sequencer.seal_batch(100).await.unwrap().unwrap();

        sequencer.queue.push(signed(&kp, 1, LedgerInstruction::Burn { amount: 5 }));
        let second = sequencer.seal_batch(200).await.unwrap().unwrap();

        assert_eq!(sequencer.height(), 2);
        assert_eq!(second.header.prev_hash, first.hash());
        assert_eq!(storage.tip().unwrap(), 2);
        assert_eq!(storage.load_state().unwrap().unwrap(), *state.read().await);
        assert!(sequencer.seal_batch(300).await.unwrap().is_none());

        let (_tx, rx) = mpsc::channel(1);
        let restarted = SequencerService::new(state, storage, rx, Duration::from_millis(10)).unwrap();
        assert_eq!(restarted.height(), 2);
        assert_eq!(restarted.last_batch_hash, second.hash());
    }

    #[test]
    fn wrong_nonce_leaves_no_account_behind() {
        let kp = generate_keypair();
        let stranger = generate_keypair();
        let mut state = funded(&kp, 1_000);
        let txs = vec![
            signed(&kp, 0, LedgerInstruction::Burn { amount: 1 }),
            signed(&stranger, 4, LedgerInstruction::ClaimRewards),
        ];

        let batch = build_batch(&mut state, txs, 1, [0u8; 32], 100).unwrap();
        assert_eq!(batch.transactions.len(), 1);
        assert!(!state.ledger.accounts.contains_key(&address_of(&stranger)));
    }

    #[tokio::test]
    async fn storage_failure_leaves_live_state_untouched() {
        let kp = generate_keypair();
        let genesis = funded(&kp, 1_000);
        let state = Arc::new(RwLock::new(genesis.clone()));
        let storage = Arc::new(Storage::new(BrokenBackend));
        let (_tx_sender, tx_rx) = mpsc::channel(16);
        let mut sequencer = SequencerService::new(state.clone(), storage, tx_rx, Duration::from_millis(10)).unwrap();

        sequencer.queue.push(signed(&kp, 0, LedgerInstruction::Burn { amount: 10 }));
        assert!(sequencer.seal_batch(100).await.is_err());

        assert_eq!(*state.read().await, genesis);
        assert_eq!(sequencer.height(), 0);
        assert_eq!(sequencer.last_batch_hash, [0u8; 32]);
        assert_eq!(sequencer.queue.len(), 1);
    }

    #[tokio::test]
    async fn batch_timestamps_never_go_backwards() {
        let kp = generate_keypair();
        let state = Arc::new(RwLock::new(funded(&kp, 1_000)));
        let storage = Arc::new(Storage::new(MemoryBackend::default()));
        let (_tx_sender, tx_rx) = mpsc::channel(16);
        let mut sequencer = SequencerService::new(state, storage.clone(), tx_rx, Duration::from_millis(10)).unwrap();

        sequencer.queue.push(signed(&kp, 0, LedgerInstruction::Burn { amount: 1 }));
        sequencer.seal_batch(500).await.unwrap().unwrap();
        sequencer.queue.push(signed(&kp, 1, LedgerInstruction::Burn { amount: 1 }));
        let second = sequencer.seal_batch(400).await.unwrap().unwrap();
        assert_eq!(second.header.timestamp, 500);

        let (_tx, rx) = mpsc::channel(1);
        let restarted = SequencerService::new(Arc::new(RwLock::new(GlobalState::default())), storage, rx, Duration::from_millis(10)).unwrap();
        assert_eq!(restarted.last_timestamp, 500);
    }

    #[tokio::test]
    async fn shutdown_seals_queued_transactions() {
        let kp = generate_keypair();
        let state = Arc::new(RwLock::new(funded(&kp, 1_000)));
        let storage = Arc::new(Storage::new(MemoryBackend::default()));
        let (tx_sender, tx_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sequencer = SequencerService::new(state.clone(), storage.clone(), tx_rx, Duration::from_secs(3600)).unwrap();

        tx_sender
            .send(signed(&kp, 0, LedgerInstruction::Burn { amount: 10 }))
            .await
            .unwrap();
        tx_sender
            .send(signed(&kp, 1, LedgerInstruction::Burn { amount: 5 }))
            .await
            .unwrap();

        let handle = tokio::spawn(sequencer.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(tx_sender.is_closed());
        assert_eq!(state.read().await.ledger.total_supply, 985);
        assert!(storage.tip().unwrap() >= 1);
        assert_eq!(storage.load_state().unwrap().unwrap(), *state.read().await);
    }
}
