//! Signs reporter scores as `SubmitSubIndex` transactions and posts them to a node.

use crate::catalogue::{name_of, ScoreSet};
use anyhow::{anyhow, bail, Result};
use lef_crypto::signatures::{address_of, sign, SigningKey};
use lef_types::address::Address;
use lef_types::instruction::LedgerInstruction;
use lef_types::transaction::Transaction;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

pub struct ReporterClient {
    client: Client,
    node_url: String,
    key: SigningKey,
    dry_run: bool,
}

impl ReporterClient {
    pub fn new(node_url: &str, key: SigningKey, dry_run: bool) -> Self {
        Self {
            client: Client::new(),
            node_url: node_url.trim_end_matches('/').to_string(),
            key,
            dry_run,
        }
    }

    pub fn address(&self) -> Address {
        address_of(&self.key)
    }

    /// One signed transaction per score, with consecutive nonces from `first_nonce`.
    pub fn build_transactions(&self, scores: &ScoreSet, first_nonce: u64) -> Vec<Transaction> {
        scores
            .iter()
            .zip(first_nonce..)
            .map(|((id, score), nonce)| {
                let mut tx = Transaction {
                    sender: self.address(),
                    nonce,
                    instruction: LedgerInstruction::SubmitSubIndex { id, score },
                    signature: vec![],
                };
                tx.signature = sign(&self.key, &tx.signing_bytes());
                tx
            })
            .collect()
    }

    async fn fetch_nonce(&self) -> Result<u64> {
        let url = format!("{}/account/{}", self.node_url, hex::encode(self.address()));
        let account: Value = self.client.get(&url).send().await?.error_for_status()?.json().await?;
        account["nonce"].as_u64().ok_or_else(|| anyhow!("node returned no nonce"))
    }

    /// Submits every score in the set. Returns the ids of accepted transactions.
    pub async fn submit(&self, scores: &ScoreSet) -> Result<Vec<String>> {
        info!(composite = scores.off_chain_composite(), "off-chain composite over reported subindices");
        for (id, score) in scores.iter() {
            info!(id, name = name_of(id).unwrap_or("?"), score, "score");
        }
        if self.dry_run {
            info!("DRY RUN: not submitting");
            return Ok(Vec::new());
        }
        if scores.is_empty() {
            bail!("no scores to submit");
        }

        let nonce = self.fetch_nonce().await?;
        let mut accepted = Vec::new();
        for tx in self.build_transactions(scores, nonce) {
            let res: Value = self
                .client
                .post(format!("{}/tx", self.node_url))
                .json(&tx)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let tx_id = res["tx_id"].as_str().unwrap_or_default().to_string();
            if res["accepted"].as_bool() == Some(true) {
                accepted.push(tx_id);
            } else {
                warn!(tx = %tx_id, error = %res["error"], "submission refused");
            }
        }
        info!(accepted = accepted.len(), total = scores.len(), "scores submitted");
        Ok(accepted)
    }
}
