use crate::address::{is_system_address, Address, LEDGER_ADDRESS};
use crate::instruction::{DestinationCategory, ProposalAction};
use crate::params::*;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ══════════════════════════════════════════════════════════════
// Capabilities
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// Parameter changes, reporter grants, minting.
    Admin,
    /// May submit the five externally sourced subindices.
    Reporter,
    /// Sole writer of the good-spend subindex and registry receipts.
    LedgerWriter,
    /// May register and remove destinations.
    RegistryAuthority,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    grants: BTreeMap<Address, BTreeSet<Role>>,
}

impl Capabilities {
    pub fn has(&self, who: &Address, role: Role) -> bool {
        self.grants.get(who).map_or(false, |roles| roles.contains(&role))
    }

    pub fn grant(&mut self, who: Address, role: Role) -> bool {
        self.grants.entry(who).or_default().insert(role)
    }

    pub fn revoke(&mut self, who: &Address, role: Role) -> bool {
        let Some(roles) = self.grants.get_mut(who) else {
            return false;
        };
        let removed = roles.remove(&role);
        if roles.is_empty() {
            self.grants.remove(who);
        }
        removed
    }

    pub fn holders(&self, role: Role) -> Vec<Address> {
        self.grants
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(who, _)| *who)
            .collect()
    }
}

// ══════════════════════════════════════════════════════════════
// Ledger
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: u128,
    /// Accrual already accounted for at the last settlement.
    pub reward_debt: u128,
    pub pending_rewards: u128,
    pub allowances: BTreeMap<Address, u128>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GoodSpendWindow {
    pub start: u64,
    pub volume: u128,
    pub duration: u64,
    pub target: u128,
}

impl Default for GoodSpendWindow {
    fn default() -> Self {
        Self {
            start: 0,
            volume: 0,
            duration: GOOD_SPEND_WINDOW_SECS,
            target: DEFAULT_GOOD_SPEND_TARGET,
        }
    }
}

impl GoodSpendWindow {
    pub fn expired(&self, now: u64) -> bool {
        now >= self.start.saturating_add(self.duration)
    }

    /// Window volume scaled against the target, clamped to the score range.
    pub fn score(&self) -> u16 {
        if self.target == 0 {
            return MAX_SCORE;
        }
        let scaled = U256::from(self.volume) * U256::from(MAX_SCORE) / U256::from(self.target);
        if scaled >= U256::from(MAX_SCORE) {
            MAX_SCORE
        } else {
            scaled.low_u32() as u16
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub accounts: BTreeMap<Address, AccountState>,
    pub total_supply: u128,
    pub rewards_pool: u128,
    /// Rewards per token scaled by `PRECISION`. Never decreases.
    pub acc_rewards_per_token: U256,
    pub total_distributed: u128,
    pub total_bonus_minted: u128,
    pub fee_rate_bps: u16,
    pub good_spend_bonus_bps: u16,
    pub fee_exempt: BTreeSet<Address>,
    pub good_spend: GoodSpendWindow,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            accounts: BTreeMap::new(),
            total_supply: 0,
            rewards_pool: 0,
            acc_rewards_per_token: U256::zero(),
            total_distributed: 0,
            total_bonus_minted: 0,
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            good_spend_bonus_bps: DEFAULT_GOOD_SPEND_BONUS_BPS,
            fee_exempt: BTreeSet::from([LEDGER_ADDRESS]),
            good_spend: GoodSpendWindow::default(),
        }
    }
}

/// `balance * acc / PRECISION`, floored. `None` if it does not fit an amount.
pub fn accrued_rewards(balance: u128, acc_rewards_per_token: U256) -> Option<u128> {
    let owed = U256::from(balance).checked_mul(acc_rewards_per_token)? / U256::from(PRECISION);
    if owed > U256::from(u128::MAX) {
        None
    } else {
        Some(owed.low_u128())
    }
}

impl LedgerState {
    pub fn balance_of(&self, who: &Address) -> u128 {
        self.accounts.get(who).map_or(0, |a| a.balance)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.accounts
            .get(owner)
            .and_then(|a| a.allowances.get(spender).copied())
            .unwrap_or(0)
    }

    pub fn nonce_of(&self, who: &Address) -> u64 {
        self.accounts.get(who).map_or(0, |a| a.nonce)
    }

    /// Supply held by anyone other than the ledger itself.
    pub fn circulating_supply(&self) -> u128 {
        self.total_supply.saturating_sub(self.balance_of(&LEDGER_ADDRESS))
    }

    pub fn is_fee_exempt(&self, who: &Address) -> bool {
        self.fee_exempt.contains(who)
    }

    /// Claimable amount including accrual not yet settled. Read-only.
    pub fn pending_rewards(&self, who: &Address) -> u128 {
        if is_system_address(who) {
            return 0;
        }
        let Some(account) = self.accounts.get(who) else {
            return 0;
        };
        let owed = accrued_rewards(account.balance, self.acc_rewards_per_token).unwrap_or(u128::MAX);
        account
            .pending_rewards
            .saturating_add(owed.saturating_sub(account.reward_debt))
    }

    /// Sum of every account balance, the ledger's own holding included.
    pub fn sum_of_balances(&self) -> u128 {
        self.accounts.values().map(|a| a.balance).sum()
    }
}

// ══════════════════════════════════════════════════════════════
// Composite index
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubIndex {
    pub id: u8,
    pub name: String,
    pub weight_bps: u16,
    pub score: u16,
    pub last_updated: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompositeIndexState {
    pub sub_indices: Vec<SubIndex>,
    /// Last published composite value.
    pub composite: u16,
    pub last_updated: u64,
}

impl Default for CompositeIndexState {
    fn default() -> Self {
        let sub_indices: Vec<SubIndex> = SUB_INDEX_CATALOGUE
            .iter()
            .enumerate()
            .map(|(id, (name, weight_bps))| SubIndex {
                id: id as u8,
                name: name.to_string(),
                weight_bps: *weight_bps,
                score: INITIAL_SCORE,
                last_updated: 0,
            })
            .collect();
        let mut state = Self {
            sub_indices,
            composite: 0,
            last_updated: 0,
        };
        state.composite = state.composite_index();
        state
    }
}

impl CompositeIndexState {
    /// `floor(Σ score·weight / 10000)`, always within `[0, 1000]`.
    pub fn composite_index(&self) -> u16 {
        let weighted: u128 = self
            .sub_indices
            .iter()
            .map(|s| s.score as u128 * s.weight_bps as u128)
            .sum();
        (weighted / BPS_DENOMINATOR) as u16
    }

    pub fn sub_index(&self, id: u8) -> Option<&SubIndex> {
        self.sub_indices.get(id as usize)
    }

    /// Reward amplification in bps: 10 000 at the neutral index, 20 000 at the maximum.
    pub fn amplification_bps(&self) -> u128 {
        self.composite_index() as u128 * BPS_DENOMINATOR / NEUTRAL_INDEX
    }
}

// ══════════════════════════════════════════════════════════════
// Destination registry
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Destination {
    pub address: Address,
    pub registered: bool,
    pub name: String,
    pub category: DestinationCategory,
    pub total_received: u128,
    pub registered_at: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RegistryState {
    pub destinations: BTreeMap<Address, Destination>,
    /// Every address ever registered, in first-registration order.
    pub order: Vec<Address>,
    pub total_good_spend: u128,
}

impl RegistryState {
    pub fn is_good_destination(&self, who: &Address) -> bool {
        self.destinations.get(who).map_or(false, |d| d.registered)
    }

    pub fn destination(&self, who: &Address) -> Option<&Destination> {
        self.destinations.get(who)
    }

    pub fn list(&self) -> Vec<&Destination> {
        self.order
            .iter()
            .filter_map(|a| self.destinations.get(a))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.destinations.values().filter(|d| d.registered).count()
    }
}

// ══════════════════════════════════════════════════════════════
// Governance
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Active,
    Passed,
    Failed,
    Executed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub action: ProposalAction,
    pub description: String,
    pub for_votes: u128,
    pub against_votes: u128,
    pub start_time: u64,
    pub end_time: u64,
    pub executed: bool,
    /// Outcome fixed at execution time.
    pub passed: bool,
}

impl Proposal {
    pub fn quorum_reached(&self, circulating: u128, quorum_bps: u16) -> bool {
        let cast = U256::from(self.for_votes) + U256::from(self.against_votes);
        cast * U256::from(BPS_DENOMINATOR) >= U256::from(circulating) * U256::from(quorum_bps)
    }

    /// Quorum plus strict majority; ties fail.
    pub fn outcome(&self, circulating: u128, quorum_bps: u16) -> bool {
        self.quorum_reached(circulating, quorum_bps) && self.for_votes > self.against_votes
    }

    pub fn status(&self, now: u64, circulating: u128, quorum_bps: u16) -> ProposalStatus {
        if self.executed {
            return if self.passed {
                ProposalStatus::Executed
            } else {
                ProposalStatus::Failed
            };
        }
        if now <= self.end_time {
            return ProposalStatus::Active;
        }
        if self.outcome(circulating, quorum_bps) {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Failed
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GovernanceParams {
    pub proposal_threshold: u128,
    pub voting_period: u64,
    pub quorum_bps: u16,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            proposal_threshold: DEFAULT_PROPOSAL_THRESHOLD,
            voting_period: DEFAULT_VOTING_PERIOD_SECS,
            quorum_bps: DEFAULT_QUORUM_BPS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GovernanceState {
    pub proposals: BTreeMap<u64, Proposal>,
    /// Number of proposals ever created; also the last assigned id.
    pub proposal_count: u64,
    pub voters: BTreeMap<u64, BTreeSet<Address>>,
    pub params: GovernanceParams,
}

impl GovernanceState {
    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn has_voted(&self, id: u64, voter: &Address) -> bool {
        self.voters.get(&id).map_or(false, |v| v.contains(voter))
    }
}

// ══════════════════════════════════════════════════════════════
// Whole-system state
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GlobalState {
    pub ledger: LedgerState,
    pub index: CompositeIndexState,
    pub registry: RegistryState,
    pub governance: GovernanceState,
    pub capabilities: Capabilities,
}

impl GlobalState {
    pub fn proposal_status(&self, id: u64, now: u64) -> Option<ProposalStatus> {
        self.governance.proposal(id).map(|p| {
            p.status(
                now,
                self.ledger.circulating_supply(),
                self.governance.params.quorum_bps,
            )
        })
    }

    pub fn root_hash(&self) -> [u8; 32] {
        let bytes = bincode::serialize(self).expect("state serialization");
        *blake3::hash(&bytes).as_bytes()
    }
}
