//! JSON shapes served by the API. Addresses are hex strings.

use lef_types::address::{format_address, Address};
use lef_types::instruction::ProposalAction;
use lef_types::state::{Destination, GlobalState, GoodSpendWindow, Proposal, ProposalStatus, Role, SubIndex};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccountView {
    pub address: String,
    pub nonce: u64,
    pub balance: u128,
    pub pending_rewards: u128,
    pub fee_exempt: bool,
    pub good_destination: bool,
}

impl AccountView {
    pub fn build(state: &GlobalState, who: &Address) -> Self {
        Self {
            address: format_address(who),
            nonce: state.ledger.nonce_of(who),
            balance: state.ledger.balance_of(who),
            pending_rewards: state.ledger.pending_rewards(who),
            fee_exempt: state.ledger.is_fee_exempt(who),
            good_destination: state.registry.is_good_destination(who),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexView {
    pub composite: u16,
    pub amplification_bps: u128,
    pub last_updated: u64,
    pub good_spend_window: GoodSpendWindow,
}

impl IndexView {
    pub fn build(state: &GlobalState) -> Self {
        Self {
            composite: state.index.composite_index(),
            amplification_bps: state.index.amplification_bps(),
            last_updated: state.index.last_updated,
            good_spend_window: state.ledger.good_spend.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubIndicesView {
    pub sub_indices: Vec<SubIndex>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DestinationView {
    pub address: String,
    pub name: String,
    pub category: String,
    pub registered: bool,
    pub total_received: u128,
    pub registered_at: u64,
}

impl From<&Destination> for DestinationView {
    fn from(d: &Destination) -> Self {
        Self {
            address: format_address(&d.address),
            name: d.name.clone(),
            category: d.category.as_str().to_string(),
            registered: d.registered,
            total_received: d.total_received,
            registered_at: d.registered_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegistryView {
    pub active: usize,
    pub total_good_spend: u128,
    /// Registration order, removed entries included.
    pub destinations: Vec<DestinationView>,
}

impl RegistryView {
    pub fn build(state: &GlobalState) -> Self {
        Self {
            active: state.registry.active_count(),
            total_good_spend: state.registry.total_good_spend,
            destinations: state.registry.list().into_iter().map(DestinationView::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProposalView {
    pub id: u64,
    pub proposer: String,
    pub kind: String,
    pub destination: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: String,
    pub for_votes: u128,
    pub against_votes: u128,
    pub start_time: u64,
    pub end_time: u64,
    pub executed: bool,
    pub status: ProposalStatus,
}

impl ProposalView {
    pub fn build(proposal: &Proposal, status: ProposalStatus) -> Self {
        let (kind, name, category) = match &proposal.action {
            ProposalAction::AddDestination { name, category, .. } => {
                ("add", Some(name.clone()), Some(category.as_str().to_string()))
            }
            ProposalAction::RemoveDestination { .. } => ("remove", None, None),
        };
        Self {
            id: proposal.id,
            proposer: format_address(&proposal.proposer),
            kind: kind.to_string(),
            destination: format_address(proposal.action.destination()),
            name,
            category,
            description: proposal.description.clone(),
            for_votes: proposal.for_votes,
            against_votes: proposal.against_votes,
            start_time: proposal.start_time,
            end_time: proposal.end_time,
            executed: proposal.executed,
            status,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LedgerView {
    pub total_supply: u128,
    pub circulating_supply: u128,
    pub rewards_pool: u128,
    pub total_distributed: u128,
    pub total_bonus_minted: u128,
    /// Decimal string; exceeds the JSON number range.
    pub acc_rewards_per_token: String,
    pub fee_rate_bps: u16,
    pub good_spend_bonus_bps: u16,
    pub proposal_count: u64,
    pub proposal_threshold: u128,
    pub voting_period: u64,
    pub quorum_bps: u16,
    pub admins: Vec<String>,
    pub registry_authorities: Vec<String>,
    pub reporters: Vec<String>,
}

impl LedgerView {
    pub fn build(state: &GlobalState) -> Self {
        let ledger = &state.ledger;
        let params = &state.governance.params;
        let holders = |role| state.capabilities.holders(role).iter().map(format_address).collect();
        Self {
            total_supply: ledger.total_supply,
            circulating_supply: ledger.circulating_supply(),
            rewards_pool: ledger.rewards_pool,
            total_distributed: ledger.total_distributed,
            total_bonus_minted: ledger.total_bonus_minted,
            acc_rewards_per_token: ledger.acc_rewards_per_token.to_string(),
            fee_rate_bps: ledger.fee_rate_bps,
            good_spend_bonus_bps: ledger.good_spend_bonus_bps,
            proposal_count: state.governance.proposal_count,
            proposal_threshold: params.proposal_threshold,
            voting_period: params.voting_period,
            quorum_bps: params.quorum_bps,
            admins: holders(Role::Admin),
            registry_authorities: holders(Role::RegistryAuthority),
            reporters: holders(Role::Reporter),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubmitResponse {
    pub accepted: bool,
    pub tx_id: String,
    pub error: Option<String>,
}
