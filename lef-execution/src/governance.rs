//! Token-weighted proposals over the destination registry.
//!
//! Vote weight is the voter's balance at the moment of voting. Tokens moved
//! to another address after voting can vote again from there; there is no
//! snapshot at proposal creation.

use crate::capability::require;
use crate::error::{LedgerError, Result};
use crate::registry;
use lef_types::address::{Address, GOVERNANCE_ADDRESS, NULL_ADDRESS};
use lef_types::instruction::ProposalAction;
use lef_types::params::{MAX_QUORUM_BPS, MIN_VOTING_PERIOD_SECS};
use lef_types::state::{GlobalState, Proposal, ProposalStatus, Role};
use tracing::info;

pub fn propose(
    state: &mut GlobalState,
    proposer: &Address,
    action: ProposalAction,
    description: String,
    now: u64,
) -> Result<u64> {
    let balance = state.ledger.balance_of(proposer);
    let threshold = state.governance.params.proposal_threshold;
    if balance < threshold {
        return Err(LedgerError::BelowThreshold { balance, threshold });
    }

    match &action {
        ProposalAction::AddDestination { destination, .. } => {
            if *destination == NULL_ADDRESS {
                return Err(LedgerError::ZeroAddress);
            }
            if state.registry.is_good_destination(destination) {
                return Err(LedgerError::AlreadyRegistered);
            }
        }
        ProposalAction::RemoveDestination { destination } => {
            if !state.registry.is_good_destination(destination) {
                return Err(LedgerError::NotRegistered);
            }
        }
    }

    let gov = &mut state.governance;
    let id = gov.proposal_count.checked_add(1).ok_or(LedgerError::Overflow)?;
    let end_time = now.checked_add(gov.params.voting_period).ok_or(LedgerError::Overflow)?;
    gov.proposal_count = id;
    gov.proposals.insert(
        id,
        Proposal {
            id,
            proposer: *proposer,
            action,
            description,
            for_votes: 0,
            against_votes: 0,
            start_time: now,
            end_time,
            executed: false,
            passed: false,
        },
    );

    info!(id, proposer = %hex::encode(proposer), end_time, "proposal created");
    Ok(id)
}

/// Returns the weight counted.
pub fn vote(state: &mut GlobalState, voter: &Address, proposal_id: u64, support: bool, now: u64) -> Result<u128> {
    let weight = state.ledger.balance_of(voter);
    let gov = &mut state.governance;

    let proposal = gov
        .proposals
        .get_mut(&proposal_id)
        .ok_or(LedgerError::ProposalNotFound(proposal_id))?;
    if proposal.executed {
        return Err(LedgerError::AlreadyExecuted(proposal_id));
    }
    if now > proposal.end_time {
        return Err(LedgerError::VotingEnded(proposal_id));
    }
    if gov.voters.get(&proposal_id).map_or(false, |v| v.contains(voter)) {
        return Err(LedgerError::AlreadyVoted(proposal_id));
    }
    if weight == 0 {
        return Err(LedgerError::NoVotingPower);
    }

    let tally = if support {
        &mut proposal.for_votes
    } else {
        &mut proposal.against_votes
    };
    *tally = tally.checked_add(weight).ok_or(LedgerError::Overflow)?;
    gov.voters.entry(proposal_id).or_default().insert(*voter);

    info!(proposal_id, voter = %hex::encode(voter), support, weight, "vote cast");
    Ok(weight)
}

/// Permissionless once voting has closed. Returns the final status.
pub fn execute(state: &mut GlobalState, proposal_id: u64, now: u64) -> Result<ProposalStatus> {
    let circulating = state.ledger.circulating_supply();
    let quorum_bps = state.governance.params.quorum_bps;

    let proposal = state
        .governance
        .proposals
        .get(&proposal_id)
        .ok_or(LedgerError::ProposalNotFound(proposal_id))?;
    if now <= proposal.end_time {
        return Err(LedgerError::VotingNotEnded(proposal_id));
    }
    if proposal.executed {
        return Err(LedgerError::AlreadyExecuted(proposal_id));
    }

    let passed = proposal.outcome(circulating, quorum_bps);
    let action = proposal.action.clone();

    if passed {
        match action {
            ProposalAction::AddDestination { destination, name, category } => registry::register(
                &mut state.registry,
                &state.capabilities,
                &GOVERNANCE_ADDRESS,
                destination,
                name,
                category,
                now,
            )?,
            ProposalAction::RemoveDestination { destination } => registry::remove(
                &mut state.registry,
                &state.capabilities,
                &GOVERNANCE_ADDRESS,
                &destination,
            )?,
        }
    }

    if let Some(p) = state.governance.proposals.get_mut(&proposal_id) {
        p.executed = true;
        p.passed = passed;
    }

    let status = if passed {
        ProposalStatus::Executed
    } else {
        ProposalStatus::Failed
    };
    info!(proposal_id, ?status, "proposal executed");
    Ok(status)
}

pub fn set_proposal_threshold(state: &mut GlobalState, caller: &Address, amount: u128) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    state.governance.params.proposal_threshold = amount;
    info!(amount, "proposal threshold updated");
    Ok(())
}

pub fn set_voting_period(state: &mut GlobalState, caller: &Address, secs: u64) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    if secs < MIN_VOTING_PERIOD_SECS {
        return Err(LedgerError::InvalidParameter("voting period below minimum"));
    }
    state.governance.params.voting_period = secs;
    info!(secs, "voting period updated");
    Ok(())
}

pub fn set_quorum(state: &mut GlobalState, caller: &Address, bps: u16) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    if bps == 0 || bps > MAX_QUORUM_BPS {
        return Err(LedgerError::InvalidParameter("quorum outside allowed range"));
    }
    state.governance.params.quorum_bps = bps;
    info!(bps, "quorum updated");
    Ok(())
}
