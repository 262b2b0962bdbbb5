pub mod capability;
pub mod error;
pub mod governance;
pub mod index;
pub mod ledger;
pub mod registry;


pub use error::{ErrorKind, LedgerError};

use lef_crypto::signatures::verify_signature;
use lef_types::address::Address;
use lef_types::instruction::{LedgerInstruction, ProposalAction};
use lef_types::state::GlobalState;
use lef_types::transaction::Transaction;

pub struct ExecutionContext<'a> {
    pub state: &'a mut GlobalState,
    pub height: u64,
    /// Ambient clock, in seconds.
    pub timestamp: u64,
}

/// Verifies the envelope, consumes the nonce, then runs the instruction atomically.
///
/// A rejected instruction still consumes the nonce.
pub fn execute_transaction(tx: &Transaction, ctx: &mut ExecutionContext) -> Result<(), LedgerError> {
    verify_signature(&tx.sender, &tx.signing_bytes(), &tx.signature)
        .map_err(|_| LedgerError::InvalidSignature)?;

    let expected = ctx.state.ledger.nonce_of(&tx.sender);
    if tx.nonce != expected {
        return Err(LedgerError::InvalidNonce { expected, got: tx.nonce });
    }
    ctx.state.ledger.accounts.entry(tx.sender).or_default().nonce += 1;

    execute_instruction(&tx.instruction, &tx.sender, ctx)
}

/// Runs one instruction all-or-nothing: it executes against a scratch copy
/// that replaces the live state only on success.
pub fn execute_instruction(
    instruction: &LedgerInstruction,
    sender: &Address,
    ctx: &mut ExecutionContext,
) -> Result<(), LedgerError> {
    let mut scratch = ctx.state.clone();
    apply(instruction, sender, &mut scratch, ctx.timestamp)?;
    *ctx.state = scratch;
    Ok(())
}

fn apply(instruction: &LedgerInstruction, sender: &Address, state: &mut GlobalState, now: u64) -> Result<(), LedgerError> {
    use LedgerInstruction::*;
    match instruction {
        Transfer { to, amount } => ledger::transfer(state, sender, to, *amount, now).map(drop),
        Approve { spender, amount } => ledger::approve(&mut state.ledger, sender, *spender, *amount),
        TransferFrom { from, to, amount } => {
            ledger::transfer_from(state, sender, from, to, *amount, now).map(drop)
        }
        Burn { amount } => ledger::burn(&mut state.ledger, sender, *amount),
        ClaimRewards => ledger::claim_rewards(state, sender).map(drop),

        SubmitSubIndex { id, score } => {
            index::submit_sub_index(&mut state.index, &state.capabilities, sender, *id, *score, now).map(drop)
        }

        RegisterDestination { destination, name, category } => registry::register(
            &mut state.registry,
            &state.capabilities,
            sender,
            *destination,
            name.clone(),
            *category,
            now,
        ),
        RemoveDestination { destination } => {
            registry::remove(&mut state.registry, &state.capabilities, sender, destination)
        }
        TransferRegistryAuthority { new_authority } => {
            capability::transfer_registry_authority(&mut state.capabilities, sender, *new_authority)
        }

        ProposeAddDestination { destination, name, category, description } => governance::propose(
            state,
            sender,
            ProposalAction::AddDestination {
                destination: *destination,
                name: name.clone(),
                category: *category,
            },
            description.clone(),
            now,
        )
        .map(drop),
        ProposeRemoveDestination { destination, description } => governance::propose(
            state,
            sender,
            ProposalAction::RemoveDestination { destination: *destination },
            description.clone(),
            now,
        )
        .map(drop),
        Vote { proposal_id, support } => governance::vote(state, sender, *proposal_id, *support, now).map(drop),
        Execute { proposal_id } => governance::execute(state, *proposal_id, now).map(drop),

        Mint { to, amount } => ledger::admin_mint(state, sender, to, *amount),
        GrantReporter { reporter } => capability::grant_reporter(&mut state.capabilities, sender, *reporter),
        RevokeReporter { reporter } => capability::revoke_reporter(&mut state.capabilities, sender, reporter),
        TransferAdmin { new_admin } => capability::transfer_admin(&mut state.capabilities, sender, *new_admin),
        SetFeeRate { bps } => ledger::set_fee_rate(state, sender, *bps),
        SetGoodSpendBonus { bps } => ledger::set_good_spend_bonus(state, sender, *bps),
        SetFeeExempt { account, exempt } => ledger::set_fee_exempt(state, sender, *account, *exempt),
        SetGoodSpendTarget { volume } => ledger::set_good_spend_target(state, sender, *volume),
        SetProposalThreshold { amount } => governance::set_proposal_threshold(state, sender, *amount),
        SetVotingPeriod { secs } => governance::set_voting_period(state, sender, *secs),
        SetQuorum { bps } => governance::set_quorum(state, sender, *bps),
    }
}
