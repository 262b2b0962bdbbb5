//! Token accounting: balances, fee routing, reward accrual and claims.
//!
//! Rewards use the accumulator pattern. `acc_rewards_per_token` grows by
//! `distribution * PRECISION / circulating_supply` whenever fees are distributed,
//! and each account keeps a `reward_debt` snapshot of `balance * acc / PRECISION`
//! taken at its last settlement. The difference is what the account has earned
//! since then. Every balance change settles the affected accounts first and
//! re-snapshots them afterwards.
//!
//! Functions here mutate in place and may fail part way through; callers go
//! through [`crate::execute_instruction`], which discards the partial state.

use crate::capability::require;
use crate::error::{LedgerError, Result};
use crate::{index, registry};
use lef_types::address::{is_system_address, Address, LEDGER_ADDRESS, NULL_ADDRESS};
use lef_types::params::{
    BPS_DENOMINATOR, MAX_FEE_RATE_BPS, MAX_GOOD_SPEND_BONUS_BPS, NEUTRAL_INDEX, PRECISION,
};
use lef_types::state::{accrued_rewards, GlobalState, LedgerState, Role};
use primitive_types::U256;
use tracing::{debug, info};

/// What a single transfer did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReceipt {
    pub net_amount: u128,
    pub fee: u128,
    pub good_spend: bool,
    /// Fee plus any bonus minted on top of it.
    pub distributed: u128,
}

// ══════════════════════════════════════════════════════════════
// Balance primitives
// ══════════════════════════════════════════════════════════════

fn debit(ledger: &mut LedgerState, who: &Address, amount: u128) -> Result<()> {
    let available = ledger.balance_of(who);
    if amount > available {
        return Err(LedgerError::InsufficientBalance { needed: amount, available });
    }
    if amount > 0 {
        ledger.accounts.entry(*who).or_default().balance = available - amount;
    }
    Ok(())
}

fn credit(ledger: &mut LedgerState, who: &Address, amount: u128) -> Result<()> {
    let account = ledger.accounts.entry(*who).or_default();
    account.balance = account.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
    Ok(())
}

/// Issues new supply. No fee or reward logic.
pub fn mint(ledger: &mut LedgerState, to: &Address, amount: u128) -> Result<()> {
    if *to == NULL_ADDRESS {
        return Err(LedgerError::ZeroAddress);
    }
    ledger.total_supply = ledger.total_supply.checked_add(amount).ok_or(LedgerError::Overflow)?;
    credit(ledger, to, amount)
}

/// Destroys supply. No fee or reward logic.
pub fn burn(ledger: &mut LedgerState, from: &Address, amount: u128) -> Result<()> {
    debit(ledger, from, amount)?;
    ledger.total_supply -= amount;
    Ok(())
}

pub fn admin_mint(state: &mut GlobalState, caller: &Address, to: &Address, amount: u128) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    mint(&mut state.ledger, to, amount)?;
    info!(to = %hex::encode(to), amount, "minted");
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Reward accrual
// ══════════════════════════════════════════════════════════════

fn accrued(ledger: &LedgerState, balance: u128) -> Result<u128> {
    accrued_rewards(balance, ledger.acc_rewards_per_token).ok_or(LedgerError::Overflow)
}

/// Moves accrual since the last snapshot into `pending_rewards`. Idempotent.
pub fn settle_rewards(ledger: &mut LedgerState, who: &Address) -> Result<()> {
    if is_system_address(who) {
        return Ok(());
    }
    let balance = ledger.balance_of(who);
    let owed = accrued(ledger, balance)?;
    let account = ledger.accounts.entry(*who).or_default();
    if owed > account.reward_debt {
        let earned = owed - account.reward_debt;
        account.pending_rewards = account
            .pending_rewards
            .checked_add(earned)
            .ok_or(LedgerError::Overflow)?;
        account.reward_debt = owed;
        debug!(account = %hex::encode(who), earned, "rewards settled");
    }
    Ok(())
}

/// Re-snapshots the debt from the current balance so accrual restarts at zero.
fn sync_reward_debt(ledger: &mut LedgerState, who: &Address) -> Result<()> {
    if is_system_address(who) {
        return Ok(());
    }
    let owed = accrued(ledger, ledger.balance_of(who))?;
    ledger.accounts.entry(*who).or_default().reward_debt = owed;
    Ok(())
}

/// Adds a fee to the pool, amplified by the composite index.
///
/// `amplified = fee * L / 500`; anything above the fee is minted to the ledger
/// as bonus. Returns the total distribution.
pub fn distribute_to_rewards_pool(state: &mut GlobalState, fee: u128) -> Result<u128> {
    let composite = state.index.composite_index() as u128;
    let amplified = fee.checked_mul(composite).ok_or(LedgerError::Overflow)? / NEUTRAL_INDEX;
    let bonus = amplified.saturating_sub(fee);

    let ledger = &mut state.ledger;
    if bonus > 0 {
        mint(ledger, &LEDGER_ADDRESS, bonus)?;
        ledger.total_bonus_minted = ledger.total_bonus_minted.checked_add(bonus).ok_or(LedgerError::Overflow)?;
    }

    let total = fee + bonus;
    ledger.rewards_pool = ledger.rewards_pool.checked_add(total).ok_or(LedgerError::Overflow)?;
    ledger.total_distributed = ledger.total_distributed.checked_add(total).ok_or(LedgerError::Overflow)?;

    let circulating = ledger.circulating_supply();
    if circulating > 0 {
        let increment = U256::from(total)
            .checked_mul(U256::from(PRECISION))
            .ok_or(LedgerError::Overflow)?
            / U256::from(circulating);
        ledger.acc_rewards_per_token = ledger
            .acc_rewards_per_token
            .checked_add(increment)
            .ok_or(LedgerError::Overflow)?;
    }

    debug!(fee, bonus, composite, circulating, "fee distributed");
    Ok(total)
}

// ══════════════════════════════════════════════════════════════
// Transfers
// ══════════════════════════════════════════════════════════════

fn bps_of(amount: u128, bps: u16) -> Result<u128> {
    Ok(amount.checked_mul(bps as u128).ok_or(LedgerError::Overflow)? / BPS_DENOMINATOR)
}

/// Base fee plus, for good-spend recipients, the bonus fee. Each part is
/// floored on its own; remainders stay with the payer.
pub fn compute_fee(ledger: &LedgerState, from: &Address, to: &Address, amount: u128, good_spend: bool) -> Result<u128> {
    if ledger.is_fee_exempt(from) || ledger.is_fee_exempt(to) {
        return Ok(0);
    }
    let mut fee = bps_of(amount, ledger.fee_rate_bps)?;
    if good_spend {
        fee += bps_of(amount, ledger.good_spend_bonus_bps)?;
    }
    Ok(fee)
}

pub fn transfer(state: &mut GlobalState, from: &Address, to: &Address, amount: u128, now: u64) -> Result<TransferReceipt> {
    let available = state.ledger.balance_of(from);
    if *from != NULL_ADDRESS && amount > available {
        return Err(LedgerError::InsufficientBalance { needed: amount, available });
    }

    if *from == NULL_ADDRESS {
        mint(&mut state.ledger, to, amount)?;
        return Ok(TransferReceipt { net_amount: amount, ..Default::default() });
    }
    if *to == NULL_ADDRESS {
        burn(&mut state.ledger, from, amount)?;
        return Ok(TransferReceipt { net_amount: amount, ..Default::default() });
    }

    settle_rewards(&mut state.ledger, from)?;
    settle_rewards(&mut state.ledger, to)?;

    let good_spend = state.registry.is_good_destination(to);
    let fee = compute_fee(&state.ledger, from, to, amount, good_spend)?;
    let net_amount = amount - fee;

    debit(&mut state.ledger, from, amount)?;
    credit(&mut state.ledger, to, net_amount)?;

    let mut distributed = 0;
    if fee > 0 {
        credit(&mut state.ledger, &LEDGER_ADDRESS, fee)?;
        distributed = distribute_to_rewards_pool(state, fee)?;
    }

    if good_spend {
        record_good_spend(state, to, net_amount, now)?;
    }

    sync_reward_debt(&mut state.ledger, from)?;
    sync_reward_debt(&mut state.ledger, to)?;

    info!(
        from = %hex::encode(from),
        to = %hex::encode(to),
        amount,
        fee,
        good_spend,
        "transfer"
    );
    Ok(TransferReceipt { net_amount, fee, good_spend, distributed })
}

pub fn approve(ledger: &mut LedgerState, owner: &Address, spender: Address, amount: u128) -> Result<()> {
    if spender == NULL_ADDRESS {
        return Err(LedgerError::ZeroAddress);
    }
    let allowances = &mut ledger.accounts.entry(*owner).or_default().allowances;
    if amount == 0 {
        allowances.remove(&spender);
    } else {
        allowances.insert(spender, amount);
    }
    Ok(())
}

pub fn transfer_from(
    state: &mut GlobalState,
    spender: &Address,
    from: &Address,
    to: &Address,
    amount: u128,
    now: u64,
) -> Result<TransferReceipt> {
    let allowed = state.ledger.allowance(from, spender);
    if amount > allowed {
        return Err(LedgerError::InsufficientAllowance { needed: amount, available: allowed });
    }
    approve(&mut state.ledger, from, *spender, allowed - amount)?;
    transfer(state, from, to, amount, now)
}

// ══════════════════════════════════════════════════════════════
// Good-spend window
// ══════════════════════════════════════════════════════════════

/// Registry bookkeeping, rolling-window update and good-spend subindex resubmission.
fn record_good_spend(state: &mut GlobalState, destination: &Address, amount: u128, now: u64) -> Result<()> {
    registry::record_good_spend(
        &mut state.registry,
        &state.capabilities,
        &LEDGER_ADDRESS,
        destination,
        amount,
    )?;

    let window = &mut state.ledger.good_spend;
    if window.expired(now) {
        window.volume = 0;
        window.start = now;
    }
    window.volume = window.volume.checked_add(amount).ok_or(LedgerError::Overflow)?;
    let score = window.score();

    index::submit_good_spend(&mut state.index, &state.capabilities, &LEDGER_ADDRESS, score, now)?;
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Claims
// ══════════════════════════════════════════════════════════════

pub fn claim_rewards(state: &mut GlobalState, caller: &Address) -> Result<u128> {
    let ledger = &mut state.ledger;
    settle_rewards(ledger, caller)?;

    let amount = ledger.accounts.get(caller).map_or(0, |a| a.pending_rewards);
    if amount == 0 || is_system_address(caller) {
        return Err(LedgerError::NoRewards);
    }

    ledger.rewards_pool = ledger.rewards_pool.checked_sub(amount).ok_or(LedgerError::Overflow)?;
    ledger.accounts.entry(*caller).or_default().pending_rewards = 0;

    // Payout is not a market transfer: no fee, no settlement of the ledger.
    debit(ledger, &LEDGER_ADDRESS, amount)?;
    credit(ledger, caller, amount)?;
    sync_reward_debt(ledger, caller)?;

    info!(account = %hex::encode(caller), amount, "rewards claimed");
    Ok(amount)
}

// ══════════════════════════════════════════════════════════════
// Administration
// ══════════════════════════════════════════════════════════════

pub fn set_fee_rate(state: &mut GlobalState, caller: &Address, bps: u16) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    if bps > MAX_FEE_RATE_BPS {
        return Err(LedgerError::InvalidParameter("fee rate above maximum"));
    }
    state.ledger.fee_rate_bps = bps;
    info!(bps, "fee rate updated");
    Ok(())
}

pub fn set_good_spend_bonus(state: &mut GlobalState, caller: &Address, bps: u16) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    if bps > MAX_GOOD_SPEND_BONUS_BPS {
        return Err(LedgerError::InvalidParameter("good-spend bonus above maximum"));
    }
    state.ledger.good_spend_bonus_bps = bps;
    info!(bps, "good-spend bonus updated");
    Ok(())
}

pub fn set_fee_exempt(state: &mut GlobalState, caller: &Address, account: Address, exempt: bool) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    if exempt {
        state.ledger.fee_exempt.insert(account);
    } else {
        state.ledger.fee_exempt.remove(&account);
    }
    info!(account = %hex::encode(account), exempt, "fee exemption updated");
    Ok(())
}

pub fn set_good_spend_target(state: &mut GlobalState, caller: &Address, volume: u128) -> Result<()> {
    require(&state.capabilities, caller, Role::Admin)?;
    if volume == 0 {
        return Err(LedgerError::InvalidParameter("good-spend target must be positive"));
    }
    state.ledger.good_spend.target = volume;
    info!(volume, "good-spend target updated");
    Ok(())
}
