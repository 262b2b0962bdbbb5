//! Rejection reasons for ledger operations.

use lef_types::state::Role;
use serde::Serialize;
use thiserror::Error;

/// Coarse classification used by callers that only care about the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Authorization,
    Validation,
    InsufficientFunds,
    TemporalState,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("caller lacks the {0:?} capability")]
    Unauthorized(Role),

    #[error("invalid transaction signature")]
    InvalidSignature,

    #[error("subindex {0} cannot be written by this caller")]
    InvalidSubIndex(u8),

    #[error("score {0} exceeds 1000")]
    ScoreOutOfRange(u16),

    #[error("zero address")]
    ZeroAddress,

    #[error("destination already registered")]
    AlreadyRegistered,

    #[error("destination not registered")]
    NotRegistered,

    #[error("recipient is not a registered good-spend destination")]
    NotAGoodDestination,

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: u128, available: u128 },

    #[error("no rewards to claim")]
    NoRewards,

    #[error("balance {balance} below proposal threshold {threshold}")]
    BelowThreshold { balance: u128, threshold: u128 },

    #[error("proposal {0} not found")]
    ProposalNotFound(u64),

    #[error("no voting power")]
    NoVotingPower,

    #[error("voting on proposal {0} has ended")]
    VotingEnded(u64),

    #[error("voting on proposal {0} has not ended")]
    VotingNotEnded(u64),

    #[error("already voted on proposal {0}")]
    AlreadyVoted(u64),

    #[error("proposal {0} already executed")]
    AlreadyExecuted(u64),

    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        use LedgerError::*;
        match self {
            Unauthorized(_) | InvalidSignature => ErrorKind::Authorization,
            InvalidSubIndex(_)
            | ScoreOutOfRange(_)
            | ZeroAddress
            | AlreadyRegistered
            | NotRegistered
            | NotAGoodDestination
            | InvalidParameter(_)
            | Overflow
            | BelowThreshold { .. }
            | ProposalNotFound(_)
            | NoVotingPower => ErrorKind::Validation,
            InsufficientBalance { .. } | InsufficientAllowance { .. } | NoRewards => {
                ErrorKind::InsufficientFunds
            }
            VotingEnded(_) | VotingNotEnded(_) | AlreadyVoted(_) | AlreadyExecuted(_) | InvalidNonce { .. } => {
                ErrorKind::TemporalState
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
