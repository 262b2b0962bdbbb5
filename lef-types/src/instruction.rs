use crate::address::Address;
use serde::{Deserialize, Serialize};

/// Every operation an external actor can submit to LefCoin.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum LedgerInstruction {
    // ══════════════════════════════════════════════════════════════
    // Token movement & rewards
    // ══════════════════════════════════════════════════════════════
    Transfer { to: Address, amount: u128 },
    Approve { spender: Address, amount: u128 },
    TransferFrom { from: Address, to: Address, amount: u128 },
    Burn { amount: u128 },
    ClaimRewards,

    // ══════════════════════════════════════════════════════════════
    // Sentiment index
    // ══════════════════════════════════════════════════════════════
    SubmitSubIndex { id: u8, score: u16 },

    // ══════════════════════════════════════════════════════════════
    // Destination registry (authority-gated)
    // ══════════════════════════════════════════════════════════════
    RegisterDestination { destination: Address, name: String, category: DestinationCategory },
    RemoveDestination { destination: Address },
    TransferRegistryAuthority { new_authority: Address },

    // ══════════════════════════════════════════════════════════════
    // Governance
    // ══════════════════════════════════════════════════════════════
    ProposeAddDestination {
        destination: Address,
        name: String,
        category: DestinationCategory,
        description: String,
    },
    ProposeRemoveDestination { destination: Address, description: String },
    Vote { proposal_id: u64, support: bool },
    Execute { proposal_id: u64 },

    // ══════════════════════════════════════════════════════════════
    // Administration
    // ══════════════════════════════════════════════════════════════
    Mint { to: Address, amount: u128 },
    GrantReporter { reporter: Address },
    RevokeReporter { reporter: Address },
    TransferAdmin { new_admin: Address },
    SetFeeRate { bps: u16 },
    SetGoodSpendBonus { bps: u16 },
    SetFeeExempt { account: Address, exempt: bool },
    SetGoodSpendTarget { volume: u128 },
    SetProposalThreshold { amount: u128 },
    SetVotingPeriod { secs: u64 },
    SetQuorum { bps: u16 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DestinationCategory {
    Charity,
    Environment,
    Education,
    Health,
    Community,
    Other,
}

impl DestinationCategory {
    pub const ALL: [DestinationCategory; 6] = [
        DestinationCategory::Charity,
        DestinationCategory::Environment,
        DestinationCategory::Education,
        DestinationCategory::Health,
        DestinationCategory::Community,
        DestinationCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationCategory::Charity => "charity",
            DestinationCategory::Environment => "environment",
            DestinationCategory::Education => "education",
            DestinationCategory::Health => "health",
            DestinationCategory::Community => "community",
            DestinationCategory::Other => "other",
        }
    }
}

impl std::str::FromStr for DestinationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DestinationCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown destination category: {}", s))
    }
}

/// What a proposal does to the registry once it passes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ProposalAction {
    AddDestination { destination: Address, name: String, category: DestinationCategory },
    RemoveDestination { destination: Address },
}

impl ProposalAction {
    pub fn destination(&self) -> &Address {
        match self {
            ProposalAction::AddDestination { destination, .. } => destination,
            ProposalAction::RemoveDestination { destination } => destination,
        }
    }
}
