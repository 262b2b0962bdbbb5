//! Initial ledger state from a JSON genesis file.

use anyhow::{anyhow, bail, Context, Result};
use lef_execution::{capability, ledger, registry};
use lef_types::address::{parse_address, Address, GOVERNANCE_ADDRESS, LEDGER_ADDRESS, NULL_ADDRESS};
use lef_types::instruction::DestinationCategory;
use lef_types::params::*;
use lef_types::state::{GlobalState, Role};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Allocation {
    pub address: String,
    /// Base units.
    pub amount: u128,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenesisDestination {
    pub address: String,
    pub name: String,
    pub category: String,
}

/// Missing fields fall back to the protocol defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenesisConfig {
    pub genesis_time: u64,
    pub admin: String,
    pub reporters: Vec<String>,
    pub allocations: Vec<Allocation>,
    pub destinations: Vec<GenesisDestination>,
    pub fee_rate_bps: u16,
    pub good_spend_bonus_bps: u16,
    pub good_spend_window_secs: u64,
    pub good_spend_target: u128,
    pub proposal_threshold: u128,
    pub voting_period_secs: u64,
    pub quorum_bps: u16,
    /// Moves `RegistryAuthority` from the admin to the governance engine.
    pub hand_registry_to_governance: bool,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            genesis_time: 0,
            admin: String::new(),
            reporters: Vec::new(),
            allocations: Vec::new(),
            destinations: Vec::new(),
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            good_spend_bonus_bps: DEFAULT_GOOD_SPEND_BONUS_BPS,
            good_spend_window_secs: GOOD_SPEND_WINDOW_SECS,
            good_spend_target: DEFAULT_GOOD_SPEND_TARGET,
            proposal_threshold: DEFAULT_PROPOSAL_THRESHOLD,
            voting_period_secs: DEFAULT_VOTING_PERIOD_SECS,
            quorum_bps: DEFAULT_QUORUM_BPS,
            hand_registry_to_governance: false,
        }
    }
}

impl GenesisConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing genesis config")
    }

    fn validate(&self) -> Result<()> {
        if self.fee_rate_bps > MAX_FEE_RATE_BPS {
            bail!("fee_rate_bps {} exceeds {}", self.fee_rate_bps, MAX_FEE_RATE_BPS);
        }
        if self.good_spend_bonus_bps > MAX_GOOD_SPEND_BONUS_BPS {
            bail!("good_spend_bonus_bps {} exceeds {}", self.good_spend_bonus_bps, MAX_GOOD_SPEND_BONUS_BPS);
        }
        if self.good_spend_target == 0 {
            bail!("good_spend_target must be positive");
        }
        if self.good_spend_window_secs == 0 {
            bail!("good_spend_window_secs must be positive");
        }
        if self.voting_period_secs < MIN_VOTING_PERIOD_SECS {
            bail!("voting_period_secs below {}", MIN_VOTING_PERIOD_SECS);
        }
        if self.quorum_bps == 0 || self.quorum_bps > MAX_QUORUM_BPS {
            bail!("quorum_bps must be within 1..={}", MAX_QUORUM_BPS);
        }
        Ok(())
    }
}

fn address(field: &str, raw: &str) -> Result<Address> {
    let parsed = parse_address(raw).map_err(|e| anyhow!("{}: invalid address {:?}: {}", field, raw, e))?;
    if parsed == NULL_ADDRESS {
        bail!("{}: zero address", field);
    }
    Ok(parsed)
}

pub fn create_genesis_state(config: &GenesisConfig) -> Result<GlobalState> {
    config.validate()?;
    let admin = address("admin", &config.admin)?;
    let now = config.genesis_time;

    let mut state = GlobalState::default();

    // 1. Capabilities
    let caps = &mut state.capabilities;
    caps.grant(admin, Role::Admin);
    caps.grant(admin, Role::RegistryAuthority);
    caps.grant(LEDGER_ADDRESS, Role::LedgerWriter);
    for raw in &config.reporters {
        caps.grant(address("reporters", raw)?, Role::Reporter);
    }

    // 2. Parameters
    state.ledger.fee_rate_bps = config.fee_rate_bps;
    state.ledger.good_spend_bonus_bps = config.good_spend_bonus_bps;
    state.ledger.fee_exempt.insert(LEDGER_ADDRESS);
    state.ledger.good_spend.start = now;
    state.ledger.good_spend.duration = config.good_spend_window_secs;
    state.ledger.good_spend.target = config.good_spend_target;
    state.governance.params.proposal_threshold = config.proposal_threshold;
    state.governance.params.voting_period = config.voting_period_secs;
    state.governance.params.quorum_bps = config.quorum_bps;
    state.index.last_updated = now;
    for sub in state.index.sub_indices.iter_mut() {
        sub.last_updated = now;
    }

    // 3. Allocations
    for alloc in &config.allocations {
        let to = address("allocations", &alloc.address)?;
        ledger::mint(&mut state.ledger, &to, alloc.amount)
            .map_err(|e| anyhow!("allocation to {}: {}", alloc.address, e))?;
    }

    // 4. Destinations, registered by the admin before any hand-off
    for dest in &config.destinations {
        let category: DestinationCategory = dest.category.parse().map_err(|e| anyhow!("{}: {}", dest.name, e))?;
        registry::register(
            &mut state.registry,
            &state.capabilities,
            &admin,
            address("destinations", &dest.address)?,
            dest.name.clone(),
            category,
            now,
        )
        .map_err(|e| anyhow!("destination {}: {}", dest.name, e))?;
    }

    if config.hand_registry_to_governance {
        capability::transfer_registry_authority(&mut state.capabilities, &admin, GOVERNANCE_ADDRESS)
            .map_err(|e| anyhow!("registry hand-off: {}", e))?;
    }

    info!(
        total_supply = state.ledger.total_supply,
        destinations = state.registry.active_count(),
        governance_registry = config.hand_registry_to_governance,
        "genesis state created"
    );
    Ok(state)
}
