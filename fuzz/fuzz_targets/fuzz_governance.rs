#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use lef_execution::{capability, execute_instruction, ledger, ExecutionContext};
use lef_types::address::{GOVERNANCE_ADDRESS, LEDGER_ADDRESS};
use lef_types::instruction::{DestinationCategory, LedgerInstruction};
use lef_types::state::{GlobalState, ProposalStatus, Role};

const VOTERS: [[u8; 32]; 4] = [[1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32]];
const ADMIN: [u8; 32] = [0xAA; 32];

#[derive(Arbitrary, Debug)]
enum Step {
    ProposeAdd { who: u8, target: u8 },
    ProposeRemove { who: u8, target: u8 },
    Vote { who: u8, id: u8, support: bool },
    Execute { id: u8 },
    Transfer { from: u8, to: u8, amount: u32 },
    Wait { hours: u16 },
}

fn voter(k: u8) -> [u8; 32] {
    VOTERS[k as usize % VOTERS.len()]
}

fn target(k: u8) -> [u8; 32] {
    [0x40 + k % 4; 32]
}

fuzz_target!(|steps: Vec<Step>| {
    let mut state = GlobalState::default();
    state.capabilities.grant(LEDGER_ADDRESS, Role::LedgerWriter);
    state.capabilities.grant(ADMIN, Role::RegistryAuthority);
    capability::transfer_registry_authority(&mut state.capabilities, &ADMIN, GOVERNANCE_ADDRESS).unwrap();
    state.governance.params.proposal_threshold = 1_000;
    for (i, v) in VOTERS.iter().enumerate() {
        ledger::mint(&mut state.ledger, v, 25_000 * (i as u128 + 1)).unwrap();
    }

    let mut now = 1u64;
    for step in steps.into_iter().take(64) {
        let (sender, ix) = match step {
            Step::ProposeAdd { who, target: t } => (
                voter(who),
                LedgerInstruction::ProposeAddDestination {
                    destination: target(t),
                    name: "target".into(),
                    category: DestinationCategory::Other,
                    description: String::new(),
                },
            ),
            Step::ProposeRemove { who, target: t } => (
                voter(who),
                LedgerInstruction::ProposeRemoveDestination { destination: target(t), description: String::new() },
            ),
            Step::Vote { who, id, support } => (voter(who), LedgerInstruction::Vote { proposal_id: id as u64 % 8, support }),
            Step::Execute { id } => (voter(0), LedgerInstruction::Execute { proposal_id: id as u64 % 8 }),
            Step::Transfer { from, to, amount } => {
                (voter(from), LedgerInstruction::Transfer { to: voter(to), amount: amount as u128 })
            }
            Step::Wait { hours } => {
                now += hours as u64 * 3_600;
                continue;
            }
        };

        let before = state.clone();
        let mut ctx = ExecutionContext { state: &mut state, height: 1, timestamp: now };
        if execute_instruction(&ix, &sender, &mut ctx).is_err() {
            assert_eq!(state, before, "failed instruction leaked state");
        }

        for (id, p) in &state.governance.proposals {
            let voters = state.governance.voters.get(id).map_or(0, |v| v.len());
            assert!(voters <= VOTERS.len());
            if p.executed {
                let status = state.proposal_status(*id, now).unwrap();
                assert!(matches!(status, ProposalStatus::Executed | ProposalStatus::Failed));
            }
        }
        assert_eq!(state.ledger.sum_of_balances(), state.ledger.total_supply);
    }
});
