#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use lef_execution::{execute_instruction, ledger, ExecutionContext};
use lef_types::address::LEDGER_ADDRESS;
use lef_types::instruction::{DestinationCategory, LedgerInstruction};
use lef_types::state::{GlobalState, Role};

const HOLDERS: [[u8; 32]; 3] = [[1u8; 32], [2u8; 32], [3u8; 32]];
const CHARITY: [u8; 32] = [7u8; 32];
const REPORTER: [u8; 32] = [8u8; 32];

#[derive(Arbitrary, Debug)]
enum Step {
    Transfer { from: u8, to: u8, amount: u64 },
    Claim { who: u8 },
    Burn { who: u8, amount: u32 },
    Report { id: u8, score: u16 },
}

fn holder(k: u8) -> [u8; 32] {
    HOLDERS[k as usize % HOLDERS.len()]
}

fuzz_target!(|steps: Vec<Step>| {
    let mut state = GlobalState::default();
    state.capabilities.grant(LEDGER_ADDRESS, Role::LedgerWriter);
    state.capabilities.grant(REPORTER, Role::Reporter);
    state.capabilities.grant([0xAA; 32], Role::RegistryAuthority);
    lef_execution::registry::register(
        &mut state.registry,
        &state.capabilities,
        &[0xAA; 32],
        CHARITY,
        "charity".into(),
        DestinationCategory::Charity,
        0,
    )
    .unwrap();
    for (i, h) in HOLDERS.iter().enumerate() {
        ledger::mint(&mut state.ledger, h, 10_000_000 * (i as u128 + 1)).unwrap();
    }

    for (i, step) in steps.into_iter().take(64).enumerate() {
        let (sender, ix) = match step {
            Step::Transfer { from, to, amount } => {
                let to = if to % 4 == 3 { CHARITY } else { holder(to) };
                (holder(from), LedgerInstruction::Transfer { to, amount: amount as u128 % 20_000_000 })
            }
            Step::Claim { who } => (holder(who), LedgerInstruction::ClaimRewards),
            Step::Burn { who, amount } => (holder(who), LedgerInstruction::Burn { amount: amount as u128 }),
            Step::Report { id, score } => (REPORTER, LedgerInstruction::SubmitSubIndex { id, score }),
        };

        let before = state.clone();
        let mut ctx = ExecutionContext {
            state: &mut state,
            height: 1,
            timestamp: 1 + i as u64 * 3_600,
        };
        if execute_instruction(&ix, &sender, &mut ctx).is_err() {
            assert_eq!(state, before, "failed instruction leaked state");
        }

        assert_eq!(state.ledger.sum_of_balances(), state.ledger.total_supply);
        assert!(state.ledger.rewards_pool <= state.ledger.balance_of(&LEDGER_ADDRESS));
        assert!(state.index.composite_index() <= 1000);
    }
});
