use anyhow::{bail, Result};
use clap::Parser;
use lef_crypto::signatures::{address_of, generate_keypair, sign, SigningKey};
use lef_execution::{execute_transaction, ledger, registry, ExecutionContext, LedgerError};
use lef_types::address::{Address, LEDGER_ADDRESS};
use lef_types::amount::format_token_amount;
use lef_types::instruction::{DestinationCategory, LedgerInstruction};
use lef_types::params::{GOOD_SPEND_SUB_INDEX, TOKEN};
use lef_types::state::{GlobalState, Role};
use lef_types::transaction::Transaction;
use rand::Rng;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "LefCoin economic simulation runner")]
struct Args {
    /// Number of wallets created for the simulation.
    #[arg(long, default_value_t = 200)]
    wallets: usize,
    /// Number of transactions to execute.
    #[arg(long, default_value_t = 20_000)]
    transactions: usize,
    /// Starting tokens airdropped to each wallet.
    #[arg(long, default_value_t = 50_000)]
    simulation_money: u64,
    /// Registered good-spend destinations.
    #[arg(long, default_value_t = 5)]
    destinations: usize,
    /// Percentage of transfers sent to a good-spend destination.
    #[arg(long, default_value_t = 10)]
    good_spend_pct: u32,
    /// Simulated seconds between transactions.
    #[arg(long, default_value_t = 30)]
    seconds_per_tx: u64,
}

struct SimWallet {
    keypair: SigningKey,
    address: Address,
}

#[derive(Debug, Default)]
struct SimulationReport {
    succeeded: u64,
    failed: u64,
    claims: u64,
    claimed: u128,
    total_supply: u128,
    rewards_pool: u128,
    total_distributed: u128,
    total_bonus_minted: u128,
    total_good_spend: u128,
    composite: u16,
}

fn build_wallets(count: usize) -> Vec<SimWallet> {
    (0..count)
        .map(|_| {
            let keypair = generate_keypair();
            let address = address_of(&keypair);
            SimWallet { keypair, address }
        })
        .collect()
}

fn signed(wallet: &SimWallet, state: &GlobalState, instruction: LedgerInstruction) -> Transaction {
    let mut tx = Transaction {
        sender: wallet.address,
        nonce: state.ledger.nonce_of(&wallet.address),
        instruction,
        signature: vec![],
    };
    tx.signature = sign(&wallet.keypair, &tx.signing_bytes());
    tx
}

fn bootstrap(state: &mut GlobalState, wallets: &[SimWallet], reporter: &SimWallet, destinations: &[Address], money: u128) -> Result<()> {
    let admin = [0xAD; 32];
    state.capabilities.grant(admin, Role::Admin);
    state.capabilities.grant(admin, Role::RegistryAuthority);
    state.capabilities.grant(reporter.address, Role::Reporter);
    state.capabilities.grant(LEDGER_ADDRESS, Role::LedgerWriter);

    for (i, dest) in destinations.iter().enumerate() {
        let category = DestinationCategory::ALL[i % DestinationCategory::ALL.len()];
        registry::register(&mut state.registry, &state.capabilities, &admin, *dest, format!("Destination {}", i), category, 0)?;
    }
    for wallet in wallets {
        ledger::mint(&mut state.ledger, &wallet.address, money)?;
    }
    Ok(())
}

fn run_simulation(args: &Args) -> Result<SimulationReport> {
    if args.wallets < 2 {
        bail!("need at least two wallets");
    }
    let mut state = GlobalState::default();
    let wallets = build_wallets(args.wallets);
    let reporters = build_wallets(1);
    let reporter = &reporters[0];
    let destinations: Vec<Address> = build_wallets(args.destinations).iter().map(|w| w.address).collect();
    bootstrap(&mut state, &wallets, reporter, &destinations, args.simulation_money as u128 * TOKEN)?;

    let mut rng = rand::thread_rng();
    let mut report = SimulationReport::default();
    let mut now = 1_700_000_000u64;

    for i in 0..args.transactions {
        now += args.seconds_per_tx;
        let roll = rng.gen_range(0..100u32);

        let (tx, is_claim) = if i % 500 == 0 {
            let id = rng.gen_range(0..GOOD_SPEND_SUB_INDEX);
            let score = rng.gen_range(300..=900u16);
            (signed(reporter, &state, LedgerInstruction::SubmitSubIndex { id, score }), false)
        } else if roll < 5 {
            let wallet = &wallets[rng.gen_range(0..wallets.len())];
            (signed(wallet, &state, LedgerInstruction::ClaimRewards), true)
        } else {
            let sender_idx = rng.gen_range(0..wallets.len());
            let sender = &wallets[sender_idx];
            let to = if roll < 5 + args.good_spend_pct && !destinations.is_empty() {
                destinations[rng.gen_range(0..destinations.len())]
            } else {
                wallets[(sender_idx + rng.gen_range(1..wallets.len())) % wallets.len()].address
            };
            let balance = state.ledger.balance_of(&sender.address);
            let amount = rng.gen_range(0..=balance / 20);
            (signed(sender, &state, LedgerInstruction::Transfer { to, amount }), false)
        };

        let pool_before = state.ledger.rewards_pool;
        let result = {
            let mut ctx = ExecutionContext {
                state: &mut state,
                height: 1 + i as u64,
                timestamp: now,
            };
            execute_transaction(&tx, &mut ctx)
        };

        match result {
            Ok(()) => {
                report.succeeded += 1;
                if is_claim {
                    report.claims += 1;
                    report.claimed += pool_before - state.ledger.rewards_pool;
                }
            }
            Err(LedgerError::NoRewards) => report.failed += 1,
            Err(e) => bail!("unexpected rejection at tx {}: {}", i, e),
        }

        if state.ledger.sum_of_balances() != state.ledger.total_supply {
            bail!("supply conservation violated at tx {}", i);
        }
    }

    report.total_supply = state.ledger.total_supply;
    report.rewards_pool = state.ledger.rewards_pool;
    report.total_distributed = state.ledger.total_distributed;
    report.total_bonus_minted = state.ledger.total_bonus_minted;
    report.total_good_spend = state.registry.total_good_spend;
    report.composite = state.index.composite_index();
    Ok(report)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = Instant::now();
    let report = run_simulation(&args)?;
    let elapsed = start.elapsed();

    println!("=== LefCoin Simulation ===");
    println!("Wallets created: {}", args.wallets);
    println!("Simulation money per wallet: {} LEF", args.simulation_money);
    println!("Transactions attempted: {}", args.transactions);
    println!("Successful: {}", report.succeeded);
    println!("Rejected: {}", report.failed);
    println!("Elapsed: {:.2?}", elapsed);
    println!("Total supply: {} LEF", format_token_amount(report.total_supply));
    println!("Fees + bonus distributed: {} LEF", format_token_amount(report.total_distributed));
    println!("Bonus minted: {} LEF", format_token_amount(report.total_bonus_minted));
    println!("Rewards pool: {} LEF", format_token_amount(report.rewards_pool));
    println!("Claims: {} ({} LEF)", report.claims, format_token_amount(report.claimed));
    println!("Good spend: {} LEF", format_token_amount(report.total_good_spend));
    println!("Composite index: {}/1000", report.composite);
    println!("Supply conserved: yes");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(transactions: usize) -> Args {
        Args {
            wallets: 10,
            transactions,
            simulation_money: 1_000,
            destinations: 2,
            good_spend_pct: 30,
            seconds_per_tx: 600,
        }
    }

    #[test]
    fn simulation_bootstraps_wallets_and_money() {
        let mut state = GlobalState::default();
        let wallets = build_wallets(10);
        let reporters = build_wallets(1);
        let reporter = &reporters[0];
        bootstrap(&mut state, &wallets, reporter, &[[9u8; 32]], 1_000).unwrap();

        assert_eq!(state.ledger.total_supply, 10_000);
        assert!(state.registry.is_good_destination(&[9u8; 32]));
        assert!(state.capabilities.has(&reporter.address, Role::Reporter));
    }

    #[test]
    fn simulation_conserves_supply_and_distributes_fees() {
        let report = run_simulation(&args(2_000)).unwrap();
        assert_eq!(report.succeeded + report.failed, 2_000);
        assert!(report.total_distributed > 0);
        assert!(report.total_good_spend > 0);
        assert_eq!(report.total_supply, 10 * 1_000 * TOKEN + report.total_bonus_minted);
    }
}
