pub mod address;
pub mod amount;
pub mod batch;
pub mod instruction;
pub mod params;
pub mod state;
pub mod transaction;

pub use address::{Address, GOVERNANCE_ADDRESS, LEDGER_ADDRESS, NULL_ADDRESS};
pub use batch::Batch;
pub use instruction::LedgerInstruction;
pub use state::GlobalState;
pub use transaction::Transaction;
