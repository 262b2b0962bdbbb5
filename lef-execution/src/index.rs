//! Composite sentiment index: reporter and ledger writes.

use crate::capability::require;
use crate::error::{LedgerError, Result};
use lef_types::address::Address;
use lef_types::params::{GOOD_SPEND_SUB_INDEX, MAX_SCORE, SUB_INDEX_COUNT};
use lef_types::state::{Capabilities, CompositeIndexState, Role};
use tracing::info;

/// Reporter write for one of the externally sourced subindices. Returns the new composite.
pub fn submit_sub_index(
    index: &mut CompositeIndexState,
    caps: &Capabilities,
    caller: &Address,
    id: u8,
    score: u16,
    now: u64,
) -> Result<u16> {
    require(caps, caller, Role::Reporter)?;
    if id == GOOD_SPEND_SUB_INDEX || id as usize >= SUB_INDEX_COUNT {
        return Err(LedgerError::InvalidSubIndex(id));
    }
    if score > MAX_SCORE {
        return Err(LedgerError::ScoreOutOfRange(score));
    }
    Ok(write_score(index, id, score, now))
}

/// Ledger-only write of the good-spend subindex.
pub fn submit_good_spend(
    index: &mut CompositeIndexState,
    caps: &Capabilities,
    caller: &Address,
    score: u16,
    now: u64,
) -> Result<u16> {
    require(caps, caller, Role::LedgerWriter)?;
    if score > MAX_SCORE {
        return Err(LedgerError::ScoreOutOfRange(score));
    }
    Ok(write_score(index, GOOD_SPEND_SUB_INDEX, score, now))
}

fn write_score(index: &mut CompositeIndexState, id: u8, score: u16, now: u64) -> u16 {
    let slot = &mut index.sub_indices[id as usize];
    slot.score = score;
    slot.last_updated = now;

    index.composite = index.composite_index();
    index.last_updated = now;
    info!(sub_index = id, score, composite = index.composite, "sub-index updated");
    index.composite
}

#[cfg(test)]
mod tests {
    use super::*;
    use lef_types::LEDGER_ADDRESS;

    const REPORTER: Address = [9u8; 32];

    fn setup() -> (CompositeIndexState, Capabilities) {
        let mut caps = Capabilities::default();
        caps.grant(REPORTER, Role::Reporter);
        caps.grant(LEDGER_ADDRESS, Role::LedgerWriter);
        (CompositeIndexState::default(), caps)
    }

    #[test]
    fn composite_reaches_925_with_neutral_good_spend() {
        let (mut index, caps) = setup();
        for id in 0..5 {
            submit_sub_index(&mut index, &caps, &REPORTER, id, 1000, 42).unwrap();
        }
        assert_eq!(index.composite, 925);
        assert_eq!(index.composite_index(), 925);
        assert_eq!(index.sub_index(0).unwrap().last_updated, 42);
    }

    #[test]
    fn reporter_cannot_touch_good_spend_slot() {
        let (mut index, caps) = setup();
        assert_eq!(
            submit_sub_index(&mut index, &caps, &REPORTER, 5, 10, 1),
            Err(LedgerError::InvalidSubIndex(5))
        );
        assert_eq!(
            submit_sub_index(&mut index, &caps, &REPORTER, 6, 10, 1),
            Err(LedgerError::InvalidSubIndex(6))
        );
        assert_eq!(
            submit_good_spend(&mut index, &caps, &REPORTER, 10, 1),
            Err(LedgerError::Unauthorized(Role::LedgerWriter))
        );
    }

    #[test]
    fn rejects_unauthorized_and_out_of_range() {
        let (mut index, caps) = setup();
        assert_eq!(
            submit_sub_index(&mut index, &caps, &[1u8; 32], 0, 10, 1),
            Err(LedgerError::Unauthorized(Role::Reporter))
        );
        assert_eq!(
            submit_sub_index(&mut index, &caps, &REPORTER, 0, 1001, 1),
            Err(LedgerError::ScoreOutOfRange(1001))
        );
        assert_eq!(
            submit_good_spend(&mut index, &caps, &LEDGER_ADDRESS, 1001, 1),
            Err(LedgerError::ScoreOutOfRange(1001))
        );
        assert_eq!(index.composite_index(), 500);
    }

    #[test]
    fn ledger_writes_good_spend() {
        let (mut index, caps) = setup();
        let composite = submit_good_spend(&mut index, &caps, &LEDGER_ADDRESS, 1000, 7).unwrap();
        // 500 * 8500 + 1000 * 1500 = 5_750_000
        assert_eq!(composite, 575);
    }
}
