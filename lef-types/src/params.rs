//! Protocol constants and default parameters.

/// Fixed-point scale of the reward accumulator (1e36).
pub const PRECISION: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000;

/// 1 token in base units.
pub const TOKEN: u128 = 1_000_000_000_000_000_000;
pub const DECIMALS: u8 = 18;

pub const BPS_DENOMINATOR: u128 = 10_000;

pub const MAX_SCORE: u16 = 1000;
/// Composite value at which rewards are distributed 1:1.
pub const NEUTRAL_INDEX: u128 = 500;
pub const INITIAL_SCORE: u16 = 500;

pub const SUB_INDEX_COUNT: usize = 6;
/// Written only by the ledger, from on-chain good-spend volume.
pub const GOOD_SPEND_SUB_INDEX: u8 = 5;

/// (name, weight in bps), indexed by subindex id. Weights sum to 10 000.
pub const SUB_INDEX_CATALOGUE: [(&str, u16); SUB_INDEX_COUNT] = [
    ("Global Peace", 2000),
    ("Charitable Giving", 1500),
    ("Social Sentiment", 2000),
    ("Environmental Care", 1500),
    ("Community Wellness", 1500),
    ("Good Spend", 1500),
];

pub const DEFAULT_FEE_RATE_BPS: u16 = 100;
pub const DEFAULT_GOOD_SPEND_BONUS_BPS: u16 = 100;
pub const MAX_FEE_RATE_BPS: u16 = 500;
pub const MAX_GOOD_SPEND_BONUS_BPS: u16 = 500;

pub const GOOD_SPEND_WINDOW_SECS: u64 = 86_400;
pub const DEFAULT_GOOD_SPEND_TARGET: u128 = 100_000 * TOKEN;

pub const DEFAULT_PROPOSAL_THRESHOLD: u128 = 10_000 * TOKEN;
pub const DEFAULT_VOTING_PERIOD_SECS: u64 = 3 * 86_400;
pub const MIN_VOTING_PERIOD_SECS: u64 = 86_400;
pub const DEFAULT_QUORUM_BPS: u16 = 400;
pub const MAX_QUORUM_BPS: u16 = 5000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_weights_sum_to_denominator() {
        let total: u128 = SUB_INDEX_CATALOGUE.iter().map(|(_, w)| *w as u128).sum();
        assert_eq!(total, BPS_DENOMINATOR);
        assert_eq!(SUB_INDEX_CATALOGUE[GOOD_SPEND_SUB_INDEX as usize].0, "Good Spend");
    }
}
