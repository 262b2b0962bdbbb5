//! The five reporter-fed subindices and score normalization.
//!
//! Subindex 5 (Good Spend) is written by the ledger itself and never reported.

use anyhow::{bail, Context, Result};
use lef_types::params::{GOOD_SPEND_SUB_INDEX, MAX_SCORE, SUB_INDEX_CATALOGUE};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Ids a reporter may submit.
pub const REPORTED_SUB_INDICES: std::ops::Range<u8> = 0..GOOD_SPEND_SUB_INDEX;

/// Reporter weights sum to this; used for the off-chain preview of the composite.
const REPORTED_WEIGHT_TOTAL: u64 = 8500;

/// Share of text sentiment when both text and structured signals exist.
const TEXT_SHARE: f64 = 0.6;

pub fn name_of(id: u8) -> Option<&'static str> {
    SUB_INDEX_CATALOGUE.get(id as usize).map(|(name, _)| *name)
}

pub fn clamp_score(raw: i64) -> u16 {
    raw.clamp(0, MAX_SCORE as i64) as u16
}

/// Maps a `[0, 1]` signal to a score, truncating toward zero.
pub fn score_from_fraction(fraction: f64) -> u16 {
    if !fraction.is_finite() {
        return MAX_SCORE / 2;
    }
    clamp_score((fraction.clamp(0.0, 1.0) * MAX_SCORE as f64) as i64)
}

/// Combines a text-sentiment fraction with a structured-data fraction.
/// With neither available the result is neutral.
pub fn blend(text: Option<f64>, numeric: Option<f64>) -> u16 {
    let fraction = match (text, numeric) {
        (Some(t), Some(n)) => t * TEXT_SHARE + n * (1.0 - TEXT_SHARE),
        (Some(t), None) => t,
        (None, Some(n)) => n,
        (None, None) => 0.5,
    };
    score_from_fraction(fraction)
}

/// One entry of a score file: a finished score, or the raw `[0, 1]` signals
/// the score is blended from.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScoreEntry {
    Score(i64),
    Signals { text: Option<f64>, numeric: Option<f64> },
}

impl ScoreEntry {
    fn resolve(self) -> i64 {
        match self {
            ScoreEntry::Score(score) => score,
            ScoreEntry::Signals { text, numeric } => blend(text, numeric) as i64,
        }
    }
}

/// Clamped scores for the reporter-fed subindices, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSet(BTreeMap<u8, u16>);

impl ScoreSet {
    /// Out-of-range scores are clamped; ids outside 0..5 are rejected.
    pub fn insert(&mut self, id: u8, raw: i64) -> Result<()> {
        if !REPORTED_SUB_INDICES.contains(&id) {
            bail!("subindex {} is not reporter-fed", id);
        }
        self.0.insert(id, clamp_score(raw));
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        self.0.iter().map(|(id, score)| (*id, *score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses `"0=620,1=540"`.
    pub fn parse_inline(raw: &str) -> Result<Self> {
        let mut set = Self::default();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (id, score) = pair.split_once('=').with_context(|| format!("expected id=score, got {:?}", pair))?;
            let id: u8 = id.trim().parse().with_context(|| format!("bad subindex id in {:?}", pair))?;
            let score: i64 = score.trim().parse().with_context(|| format!("bad score in {:?}", pair))?;
            set.insert(id, score)?;
        }
        Ok(set)
    }

    /// Parses a JSON object such as `{"0": 620, "3": {"text": 0.7, "numeric": 0.4}}`.
    pub fn parse_json(raw: &str) -> Result<Self> {
        let map: BTreeMap<String, ScoreEntry> = serde_json::from_str(raw).context("parsing score file")?;
        let mut set = Self::default();
        for (id, entry) in map {
            let id: u8 = id.parse().with_context(|| format!("bad subindex id {:?}", id))?;
            set.insert(id, entry.resolve())?;
        }
        Ok(set)
    }

    /// Weighted composite over the reported subindices only, for logging.
    /// Missing ids count as neutral.
    pub fn off_chain_composite(&self) -> u16 {
        let weighted: u64 = REPORTED_SUB_INDICES
            .map(|id| {
                let score = self.0.get(&id).copied().unwrap_or(MAX_SCORE / 2) as u64;
                score * SUB_INDEX_CATALOGUE[id as usize].1 as u64
            })
            .sum();
        (weighted / REPORTED_WEIGHT_TOTAL) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_weights_match_catalogue() {
        let total: u64 = REPORTED_SUB_INDICES.map(|id| SUB_INDEX_CATALOGUE[id as usize].1 as u64).sum();
        assert_eq!(total, REPORTED_WEIGHT_TOTAL);
        assert_eq!(name_of(0), Some("Global Peace"));
        assert_eq!(name_of(6), None);
    }

    #[test]
    fn scores_are_clamped() {
        assert_eq!(clamp_score(-20), 0);
        assert_eq!(clamp_score(1500), 1000);
        assert_eq!(score_from_fraction(0.6125), 612);
        assert_eq!(score_from_fraction(f64::NAN), 500);
    }

    #[test]
    fn blend_prefers_text_sixty_forty() {
        assert_eq!(blend(Some(1.0), Some(0.0)), 600);
        assert_eq!(blend(None, Some(0.25)), 250);
        assert_eq!(blend(None, None), 500);
    }

    #[test]
    fn inline_scores() {
        let set = ScoreSet::parse_inline("0=620, 1=1200,4=-3").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![(0, 620), (1, 1000), (4, 0)]);
        assert!(ScoreSet::parse_inline("5=700").is_err());
        assert!(ScoreSet::parse_inline("0:700").is_err());
    }

    #[test]
    fn json_scores_and_composite() {
        let set = ScoreSet::parse_json(r#"{"0": 1000, "1": 1000, "2": 1000, "3": 1000, "4": 1000}"#).unwrap();
        assert_eq!(set.off_chain_composite(), 1000);
        assert_eq!(ScoreSet::default().off_chain_composite(), 500);
    }

    #[test]
    fn json_signals_are_blended() {
        let set = ScoreSet::parse_json(
            r#"{"0": {"text": 1.0, "numeric": 0.0}, "1": {"numeric": 0.25}, "2": {}, "3": 410}"#,
        )
        .unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![(0, 600), (1, 250), (2, 500), (3, 410)]);
        assert!(ScoreSet::parse_json(r#"{"0": "high"}"#).is_err());
    }
}
