//! Inner join of fact rows with the tier file on `counter_party`.
//!
//! Fact rows whose counter_party has no tier are dropped and counted. A
//! counter_party listed with more than one distinct tier is resolved by
//! `TierConflict`; repeating the same pair is not a conflict.

use std::collections::HashMap;

use crate::domain::{DimensionField, FactRow, GroupKey, Status, TierConflict};
use crate::error::{CubeError, CubeResult};
use crate::io::ingest::{RawFact, TierRecord};

/// A fact row with its tier attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub legal_entity: String,
    pub counter_party: String,
    pub tier: String,
    pub rating: i64,
    pub status: Status,
    pub value: i64,
}

impl JoinedRow {
    pub fn field(&self, field: DimensionField) -> &str {
        match field {
            DimensionField::LegalEntity => &self.legal_entity,
            DimensionField::CounterParty => &self.counter_party,
            DimensionField::Tier => &self.tier,
        }
    }

    /// Project onto the configured dimension order.
    pub fn to_fact(&self, dimensions: &[DimensionField]) -> FactRow {
        FactRow {
            key: GroupKey::from_values(dimensions.iter().map(|&d| self.field(d))),
            rating: self.rating,
            value: self.value,
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub rows: Vec<JoinedRow>,
    /// Fact rows dropped for lack of a tier.
    pub unmatched: usize,
}

/// `counter_party -> tiers` after applying the conflict policy.
///
/// Records are walked in file order, so `Reject` reports the first line
/// that introduces a second tier.
pub fn build_tier_index(
    tiers: &[TierRecord],
    policy: TierConflict,
) -> CubeResult<HashMap<String, Vec<String>>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    let mut conflicted: Vec<String> = Vec::new();
    for record in tiers {
        let listed = index.entry(record.counter_party.clone()).or_default();
        if listed.contains(&record.tier) {
            continue;
        }
        if !listed.is_empty() {
            if policy == TierConflict::Reject {
                let mut all = listed.clone();
                all.push(record.tier.clone());
                return Err(CubeError::TierConflict {
                    counter_party: record.counter_party.clone(),
                    tiers: all,
                });
            }
            if listed.len() == 1 {
                conflicted.push(record.counter_party.clone());
            }
        }
        listed.push(record.tier.clone());
    }

    for counter_party in &conflicted {
        let Some(listed) = index.get_mut(counter_party) else {
            continue;
        };
        if policy == TierConflict::First {
            log::warn!(
                "counter_party '{counter_party}' has tiers {listed:?}; keeping '{}'",
                listed[0]
            );
            listed.truncate(1);
        } else {
            log::warn!("counter_party '{counter_party}' has tiers {listed:?}; fanning out");
        }
    }

    Ok(index)
}

pub fn join_tiers(
    facts: Vec<RawFact>,
    tiers: &[TierRecord],
    policy: TierConflict,
) -> CubeResult<JoinOutput> {
    let index = build_tier_index(tiers, policy)?;

    let mut rows = Vec::with_capacity(facts.len());
    let mut unmatched = 0usize;
    for fact in facts {
        let Some(fact_tiers) = index.get(&fact.counter_party) else {
            log::debug!(
                "line {}: no tier for counter_party '{}'",
                fact.line,
                fact.counter_party
            );
            unmatched += 1;
            continue;
        };
        for tier in fact_tiers {
            rows.push(JoinedRow {
                legal_entity: fact.legal_entity.clone(),
                counter_party: fact.counter_party.clone(),
                tier: tier.clone(),
                rating: fact.rating,
                status: fact.status.clone(),
                value: fact.value,
            });
        }
    }

    if unmatched > 0 {
        log::info!("join: dropped {unmatched} fact rows with no tier");
    }
    Ok(JoinOutput { rows, unmatched })
}

pub fn to_fact_rows(rows: &[JoinedRow], dimensions: &[DimensionField]) -> Vec<FactRow> {
    rows.iter().map(|row| row.to_fact(dimensions)).collect()
}
