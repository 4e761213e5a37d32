//! Greedy distribution planner.
//!
//! Planning is pure: it works on a snapshot of candidates and never touches
//! storage. The lifecycle code persists the result only after validation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    DistributeStrategy, EngineError, Quantity, ResultEngine, Shortfall, util::ensure_positive,
};

/// Concrete per-entry quantities, keyed by entry id.
pub type Distribution = BTreeMap<Uuid, Quantity>;

/// An entry eligible for planning, with its remaining quantity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub entry_id: Uuid,
    pub entry_type_id: Uuid,
    pub date_added: DateTime<Utc>,
    pub available: Quantity,
}

/// Allocates each entry type target across its candidates.
///
/// Candidates of a type are ordered by `strategy`; walking that order each
/// entry receives `min(available, target - cumulative)` where `cumulative`
/// is the running sum of available quantity of the entries before it. The
/// walk stops once the running sum reaches the target.
///
/// If any type cannot be covered the whole plan fails with a
/// [`EngineError::Conflict`] whose shortfall is keyed by entry type id.
pub fn plan(
    targets: &BTreeMap<Uuid, Quantity>,
    candidates: &[Candidate],
    strategy: DistributeStrategy,
) -> ResultEngine<Distribution> {
    if targets.is_empty() {
        return Err(EngineError::Invalid("entry types not specified".to_string()));
    }
    for target in targets.values() {
        ensure_positive(*target, "requested quantity")?;
    }

    let mut missing = Shortfall::new();
    let mut distribution = Distribution::new();

    for (&entry_type_id, &target) in targets {
        let mut pool: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.entry_type_id == entry_type_id && c.available.is_positive())
            .collect();

        // Saturation only happens far above any target.
        let total = pool
            .iter()
            .fold(Quantity::ZERO, |acc, c| acc.saturating_add(c.available));
        if total < target {
            missing.insert(entry_type_id, target.saturating_remaining(total));
            continue;
        }

        pool.sort_by(|a, b| strategy.compare(a, b));

        let mut cumulative = Quantity::ZERO;
        for candidate in pool {
            if cumulative >= target {
                break;
            }
            let take = candidate
                .available
                .min(target.saturating_remaining(cumulative));
            cumulative = cumulative.saturating_add(candidate.available);
            if take.is_positive() {
                distribution.insert(candidate.entry_id, take);
            }
        }
    }

    if !missing.is_empty() {
        tracing::debug!(?missing, "plan rejected");
        return Err(EngineError::conflict("not enough quantity", missing));
    }

    tracing::debug!(strategy = %strategy, entries = distribution.len(), "plan computed");
    Ok(distribution)
}

/// Per-id difference between requested and available quantity, for every id
/// where the request exceeds what is available. Ids missing from `available`
/// count as zero.
pub fn shortfall(
    requested: &BTreeMap<Uuid, Quantity>,
    available: &BTreeMap<Uuid, Quantity>,
) -> Shortfall {
    requested
        .iter()
        .filter_map(|(id, wanted)| {
            let have = available.get(id).copied().unwrap_or_default();
            (*wanted > have).then(|| (*id, wanted.saturating_remaining(have)))
        })
        .collect()
}
