use std::collections::BTreeMap;

use sea_orm::DatabaseTransaction;
use uuid::Uuid;

use crate::{
    Distribution, EngineError, Quantity, ResultEngine, planner::shortfall, util::ensure_positive,
};

use super::{Engine, ledger::EntrySnapshot};

impl Engine {
    /// Checks a distribution against the company's entries.
    ///
    /// Referential problems come first: a missing or soft-deleted entry is
    /// `NotFound`, an entry of another company is `Unauthorized`. Only then
    /// is each quantity compared with what is left of its entry; any excess is
    /// a `Conflict` carrying the per-entry shortfall.
    ///
    /// Returns the snapshots of the referenced entries, whose versions are
    /// claimed when the drains are written.
    pub(super) async fn validate_distribution(
        &self,
        db: &DatabaseTransaction,
        company_id: Uuid,
        distribution: &Distribution,
    ) -> ResultEngine<Vec<EntrySnapshot>> {
        if distribution.is_empty() {
            return Err(EngineError::Invalid("distribution is empty".to_string()));
        }
        for quantity in distribution.values() {
            ensure_positive(*quantity, "drain quantity")?;
        }

        let models = self.entries_by_id(db, distribution.keys()).await?;
        for entry_id in distribution.keys() {
            let id = entry_id.to_string();
            let live = models
                .iter()
                .any(|m| m.id == id && m.deleted_at.is_none());
            if !live {
                return Err(EngineError::NotFound(format!("entry {entry_id}")));
            }
        }
        let company = company_id.to_string();
        if models.iter().any(|m| m.company_id != company) {
            return Err(EngineError::Unauthorized("foreign entry".to_string()));
        }

        let snapshots = self.snapshot_entries(db, models).await?;
        let available: BTreeMap<Uuid, Quantity> = snapshots
            .iter()
            .map(|s| (s.entry_id, s.available))
            .collect();
        let missing = shortfall(distribution, &available);
        if !missing.is_empty() {
            tracing::debug!(?missing, "distribution rejected");
            return Err(EngineError::conflict("not enough entries", missing));
        }
        Ok(snapshots)
    }
}
