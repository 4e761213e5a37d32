use sea_orm::DatabaseTransaction;
use uuid::Uuid;

use crate::{
    Distribution, DistributionSpec, EngineError, Quantity, ResultEngine, plan,
    util::{ensure_positive, normalize_text_line},
};

use super::{Engine, ledger::EntrySnapshot};

mod create;
mod delete;
mod list;
mod update;

fn validate_unit_price(unit_price_minor: i64) -> ResultEngine<()> {
    if unit_price_minor < 0 {
        return Err(EngineError::Invalid("unit price must be >= 0".to_string()));
    }
    Ok(())
}

/// Validated scalar fields of a deed.
struct DeedFields {
    title: String,
    quantity: Quantity,
    unit: String,
    unit_price_minor: i64,
}

impl DeedFields {
    fn new(title: &str, quantity: Quantity, unit: &str, unit_price_minor: i64) -> ResultEngine<Self> {
        let title = normalize_text_line(title, "title")?;
        let unit = normalize_text_line(unit, "unit")?;
        ensure_positive(quantity, "deed quantity")?;
        validate_unit_price(unit_price_minor)?;
        Ok(Self {
            title,
            quantity,
            unit,
            unit_price_minor,
        })
    }
}

impl Engine {
    /// Turns a distribution spec into a validated per-entry distribution.
    ///
    /// Type-level specs are planned over the company's live entries first;
    /// either way the result goes through the sufficiency validator. An empty
    /// explicit map means the deed consumes nothing.
    async fn resolve_distribution(
        &self,
        db: &DatabaseTransaction,
        company_id: Uuid,
        spec: &DistributionSpec,
    ) -> ResultEngine<(Distribution, Vec<EntrySnapshot>)> {
        let distribution = match spec {
            DistributionSpec::Explicit(entries) if entries.is_empty() => {
                return Ok((Distribution::new(), Vec::new()));
            }
            DistributionSpec::Explicit(entries) => entries.clone(),
            DistributionSpec::ByEntryType { targets, strategy } => {
                let candidates: Vec<_> = self
                    .snapshot_entry_types(db, company_id, targets.keys())
                    .await?
                    .iter()
                    .map(EntrySnapshot::candidate)
                    .collect();
                plan(targets, &candidates, *strategy)?
            }
        };
        let snapshots = self
            .validate_distribution(db, company_id, &distribution)
            .await?;
        Ok((distribution, snapshots))
    }
}
