use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    Actor, Deed, EngineError, Power, ResultEngine, UpdateDeedCmd, deeds,
    util::{ensure_positive, normalize_text_line},
};

use super::super::{Engine, with_tx};
use super::validate_unit_price;

impl Engine {
    /// Updates a live deed in place.
    ///
    /// With a new distribution the drain set is replaced: current drains are
    /// reversed (their quantity is available again), the new distribution is
    /// planned and validated against that availability, written, and
    /// whatever is still reversed afterwards is removed.
    ///
    /// Moving the deed to another company drops all of its drains first and
    /// then requires a distribution for the new company.
    pub async fn update_deed(&self, actor: &Actor, cmd: UpdateDeedCmd) -> ResultEngine<Deed> {
        self.require_power(actor, Power::WriteOwn)?;
        let title = cmd
            .title
            .as_deref()
            .map(|title| normalize_text_line(title, "title"))
            .transpose()?;
        let unit = cmd
            .unit
            .as_deref()
            .map(|unit| normalize_text_line(unit, "unit"))
            .transpose()?;
        if let Some(quantity) = cmd.quantity {
            ensure_positive(quantity, "deed quantity")?;
        }
        if let Some(unit_price_minor) = cmd.unit_price_minor {
            validate_unit_price(unit_price_minor)?;
        }

        with_tx!(self, |db_tx| {
            let model = self.require_deed(&db_tx, actor, cmd.deed_id).await?;
            if model.deleted_at.is_some() {
                return Err(EngineError::NotFound("deed".to_string()));
            }
            let mut deed = Deed::try_from(model)?;

            if let Some(company_id) = cmd.company_id
                && company_id != deed.company_id
            {
                if cmd.distribution.is_none() {
                    return Err(EngineError::Invalid(
                        "distribution is required when moving a deed to another company"
                            .to_string(),
                    ));
                }
                self.require_company(&db_tx, actor, company_id).await?;
                let dropped = self.purge_drains(&db_tx, deed.id).await?;
                tracing::debug!(deed_id = %deed.id, dropped, "deed moved to another company");
                deed.company_id = company_id;
            }
            if let Some(title) = title {
                deed.title = title;
            }
            if let Some(quantity) = cmd.quantity {
                deed.quantity = quantity;
            }
            if let Some(unit) = unit {
                deed.unit = unit;
            }
            if let Some(unit_price_minor) = cmd.unit_price_minor {
                deed.unit_price_minor = unit_price_minor;
            }
            deeds::ActiveModel::from(&deed).update(&db_tx).await?;

            deed.distribution = match &cmd.distribution {
                Some(spec) => {
                    self.set_drains_reversed(&db_tx, deed.id, true).await?;
                    let (distribution, snapshots) = self
                        .resolve_distribution(&db_tx, deed.company_id, spec)
                        .await?;
                    self.commit_distribution(&db_tx, deed.id, &distribution, &snapshots)
                        .await?;
                    let purged = self.purge_reversed_drains(&db_tx, deed.id).await?;
                    tracing::debug!(deed_id = %deed.id, purged, "drain set replaced");
                    distribution
                }
                None => self.drains_of_deed(&db_tx, deed.id, false).await?,
            };

            tracing::info!(
                deed_id = %deed.id,
                company_id = %deed.company_id,
                entries = deed.distribution.len(),
                "deed updated"
            );
            Ok(deed)
        })
    }
}
