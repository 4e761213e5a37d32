use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Actor, CreateDeedCmd, Deed, Power, ResultEngine, deeds};

use super::super::{Engine, with_tx};
use super::DeedFields;

impl Engine {
    /// Creates a deed and drains its distribution.
    ///
    /// Planning, validation, the deed row and every drain happen in one
    /// transaction: on any error nothing is written.
    pub async fn create_deed(&self, actor: &Actor, cmd: CreateDeedCmd) -> ResultEngine<Deed> {
        self.require_power(actor, Power::CreateOwn)?;
        let fields = DeedFields::new(&cmd.title, cmd.quantity, &cmd.unit, cmd.unit_price_minor)?;

        with_tx!(self, |db_tx| {
            self.require_company(&db_tx, actor, cmd.company_id).await?;
            let (distribution, snapshots) = self
                .resolve_distribution(&db_tx, cmd.company_id, &cmd.distribution)
                .await?;

            let deed = Deed {
                id: Uuid::new_v4(),
                company_id: cmd.company_id,
                title: fields.title,
                quantity: fields.quantity,
                unit: fields.unit,
                unit_price_minor: fields.unit_price_minor,
                distribution,
                deleted_at: None,
            };
            deeds::ActiveModel::from(&deed).insert(&db_tx).await?;
            self.commit_distribution(&db_tx, deed.id, &deed.distribution, &snapshots)
                .await?;

            tracing::info!(
                deed_id = %deed.id,
                company_id = %deed.company_id,
                entries = deed.distribution.len(),
                "deed created"
            );
            Ok(deed)
        })
    }
}
