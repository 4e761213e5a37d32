use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    Actor, Distribution, Drain, DrainFilter, EngineError, Power, ResultEngine, Shortfall, deeds,
    drains, entries,
};

use super::{Engine, ledger::EntrySnapshot, with_tx};

impl Engine {
    /// Inserts or replaces the drain of `(deed_id, entry_id)`.
    pub(super) async fn upsert_drain(
        &self,
        db: &DatabaseTransaction,
        drain: &Drain,
    ) -> ResultEngine<()> {
        drains::Entity::insert(drains::ActiveModel::from(drain))
            .on_conflict(
                OnConflict::columns([drains::Column::DeedId, drains::Column::EntryId])
                    .update_columns([drains::Column::QuantityMinor, drains::Column::IsDeleted])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    /// Marks every drain of the deed reversed (`true`) or active (`false`).
    pub(super) async fn set_drains_reversed(
        &self,
        db: &DatabaseTransaction,
        deed_id: Uuid,
        reversed: bool,
    ) -> ResultEngine<u64> {
        let result = drains::Entity::update_many()
            .col_expr(drains::Column::IsDeleted, Expr::value(reversed))
            .filter(drains::Column::DeedId.eq(deed_id.to_string()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Removes the reversed drains of the deed.
    pub(super) async fn purge_reversed_drains(
        &self,
        db: &DatabaseTransaction,
        deed_id: Uuid,
    ) -> ResultEngine<u64> {
        let result = drains::Entity::delete_many()
            .filter(drains::Column::DeedId.eq(deed_id.to_string()))
            .filter(drains::Column::IsDeleted.eq(true))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub(super) async fn purge_drains(
        &self,
        db: &DatabaseTransaction,
        deed_id: Uuid,
    ) -> ResultEngine<u64> {
        let result = drains::Entity::delete_many()
            .filter(drains::Column::DeedId.eq(deed_id.to_string()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Bumps the claim version of every entry in `distribution`, failing if
    /// any of them moved since `snapshots` was read.
    pub(super) async fn claim_entries(
        &self,
        db: &DatabaseTransaction,
        distribution: &Distribution,
        snapshots: &[EntrySnapshot],
    ) -> ResultEngine<()> {
        for snapshot in snapshots
            .iter()
            .filter(|s| distribution.contains_key(&s.entry_id))
        {
            let result = entries::Entity::update_many()
                .col_expr(
                    entries::Column::DrainVersion,
                    Expr::col(entries::Column::DrainVersion).add(1),
                )
                .filter(entries::Column::Id.eq(snapshot.entry_id.to_string()))
                .filter(entries::Column::DrainVersion.eq(snapshot.drain_version))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                tracing::warn!(
                    entry_id = %snapshot.entry_id,
                    expected_version = snapshot.drain_version,
                    "entry drained concurrently"
                );
                return Err(EngineError::conflict(
                    format!("entry {} drained concurrently", snapshot.entry_id),
                    Shortfall::new(),
                ));
            }
        }
        Ok(())
    }

    /// Claims the entries and writes one active drain per entry.
    pub(super) async fn commit_distribution(
        &self,
        db: &DatabaseTransaction,
        deed_id: Uuid,
        distribution: &Distribution,
        snapshots: &[EntrySnapshot],
    ) -> ResultEngine<()> {
        self.claim_entries(db, distribution, snapshots).await?;
        for (entry_id, quantity) in distribution {
            self.upsert_drain(db, &Drain::active(deed_id, *entry_id, *quantity))
                .await?;
        }
        Ok(())
    }

    /// Drains of the deed keyed by entry, either active or reversed ones.
    pub(super) async fn drains_of_deed(
        &self,
        db: &DatabaseTransaction,
        deed_id: Uuid,
        reversed: bool,
    ) -> ResultEngine<Distribution> {
        drains::Entity::find()
            .filter(drains::Column::DeedId.eq(deed_id.to_string()))
            .filter(drains::Column::IsDeleted.eq(reversed))
            .all(db)
            .await?
            .into_iter()
            .map(|model| {
                let drain = Drain::try_from(model)?;
                Ok((drain.entry_id, drain.quantity))
            })
            .collect()
    }

    /// Lists drains of deeds the actor can read.
    ///
    /// Reversed drains are only included on request.
    pub async fn find_drain(&self, actor: &Actor, filter: &DrainFilter) -> ResultEngine<Vec<Drain>> {
        self.require_power(actor, Power::ReadOwn)?;
        with_tx!(self, |db_tx| {
            let mut query = drains::Entity::find();
            if let Some(company_ids) = self.visible_company_ids(&db_tx, actor).await? {
                let deed_ids: Vec<String> = deeds::Entity::find()
                    .filter(deeds::Column::CompanyId.is_in(company_ids))
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(|model| model.id)
                    .collect();
                query = query.filter(drains::Column::DeedId.is_in(deed_ids));
            }
            if let Some(deed_id) = filter.deed_id {
                query = query.filter(drains::Column::DeedId.eq(deed_id.to_string()));
            }
            if let Some(entry_id) = filter.entry_id {
                query = query.filter(drains::Column::EntryId.eq(entry_id.to_string()));
            }
            if !filter.include_reversed {
                query = query.filter(drains::Column::IsDeleted.eq(false));
            }
            let models = query
                .order_by_asc(drains::Column::DeedId)
                .order_by_asc(drains::Column::EntryId)
                .all(&db_tx)
                .await?;
            let rows = models
                .into_iter()
                .map(Drain::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::{Database, PaginatorTrait};

    use super::*;
    use crate::{CreateCompanyCmd, CreateEntryCmd, CreateEntryTypeCmd, Quantity};

    #[tokio::test]
    async fn claim_lost_to_another_writer_conflicts_without_drains() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        let alice = Actor::owner("alice");
        let company = engine
            .create_company(&alice, CreateCompanyCmd::new("Acme", "IT0001", "MI-1"))
            .await
            .unwrap()
            .id;
        let steel = engine
            .create_entry_type(&alice, CreateEntryTypeCmd::new("STEEL", "kg"))
            .await
            .unwrap()
            .id;
        let entry = engine
            .create_entry(
                &alice,
                CreateEntryCmd::new(company, steel, Quantity::from_units(10)),
            )
            .await
            .unwrap()
            .id;

        let db_tx = engine.database.begin().await.unwrap();
        let distribution = Distribution::from([(entry, Quantity::from_units(4))]);
        let snapshots = engine
            .validate_distribution(&db_tx, company, &distribution)
            .await
            .unwrap();
        // Another deed claims the entry after the snapshot was taken.
        entries::Entity::update_many()
            .col_expr(
                entries::Column::DrainVersion,
                Expr::col(entries::Column::DrainVersion).add(1),
            )
            .filter(entries::Column::Id.eq(entry.to_string()))
            .exec(&db_tx)
            .await
            .unwrap();

        let err = engine
            .commit_distribution(&db_tx, Uuid::new_v4(), &distribution, &snapshots)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::Conflict {
                message: format!("entry {entry} drained concurrently"),
                shortfall: Shortfall::new(),
            }
        );
        assert_eq!(drains::Entity::find().count(&db_tx).await.unwrap(), 0);
    }
}
