//! Remaining quantity of entries: lot size minus active drains.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Actor, Candidate, EngineError, Power, Quantity, ResultEngine, drains, entries, entry_types,
    util::parse_uuid,
};

use super::{Engine, with_tx};

/// An entry as seen at read time, with the claim version captured alongside
/// its remaining quantity.
#[derive(Clone, Debug)]
pub(super) struct EntrySnapshot {
    pub(super) entry_id: Uuid,
    pub(super) entry_type_id: Uuid,
    pub(super) company_id: Uuid,
    pub(super) date_added: DateTime<Utc>,
    pub(super) available: Quantity,
    pub(super) drain_version: i64,
}

impl EntrySnapshot {
    pub(super) fn candidate(&self) -> Candidate {
        Candidate {
            entry_id: self.entry_id,
            entry_type_id: self.entry_type_id,
            date_added: self.date_added,
            available: self.available,
        }
    }
}

impl Engine {
    /// Snapshots the given entry rows. Deleted rows are kept; callers filter.
    pub(super) async fn snapshot_entries(
        &self,
        db: &DatabaseTransaction,
        models: Vec<entries::Model>,
    ) -> ResultEngine<Vec<EntrySnapshot>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let mut consumed: HashMap<String, Quantity> = HashMap::new();
        for drain in drains::Entity::find()
            .filter(drains::Column::EntryId.is_in(ids))
            .filter(drains::Column::IsDeleted.eq(false))
            .all(db)
            .await?
        {
            let used = consumed.entry(drain.entry_id).or_default();
            *used = used.try_add(Quantity::from_minor(drain.quantity_minor))?;
        }

        models
            .into_iter()
            .map(|model| {
                let used = consumed.get(&model.id).copied().unwrap_or_default();
                Ok(EntrySnapshot {
                    entry_id: parse_uuid(&model.id, "entry")?,
                    entry_type_id: parse_uuid(&model.entry_type_id, "entry type")?,
                    company_id: parse_uuid(&model.company_id, "company")?,
                    date_added: model.date_added,
                    available: Quantity::from_minor(model.quantity_minor).try_sub(used)?,
                    drain_version: model.drain_version,
                })
            })
            .collect()
    }

    /// Entry rows by id, in any state and of any company.
    pub(super) async fn entries_by_id(
        &self,
        db: &DatabaseTransaction,
        ids: impl IntoIterator<Item = &Uuid>,
    ) -> ResultEngine<Vec<entries::Model>> {
        let ids: Vec<String> = ids.into_iter().map(Uuid::to_string).collect();
        Ok(entries::Entity::find()
            .filter(entries::Column::Id.is_in(ids))
            .all(db)
            .await?)
    }

    /// Ids of the given entry types that exist and are not deleted.
    async fn live_entry_type_ids(
        &self,
        db: &DatabaseTransaction,
        entry_type_ids: impl IntoIterator<Item = &Uuid>,
    ) -> ResultEngine<Vec<String>> {
        let type_ids: Vec<String> = entry_type_ids.into_iter().map(Uuid::to_string).collect();
        Ok(entry_types::Entity::find()
            .filter(entry_types::Column::Id.is_in(type_ids))
            .filter(entry_types::Column::DeletedAt.is_null())
            .all(db)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect())
    }

    /// Live entries of the company belonging to the given entry types.
    ///
    /// Every type must exist and be live, otherwise the call fails with
    /// [`EngineError::NotFound`] naming the first missing one.
    pub(super) async fn snapshot_entry_types<'a>(
        &self,
        db: &DatabaseTransaction,
        company_id: Uuid,
        entry_type_ids: impl IntoIterator<Item = &'a Uuid>,
    ) -> ResultEngine<Vec<EntrySnapshot>> {
        let requested: Vec<&Uuid> = entry_type_ids.into_iter().collect();
        let live = self
            .live_entry_type_ids(db, requested.iter().copied())
            .await?;
        if let Some(missing) = requested
            .iter()
            .find(|id| !live.contains(&id.to_string()))
        {
            return Err(EngineError::NotFound(format!("entry type {missing}")));
        }
        self.snapshot_entries_of_types(db, company_id, live).await
    }

    async fn snapshot_entries_of_types(
        &self,
        db: &DatabaseTransaction,
        company_id: Uuid,
        type_ids: Vec<String>,
    ) -> ResultEngine<Vec<EntrySnapshot>> {
        let models = entries::Entity::find()
            .filter(entries::Column::CompanyId.eq(company_id.to_string()))
            .filter(entries::Column::EntryTypeId.is_in(type_ids))
            .filter(entries::Column::DeletedAt.is_null())
            .order_by_asc(entries::Column::Id)
            .all(db)
            .await?;
        self.snapshot_entries(db, models).await
    }

    /// Remaining quantity per entry for live entries of the company.
    ///
    /// Ids that do not match a live entry of the company are left out; if
    /// none match the call fails with [`EngineError::NotFound`].
    pub async fn available_for_entries(
        &self,
        actor: &Actor,
        company_id: Uuid,
        entry_ids: &[Uuid],
    ) -> ResultEngine<BTreeMap<Uuid, Quantity>> {
        self.require_power(actor, Power::ReadOwn)?;
        with_tx!(self, |db_tx| {
            self.require_company(&db_tx, actor, company_id).await?;
            let models = self
                .entries_by_id(&db_tx, entry_ids)
                .await?
                .into_iter()
                .filter(|m| m.deleted_at.is_none() && m.company_id == company_id.to_string())
                .collect();
            let available: BTreeMap<Uuid, Quantity> = self
                .snapshot_entries(&db_tx, models)
                .await?
                .into_iter()
                .map(|s| (s.entry_id, s.available))
                .collect();
            if available.is_empty() {
                return Err(EngineError::NotFound("entries".to_string()));
            }
            Ok(available)
        })
    }

    /// Remaining quantity per entry type, summed over the company's live
    /// entries of that type.
    ///
    /// Unknown or deleted types are left out; if no live entry matches the
    /// call fails with [`EngineError::NotFound`].
    pub async fn available_for_entry_types(
        &self,
        actor: &Actor,
        company_id: Uuid,
        entry_type_ids: &[Uuid],
    ) -> ResultEngine<BTreeMap<Uuid, Quantity>> {
        self.require_power(actor, Power::ReadOwn)?;
        with_tx!(self, |db_tx| {
            self.require_company(&db_tx, actor, company_id).await?;
            let live = self.live_entry_type_ids(&db_tx, entry_type_ids).await?;
            let snapshots = self
                .snapshot_entries_of_types(&db_tx, company_id, live)
                .await?;
            if snapshots.is_empty() {
                return Err(EngineError::NotFound("entries".to_string()));
            }
            let mut available = BTreeMap::new();
            for snapshot in snapshots {
                let total = available
                    .entry(snapshot.entry_type_id)
                    .or_insert(Quantity::ZERO);
                *total = total.try_add(snapshot.available)?;
            }
            Ok(available)
        })
    }
}
