use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    Actor, CreateEntryCmd, DeleteCmd, EngineError, Entry, EntryFilter, Power, ResultEngine,
    entries, entry_types, util::ensure_positive,
};

use super::{
    ApplyPage, Engine, current_minute, deleted_window_condition, validate_window, with_tx,
};

/// Entries can only be deleted while no drain, active or reversed, points
/// at them.
const NO_DRAINS: &str = "NOT EXISTS (SELECT 1 FROM drains WHERE drains.entry_id = entries.id)";

impl Engine {
    /// Adds a lot to a company. Entries are immutable afterwards.
    pub async fn create_entry(&self, actor: &Actor, cmd: CreateEntryCmd) -> ResultEngine<Entry> {
        self.require_power(actor, Power::CreateOwn)?;
        ensure_positive(cmd.quantity, "entry quantity")?;

        with_tx!(self, |db_tx| {
            self.require_company(&db_tx, actor, cmd.company_id).await?;
            entry_types::Entity::find_by_id(cmd.entry_type_id.to_string())
                .filter(entry_types::Column::DeletedAt.is_null())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("entry type".to_string()))?;

            let date_added = cmd.date_added.unwrap_or_else(current_minute);
            let entry = Entry::new(cmd.entry_type_id, cmd.company_id, cmd.quantity, date_added);
            entries::ActiveModel::from(&entry).insert(&db_tx).await?;

            tracing::info!(
                entry_id = %entry.id,
                company_id = %entry.company_id,
                quantity = %entry.quantity,
                "entry created"
            );
            Ok(entry)
        })
    }

    /// Lists entries of the actor's companies.
    ///
    /// Returns the requested page and the total number of matching entries.
    pub async fn find_entry(
        &self,
        actor: &Actor,
        filter: &EntryFilter,
    ) -> ResultEngine<(Vec<Entry>, u64)> {
        self.require_power(actor, Power::ReadOwn)?;
        validate_window(&filter.deleted)?;

        with_tx!(self, |db_tx| {
            let mut query = entries::Entity::find().filter(deleted_window_condition(
                entries::Column::DeletedAt,
                &filter.deleted,
            ));
            if let Some(company_ids) = self.visible_company_ids(&db_tx, actor).await? {
                query = query.filter(entries::Column::CompanyId.is_in(company_ids));
            }
            if !filter.ids.is_empty() {
                let ids: Vec<String> = filter.ids.iter().map(ToString::to_string).collect();
                query = query.filter(entries::Column::Id.is_in(ids));
            }
            if let Some(company_id) = filter.company_id {
                query = query.filter(entries::Column::CompanyId.eq(company_id.to_string()));
            }
            if let Some(entry_type_id) = filter.entry_type_id {
                query = query.filter(entries::Column::EntryTypeId.eq(entry_type_id.to_string()));
            }

            let total = query.clone().count(&db_tx).await?;
            let rows = query
                .order_by_asc(entries::Column::DateAdded)
                .order_by_asc(entries::Column::Id)
                .apply_page(filter.page)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Entry::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok((rows, total))
        })
    }

    /// Soft deletes, resurrects or hard deletes an entry.
    ///
    /// Deleting (soft or hard) affects nothing while drains reference the
    /// entry. Returns the number of rows affected.
    pub async fn delete_entry(&self, actor: &Actor, cmd: DeleteCmd) -> ResultEngine<u64> {
        self.require_power(actor, Power::DeleteOwn)?;
        with_tx!(self, |db_tx| {
            self.require_entry(&db_tx, actor, cmd.id).await?;
            let affected = self.delete_entry_row(&db_tx, &cmd).await?;
            tracing::info!(
                entry_id = %cmd.id,
                hard = cmd.hard,
                resurrect = cmd.resurrect,
                affected,
                "entry deleted"
            );
            Ok(affected)
        })
    }

    async fn delete_entry_row(&self, db: &DatabaseTransaction, cmd: &DeleteCmd) -> ResultEngine<u64> {
        let id = cmd.id.to_string();
        let affected = if cmd.hard {
            entries::Entity::delete_many()
                .filter(entries::Column::Id.eq(id))
                .filter(Expr::cust(NO_DRAINS))
                .exec(db)
                .await?
                .rows_affected
        } else if cmd.resurrect {
            entries::Entity::update_many()
                .col_expr(entries::Column::DeletedAt, Expr::cust("NULL"))
                .filter(entries::Column::Id.eq(id))
                .filter(entries::Column::DeletedAt.is_not_null())
                .exec(db)
                .await?
                .rows_affected
        } else {
            let at = cmd.at.unwrap_or_else(current_minute);
            entries::Entity::update_many()
                .col_expr(entries::Column::DeletedAt, Expr::value(at))
                .filter(entries::Column::Id.eq(id))
                .filter(entries::Column::DeletedAt.is_null())
                .filter(Expr::cust(NO_DRAINS))
                .exec(db)
                .await?
                .rows_affected
        };
        Ok(affected)
    }
}
