use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Actor, CreateEntryTypeCmd, DeleteCmd, EngineError, EntryType, EntryTypeFilter, Power,
    ResultEngine, entry_types,
    util::{normalize_optional_text_line, normalize_text_line},
};

use super::{
    ApplyPage, Engine, current_minute, deleted_window_condition, validate_window, with_tx,
};

/// Entry types can only be deleted while no entry uses them.
const NO_ENTRIES: &str =
    "NOT EXISTS (SELECT 1 FROM entries WHERE entries.entry_type_id = entry_types.id)";

impl Engine {
    pub async fn create_entry_type(
        &self,
        actor: &Actor,
        cmd: CreateEntryTypeCmd,
    ) -> ResultEngine<EntryType> {
        self.require_power(actor, Power::CreateOwn)?;
        let entry_type = EntryType {
            id: Uuid::new_v4(),
            code: normalize_text_line(&cmd.code, "code")?,
            unit: normalize_text_line(&cmd.unit, "unit")?,
            description: normalize_optional_text_line(cmd.description.as_deref(), "description")?,
            deleted_at: None,
        };

        with_tx!(self, |db_tx| {
            entry_types::ActiveModel::from(&entry_type)
                .insert(&db_tx)
                .await?;
            tracing::info!(entry_type_id = %entry_type.id, code = %entry_type.code, "entry type created");
            Ok(entry_type)
        })
    }

    pub async fn find_entry_type(
        &self,
        actor: &Actor,
        filter: &EntryTypeFilter,
    ) -> ResultEngine<(Vec<EntryType>, u64)> {
        self.require_power(actor, Power::ReadOwn)?;
        validate_window(&filter.deleted)?;

        with_tx!(self, |db_tx| {
            let mut query = entry_types::Entity::find().filter(deleted_window_condition(
                entry_types::Column::DeletedAt,
                &filter.deleted,
            ));
            if !filter.ids.is_empty() {
                let ids: Vec<String> = filter.ids.iter().map(ToString::to_string).collect();
                query = query.filter(entry_types::Column::Id.is_in(ids));
            }
            if let Some(code) = filter.code.as_deref() {
                query = query.filter(entry_types::Column::Code.eq(code.trim()));
            }

            let total = query.clone().count(&db_tx).await?;
            let rows = query
                .order_by_asc(entry_types::Column::Code)
                .order_by_asc(entry_types::Column::Id)
                .apply_page(filter.page)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(EntryType::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok((rows, total))
        })
    }

    /// Soft deletes, resurrects or hard deletes an entry type.
    ///
    /// Deleting (soft or hard) affects nothing while entries of the type
    /// exist. Returns the number of rows affected.
    pub async fn delete_entry_type(&self, actor: &Actor, cmd: DeleteCmd) -> ResultEngine<u64> {
        self.require_power(actor, Power::DeleteOwn)?;
        with_tx!(self, |db_tx| {
            let exists = entry_types::Entity::find_by_id(cmd.id.to_string())
                .one(&db_tx)
                .await?
                .is_some();
            if !exists {
                return Err(EngineError::NotFound("entry type".to_string()));
            }
            let affected = self.delete_entry_type_row(&db_tx, &cmd).await?;
            tracing::info!(
                entry_type_id = %cmd.id,
                hard = cmd.hard,
                resurrect = cmd.resurrect,
                affected,
                "entry type deleted"
            );
            Ok(affected)
        })
    }

    async fn delete_entry_type_row(
        &self,
        db: &DatabaseTransaction,
        cmd: &DeleteCmd,
    ) -> ResultEngine<u64> {
        let id = cmd.id.to_string();
        let result = if cmd.hard {
            entry_types::Entity::delete_many()
                .filter(entry_types::Column::Id.eq(id))
                .filter(Expr::cust(NO_ENTRIES))
                .exec(db)
                .await?
                .rows_affected
        } else if cmd.resurrect {
            entry_types::Entity::update_many()
                .col_expr(entry_types::Column::DeletedAt, Expr::cust("NULL"))
                .filter(entry_types::Column::Id.eq(id))
                .filter(entry_types::Column::DeletedAt.is_not_null())
                .exec(db)
                .await?
                .rows_affected
        } else {
            let at = cmd.at.unwrap_or_else(current_minute);
            entry_types::Entity::update_many()
                .col_expr(entry_types::Column::DeletedAt, Expr::value(at))
                .filter(entry_types::Column::Id.eq(id))
                .filter(entry_types::Column::DeletedAt.is_null())
                .filter(Expr::cust(NO_ENTRIES))
                .exec(db)
                .await?
                .rows_affected
        };
        Ok(result)
    }
}
