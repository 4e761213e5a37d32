use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, TransactionTrait, Value, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{Actor, DeleteCmd, Power, ResultEngine, deeds, drains, util::parse_uuid};

use super::super::{Engine, current_minute, with_tx};

impl Engine {
    /// Soft deletes, resurrects or hard deletes a deed and returns the number
    /// of deed rows affected.
    ///
    /// - soft delete stamps `deleted_at`; with `undrain` the deed's drains are
    ///   reversed and their quantity is available again.
    /// - resurrect clears `deleted_at`; with `undrain` the reversed drains are
    ///   claimed again, which fails with a conflict if the entries no longer
    ///   have enough left.
    /// - hard delete removes reversed drains and then the deed, only if no
    ///   active drain is left.
    ///
    /// Deleting an already deleted deed (or resurrecting a live one) affects
    /// nothing and returns 0.
    pub async fn delete_deed(&self, actor: &Actor, cmd: DeleteCmd) -> ResultEngine<u64> {
        self.require_power(actor, Power::DeleteOwn)?;
        with_tx!(self, |db_tx| {
            let model = self.require_deed(&db_tx, actor, cmd.id).await?;
            let company_id = parse_uuid(&model.company_id, "company")?;

            let affected = if cmd.hard {
                self.hard_delete_deed(&db_tx, cmd.id).await?
            } else if cmd.resurrect {
                self.resurrect_deed(&db_tx, cmd.id, company_id, cmd.undrain)
                    .await?
            } else {
                let at = cmd.at.unwrap_or_else(current_minute);
                self.soft_delete_deed(&db_tx, cmd.id, at, cmd.undrain)
                    .await?
            };

            tracing::info!(
                deed_id = %cmd.id,
                hard = cmd.hard,
                resurrect = cmd.resurrect,
                undrain = cmd.undrain,
                affected,
                "deed deleted"
            );
            Ok(affected)
        })
    }

    async fn soft_delete_deed(
        &self,
        db: &DatabaseTransaction,
        deed_id: Uuid,
        at: DateTime<Utc>,
        undrain: bool,
    ) -> ResultEngine<u64> {
        let affected = deeds::Entity::update_many()
            .col_expr(deeds::Column::DeletedAt, Expr::value(at))
            .filter(deeds::Column::Id.eq(deed_id.to_string()))
            .filter(deeds::Column::DeletedAt.is_null())
            .exec(db)
            .await?
            .rows_affected;
        if affected > 0 && undrain {
            self.set_drains_reversed(db, deed_id, true).await?;
        }
        Ok(affected)
    }

    async fn resurrect_deed(
        &self,
        db: &DatabaseTransaction,
        deed_id: Uuid,
        company_id: Uuid,
        undrain: bool,
    ) -> ResultEngine<u64> {
        let affected = deeds::Entity::update_many()
            .col_expr(deeds::Column::DeletedAt, Expr::cust("NULL"))
            .filter(deeds::Column::Id.eq(deed_id.to_string()))
            .filter(deeds::Column::DeletedAt.is_not_null())
            .exec(db)
            .await?
            .rows_affected;
        if affected == 0 || !undrain {
            return Ok(affected);
        }

        let reversed = self.drains_of_deed(db, deed_id, true).await?;
        if !reversed.is_empty() {
            let snapshots = self
                .validate_distribution(db, company_id, &reversed)
                .await?;
            self.claim_entries(db, &reversed, &snapshots).await?;
            self.set_drains_reversed(db, deed_id, false).await?;
        }
        Ok(affected)
    }

    async fn hard_delete_deed(&self, db: &DatabaseTransaction, deed_id: Uuid) -> ResultEngine<u64> {
        let id = deed_id.to_string();
        drains::Entity::delete_many()
            .filter(drains::Column::DeedId.eq(id.clone()))
            .filter(drains::Column::IsDeleted.eq(true))
            .filter(Expr::cust_with_values(
                "NOT EXISTS (SELECT 1 FROM drains AS active \
                 WHERE active.deed_id = ? AND active.is_deleted = ?)",
                [Value::from(id.clone()), Value::from(false)],
            ))
            .exec(db)
            .await?;

        let result = deeds::Entity::delete_many()
            .filter(deeds::Column::Id.eq(id))
            .filter(Expr::cust_with_values(
                "NOT EXISTS (SELECT 1 FROM drains \
                 WHERE drains.deed_id = deeds.id AND drains.is_deleted = ?)",
                [false],
            ))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
