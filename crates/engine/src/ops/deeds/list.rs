use std::collections::HashMap;

use sea_orm::{PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{Actor, Deed, DeedFilter, Distribution, Drain, Power, ResultEngine, deeds, drains};

use super::super::{ApplyPage, Engine, deleted_window_condition, validate_window, with_tx};

impl Engine {
    /// Lists deeds visible to the actor, with their active distribution.
    ///
    /// Returns the requested page and the total number of matching deeds.
    pub async fn find_deed(
        &self,
        actor: &Actor,
        filter: &DeedFilter,
    ) -> ResultEngine<(Vec<Deed>, u64)> {
        self.require_power(actor, Power::ReadOwn)?;
        validate_window(&filter.deleted)?;

        with_tx!(self, |db_tx| {
            let mut query = deeds::Entity::find()
                .filter(deleted_window_condition(deeds::Column::DeletedAt, &filter.deleted));
            if let Some(company_ids) = self.visible_company_ids(&db_tx, actor).await? {
                query = query.filter(deeds::Column::CompanyId.is_in(company_ids));
            }
            if !filter.ids.is_empty() {
                let ids: Vec<String> = filter.ids.iter().map(ToString::to_string).collect();
                query = query.filter(deeds::Column::Id.is_in(ids));
            }
            if let Some(company_id) = filter.company_id {
                query = query.filter(deeds::Column::CompanyId.eq(company_id.to_string()));
            }
            if let Some(title) = filter.title.as_deref() {
                query = query.filter(deeds::Column::Title.eq(title.trim()));
            }
            if let Some(unit) = filter.unit.as_deref() {
                query = query.filter(deeds::Column::Unit.eq(unit.trim()));
            }

            let total = query.clone().count(&db_tx).await?;
            let models = query
                .order_by_asc(deeds::Column::Title)
                .order_by_asc(deeds::Column::Id)
                .apply_page(filter.page)
                .all(&db_tx)
                .await?;

            let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
            let mut distributions: HashMap<String, Distribution> = HashMap::new();
            for drain in drains::Entity::find()
                .filter(drains::Column::DeedId.is_in(ids))
                .filter(drains::Column::IsDeleted.eq(false))
                .all(&db_tx)
                .await?
            {
                let deed_id = drain.deed_id.clone();
                let drain = Drain::try_from(drain)?;
                distributions
                    .entry(deed_id)
                    .or_default()
                    .insert(drain.entry_id, drain.quantity);
            }

            let mut rows = Vec::with_capacity(models.len());
            for model in models {
                let distribution = distributions.remove(&model.id).unwrap_or_default();
                let mut deed = Deed::try_from(model)?;
                deed.distribution = distribution;
                rows.push(deed);
            }
            Ok((rows, total))
        })
    }
}
