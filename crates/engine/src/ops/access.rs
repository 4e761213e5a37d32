use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{Actor, EngineError, Power, ResultEngine, companies, deeds, entries};

use super::Engine;

/// Generates a `require_*` method that loads a company-scoped row (live or
/// soft-deleted) and checks that the actor may reach its company.
macro_rules! impl_require_owned {
    ($require_fn:ident, $entity:path, $model:path, $label:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            actor: &Actor,
            id: Uuid,
        ) -> ResultEngine<$model> {
            let model = <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound($label.to_string()))?;
            if !actor.is_superuser() {
                let owner = self.company_owner(db, &model.company_id).await?;
                if owner.as_deref() != Some(actor.user_id.as_str()) {
                    return Err(EngineError::Unauthorized(concat!("foreign ", $label).to_string()));
                }
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_require_owned!(require_deed, deeds::Entity, deeds::Model, "deed");

    impl_require_owned!(require_entry, entries::Entity, entries::Model, "entry");

    /// `DoAnything` passes every check; otherwise the given power is needed.
    pub(super) fn require_power(&self, actor: &Actor, power: Power) -> ResultEngine<()> {
        if actor.is_superuser() || actor.can(power) {
            return Ok(());
        }
        Err(EngineError::Unauthorized(format!("missing power {power}")))
    }

    async fn company_owner(
        &self,
        db: &DatabaseTransaction,
        company_id: &str,
    ) -> ResultEngine<Option<String>> {
        Ok(companies::Entity::find_by_id(company_id.to_string())
            .one(db)
            .await?
            .map(|model| model.owner_id))
    }

    /// Loads a live company the actor may act on.
    pub(super) async fn require_company(
        &self,
        db: &DatabaseTransaction,
        actor: &Actor,
        company_id: Uuid,
    ) -> ResultEngine<companies::Model> {
        let model = companies::Entity::find_by_id(company_id.to_string())
            .filter(companies::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("company".to_string()))?;
        if !actor.is_superuser() && model.owner_id != actor.user_id {
            return Err(EngineError::Unauthorized("foreign company".to_string()));
        }
        Ok(model)
    }

    /// Ids of the companies the actor owns, or `None` when the actor is not
    /// restricted to its own companies.
    pub(super) async fn visible_company_ids(
        &self,
        db: &DatabaseTransaction,
        actor: &Actor,
    ) -> ResultEngine<Option<Vec<String>>> {
        if actor.is_superuser() {
            return Ok(None);
        }
        let ids = companies::Entity::find()
            .filter(companies::Column::OwnerId.eq(actor.user_id.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();
        Ok(Some(ids))
    }
}
