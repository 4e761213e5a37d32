use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Actor, Company, CreateCompanyCmd, Power, ResultEngine, companies, util::normalize_text_line,
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a company owned by the acting user.
    pub async fn create_company(
        &self,
        actor: &Actor,
        cmd: CreateCompanyCmd,
    ) -> ResultEngine<Company> {
        self.require_power(actor, Power::CreateOwn)?;
        let company = Company {
            id: Uuid::new_v4(),
            owner_id: actor.user_id.clone(),
            longname: normalize_text_line(&cmd.longname, "longname")?,
            tin: normalize_text_line(&cmd.tin, "tin")?,
            rn: normalize_text_line(&cmd.rn, "rn")?,
            deleted_at: None,
        };

        with_tx!(self, |db_tx| {
            companies::ActiveModel::from(&company).insert(&db_tx).await?;
            tracing::info!(company_id = %company.id, owner_id = %company.owner_id, "company created");
            Ok(company)
        })
    }

    /// Live companies of the actor (all of them with `DoAnything`).
    pub async fn find_company(&self, actor: &Actor) -> ResultEngine<Vec<Company>> {
        self.require_power(actor, Power::ReadOwn)?;
        with_tx!(self, |db_tx| {
            let mut query =
                companies::Entity::find().filter(companies::Column::DeletedAt.is_null());
            if !actor.is_superuser() {
                query = query.filter(companies::Column::OwnerId.eq(actor.user_id.clone()));
            }
            let rows = query
                .order_by_asc(companies::Column::Longname)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Company::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(rows)
        })
    }
}
