//! Companies own entries and deeds and scope every ownership check.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    /// User that owns the company (the tenant).
    pub owner_id: String,
    pub longname: String,
    /// Tax identification number.
    pub tin: String,
    /// Registration number.
    pub rn: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub longname: String,
    pub tin: String,
    pub rn: String,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
    #[sea_orm(has_many = "super::deeds::Entity")]
    Deeds,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl Related<super::deeds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deeds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Company> for ActiveModel {
    fn from(company: &Company) -> Self {
        Self {
            id: ActiveValue::Set(company.id.to_string()),
            owner_id: ActiveValue::Set(company.owner_id.clone()),
            longname: ActiveValue::Set(company.longname.clone()),
            tin: ActiveValue::Set(company.tin.clone()),
            rn: ActiveValue::Set(company.rn.clone()),
            deleted_at: ActiveValue::Set(company.deleted_at),
        }
    }
}

impl TryFrom<Model> for Company {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "company")?,
            owner_id: model.owner_id,
            longname: model.longname,
            tin: model.tin,
            rn: model.rn,
            deleted_at: model.deleted_at,
        })
    }
}
