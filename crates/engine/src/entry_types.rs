//! Entry types classify entries; planning by type draws from all of them.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryType {
    pub id: Uuid,
    pub code: String,
    pub unit: String,
    pub description: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entry_types")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub unit: String,
    pub description: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&EntryType> for ActiveModel {
    fn from(entry_type: &EntryType) -> Self {
        Self {
            id: ActiveValue::Set(entry_type.id.to_string()),
            code: ActiveValue::Set(entry_type.code.clone()),
            unit: ActiveValue::Set(entry_type.unit.clone()),
            description: ActiveValue::Set(entry_type.description.clone()),
            deleted_at: ActiveValue::Set(entry_type.deleted_at),
        }
    }
}

impl TryFrom<Model> for EntryType {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "entry type")?,
            code: model.code,
            unit: model.unit,
            description: model.description,
            deleted_at: model.deleted_at,
        })
    }
}
