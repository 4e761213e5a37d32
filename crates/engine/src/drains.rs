//! Drains: how much of an entry a deed consumed.
//!
//! There is at most one row per `(deed_id, entry_id)`. `is_deleted` is the
//! reversal flag: a reversed drain gives its quantity back to the entry
//! without losing the record, so it can be claimed again on resurrect.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Quantity, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drain {
    pub deed_id: Uuid,
    pub entry_id: Uuid,
    pub quantity: Quantity,
    pub is_deleted: bool,
}

impl Drain {
    pub fn active(deed_id: Uuid, entry_id: Uuid, quantity: Quantity) -> Self {
        Self {
            deed_id,
            entry_id,
            quantity,
            is_deleted: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "drains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub deed_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub entry_id: String,
    pub quantity_minor: i64,
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deeds::Entity",
        from = "Column::DeedId",
        to = "super::deeds::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Deeds,
    #[sea_orm(
        belongs_to = "super::entries::Entity",
        from = "Column::EntryId",
        to = "super::entries::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Entries,
}

impl Related<super::deeds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deeds.def()
    }
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Drain> for ActiveModel {
    fn from(drain: &Drain) -> Self {
        Self {
            deed_id: ActiveValue::Set(drain.deed_id.to_string()),
            entry_id: ActiveValue::Set(drain.entry_id.to_string()),
            quantity_minor: ActiveValue::Set(drain.quantity.minor()),
            is_deleted: ActiveValue::Set(drain.is_deleted),
        }
    }
}

impl TryFrom<Model> for Drain {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            deed_id: parse_uuid(&model.deed_id, "deed")?,
            entry_id: parse_uuid(&model.entry_id, "entry")?,
            quantity: Quantity::from_minor(model.quantity_minor),
            is_deleted: model.is_deleted,
        })
    }
}
