//! Entries: fixed-size lots of a resource owned by a company.
//!
//! An entry is append-only. Its `quantity` is the lot size at creation and is
//! never decremented: consumption is expressed only through
//! [`Drain`](crate::Drain) rows, so the available quantity is always
//! `quantity - sum(active drains)`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Quantity, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub entry_type_id: Uuid,
    pub company_id: Uuid,
    pub quantity: Quantity,
    pub date_added: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(
        entry_type_id: Uuid,
        company_id: Uuid,
        quantity: Quantity,
        date_added: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_type_id,
            company_id,
            quantity,
            date_added,
            deleted_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub entry_type_id: String,
    pub company_id: String,
    pub quantity_minor: i64,
    pub date_added: DateTimeUtc,
    /// Bumped every time quantity is claimed from this entry; claims are a
    /// compare-and-swap on this column.
    pub drain_version: i64,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Companies,
    #[sea_orm(
        belongs_to = "super::entry_types::Entity",
        from = "Column::EntryTypeId",
        to = "super::entry_types::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    EntryTypes,
    #[sea_orm(has_many = "super::drains::Entity")]
    Drains,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::entry_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntryTypes.def()
    }
}

impl Related<super::drains::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drains.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Entry> for ActiveModel {
    fn from(entry: &Entry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            entry_type_id: ActiveValue::Set(entry.entry_type_id.to_string()),
            company_id: ActiveValue::Set(entry.company_id.to_string()),
            quantity_minor: ActiveValue::Set(entry.quantity.minor()),
            date_added: ActiveValue::Set(entry.date_added),
            drain_version: ActiveValue::Set(0),
            deleted_at: ActiveValue::Set(entry.deleted_at),
        }
    }
}

impl TryFrom<Model> for Entry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "entry")?,
            entry_type_id: parse_uuid(&model.entry_type_id, "entry type")?,
            company_id: parse_uuid(&model.company_id, "company")?,
            quantity: Quantity::from_minor(model.quantity_minor),
            date_added: model.date_added,
            deleted_at: model.deleted_at,
        })
    }
}
