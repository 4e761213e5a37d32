//! Deeds: transactions that consume quantity from entries.
//!
//! A `Deed` carries its persisted distribution, i.e. the set of its
//! currently active drains keyed by entry id.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Distribution, EngineError, Quantity, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deed {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub quantity: Quantity,
    pub unit: String,
    /// Price per unit in minor currency units (e.g. cents).
    pub unit_price_minor: i64,
    pub distribution: Distribution,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deeds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub company_id: String,
    pub title: String,
    pub quantity_minor: i64,
    pub unit: String,
    pub unit_price_minor: i64,
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
    #[sea_orm(has_many = "super::drains::Entity")]
    Drains,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::drains::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drains.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Deed> for ActiveModel {
    fn from(deed: &Deed) -> Self {
        Self {
            id: ActiveValue::Set(deed.id.to_string()),
            company_id: ActiveValue::Set(deed.company_id.to_string()),
            title: ActiveValue::Set(deed.title.clone()),
            quantity_minor: ActiveValue::Set(deed.quantity.minor()),
            unit: ActiveValue::Set(deed.unit.clone()),
            unit_price_minor: ActiveValue::Set(deed.unit_price_minor),
            deleted_at: ActiveValue::Set(deed.deleted_at),
        }
    }
}

impl TryFrom<Model> for Deed {
    type Error = EngineError;

    /// The distribution is left empty; drains are loaded separately.
    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "deed")?,
            company_id: parse_uuid(&model.company_id, "company")?,
            title: model.title,
            quantity: Quantity::from_minor(model.quantity_minor),
            unit: model.unit,
            unit_price_minor: model.unit_price_minor,
            distribution: Distribution::new(),
            deleted_at: model.deleted_at,
        })
    }
}
