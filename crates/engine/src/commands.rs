//! Command and filter structs for engine operations.
//!
//! These types group parameters for write operations
//! (create/update/delete) and listings, keeping call sites readable and
//! avoiding long argument lists.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{DistributeStrategy, Quantity};

/// How a deed's consumption is described.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DistributionSpec {
    /// Quantity per entry id, used as is.
    Explicit(BTreeMap<Uuid, Quantity>),
    /// Quantity per entry type id, planned with `strategy`.
    ByEntryType {
        targets: BTreeMap<Uuid, Quantity>,
        strategy: DistributeStrategy,
    },
}

impl DistributionSpec {
    pub fn explicit(entries: impl IntoIterator<Item = (Uuid, Quantity)>) -> Self {
        Self::Explicit(entries.into_iter().collect())
    }

    pub fn by_entry_type(
        targets: impl IntoIterator<Item = (Uuid, Quantity)>,
        strategy: DistributeStrategy,
    ) -> Self {
        Self::ByEntryType {
            targets: targets.into_iter().collect(),
            strategy,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateCompanyCmd {
    pub longname: String,
    pub tin: String,
    pub rn: String,
}

impl CreateCompanyCmd {
    #[must_use]
    pub fn new(longname: impl Into<String>, tin: impl Into<String>, rn: impl Into<String>) -> Self {
        Self {
            longname: longname.into(),
            tin: tin.into(),
            rn: rn.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateEntryTypeCmd {
    pub code: String,
    pub unit: String,
    pub description: Option<String>,
}

impl CreateEntryTypeCmd {
    #[must_use]
    pub fn new(code: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            unit: unit.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Create an entry (a lot) for a company.
///
/// `date_added` defaults to the current minute.
#[derive(Clone, Debug)]
pub struct CreateEntryCmd {
    pub company_id: Uuid,
    pub entry_type_id: Uuid,
    pub quantity: Quantity,
    pub date_added: Option<DateTime<Utc>>,
}

impl CreateEntryCmd {
    #[must_use]
    pub fn new(company_id: Uuid, entry_type_id: Uuid, quantity: Quantity) -> Self {
        Self {
            company_id,
            entry_type_id,
            quantity,
            date_added: None,
        }
    }

    #[must_use]
    pub fn date_added(mut self, date_added: DateTime<Utc>) -> Self {
        self.date_added = Some(date_added);
        self
    }
}

/// Create a deed and its drains.
#[derive(Clone, Debug)]
pub struct CreateDeedCmd {
    pub company_id: Uuid,
    pub title: String,
    pub quantity: Quantity,
    pub unit: String,
    pub unit_price_minor: i64,
    pub distribution: DistributionSpec,
}

impl CreateDeedCmd {
    #[must_use]
    pub fn new(
        company_id: Uuid,
        title: impl Into<String>,
        quantity: Quantity,
        unit: impl Into<String>,
        distribution: DistributionSpec,
    ) -> Self {
        Self {
            company_id,
            title: title.into(),
            quantity,
            unit: unit.into(),
            unit_price_minor: 0,
            distribution,
        }
    }

    #[must_use]
    pub fn unit_price_minor(mut self, unit_price_minor: i64) -> Self {
        self.unit_price_minor = unit_price_minor;
        self
    }
}

/// Partial update of a deed. `None` fields are left untouched.
///
/// When `distribution` is set the deed's drain set is replaced as a whole.
#[derive(Clone, Debug, Default)]
pub struct UpdateDeedCmd {
    pub deed_id: Uuid,
    pub company_id: Option<Uuid>,
    pub title: Option<String>,
    pub quantity: Option<Quantity>,
    pub unit: Option<String>,
    pub unit_price_minor: Option<i64>,
    pub distribution: Option<DistributionSpec>,
}

impl UpdateDeedCmd {
    #[must_use]
    pub fn new(deed_id: Uuid) -> Self {
        Self {
            deed_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn company_id(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn unit_price_minor(mut self, unit_price_minor: i64) -> Self {
        self.unit_price_minor = Some(unit_price_minor);
        self
    }

    #[must_use]
    pub fn distribution(mut self, distribution: DistributionSpec) -> Self {
        self.distribution = Some(distribution);
        self
    }
}

/// Soft delete, resurrect or hard delete of a row.
///
/// `hard` wins over `resurrect`. `undrain` only applies to deeds: on soft
/// delete it reverses the deed's drains, on resurrect it claims them again.
/// A soft delete without `at` is stamped with the current minute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteCmd {
    pub id: Uuid,
    pub hard: bool,
    pub resurrect: bool,
    pub undrain: bool,
    pub at: Option<DateTime<Utc>>,
}

impl DeleteCmd {
    #[must_use]
    pub fn soft(id: Uuid) -> Self {
        Self {
            id,
            hard: false,
            resurrect: false,
            undrain: false,
            at: None,
        }
    }

    #[must_use]
    pub fn hard(id: Uuid) -> Self {
        Self {
            hard: true,
            ..Self::soft(id)
        }
    }

    #[must_use]
    pub fn resurrect(id: Uuid) -> Self {
        Self {
            resurrect: true,
            ..Self::soft(id)
        }
    }

    #[must_use]
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    #[must_use]
    pub fn undrain(mut self) -> Self {
        self.undrain = true;
        self
    }
}

/// Window over `deleted_at`. Without one only live rows are listed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeletedWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DeletedWindow {
    pub fn is_set(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

/// Pagination; a `limit` of 0 means no limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Clone, Debug, Default)]
pub struct DeedFilter {
    pub ids: Vec<Uuid>,
    pub company_id: Option<Uuid>,
    pub title: Option<String>,
    pub unit: Option<String>,
    pub page: Page,
    pub deleted: DeletedWindow,
}

#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    pub ids: Vec<Uuid>,
    pub company_id: Option<Uuid>,
    pub entry_type_id: Option<Uuid>,
    pub page: Page,
    pub deleted: DeletedWindow,
}

#[derive(Clone, Debug, Default)]
pub struct EntryTypeFilter {
    pub ids: Vec<Uuid>,
    pub code: Option<String>,
    pub page: Page,
    pub deleted: DeletedWindow,
}

#[derive(Clone, Debug, Default)]
pub struct DrainFilter {
    pub deed_id: Option<Uuid>,
    pub entry_id: Option<Uuid>,
    pub include_reversed: bool,
}
