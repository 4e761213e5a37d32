use chrono::{DateTime, Timelike, Utc};
use sea_orm::{Condition, DatabaseConnection, QuerySelect, prelude::*};

use crate::{DeletedWindow, EngineError, Page, ResultEngine};

mod access;
mod companies;
mod deeds;
mod drains;
mod entries;
mod entry_types;
mod ledger;
mod validator;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// Current time truncated to the minute, used for `date_added` and
/// `deleted_at` stamps.
fn current_minute() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

fn validate_window(window: &DeletedWindow) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (window.from, window.to)
        && from >= to
    {
        return Err(EngineError::Invalid(
            "invalid range: deleted from must be < to".to_string(),
        ));
    }
    Ok(())
}

/// Live rows without a window, soft-deleted rows in `[from, to)` with one.
fn deleted_window_condition<C: ColumnTrait>(column: C, window: &DeletedWindow) -> Condition {
    if !window.is_set() {
        return Condition::all().add(column.is_null());
    }
    let mut condition = Condition::all().add(column.is_not_null());
    if let Some(from) = window.from {
        condition = condition.add(column.gte(from));
    }
    if let Some(to) = window.to {
        condition = condition.add(column.lt(to));
    }
    condition
}

trait ApplyPage: QuerySelect + Sized {
    fn apply_page(self, page: Page) -> Self;
}

impl<T> ApplyPage for T
where
    T: QuerySelect + Sized,
{
    fn apply_page(mut self, page: Page) -> Self {
        if page.offset > 0 {
            self = self.offset(page.offset);
        }
        if page.limit > 0 {
            self = self.limit(page.limit);
        }
        self
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
