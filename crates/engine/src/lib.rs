pub use actor::{Actor, Power};
pub use commands::{
    CreateCompanyCmd, CreateDeedCmd, CreateEntryCmd, CreateEntryTypeCmd, DeedFilter, DeleteCmd,
    DeletedWindow, DistributionSpec, DrainFilter, EntryFilter, EntryTypeFilter, Page,
    UpdateDeedCmd,
};
pub use companies::Company;
pub use deeds::Deed;
pub use drains::Drain;
pub use entries::Entry;
pub use entry_types::EntryType;
pub use error::{EngineError, ErrorKind, Shortfall};
pub use ops::{Engine, EngineBuilder};
pub use planner::{Candidate, Distribution, plan, shortfall};
pub use quantity::{QUANTITY_DECIMALS, Quantity};
pub use strategy::DistributeStrategy;

mod actor;
mod commands;
mod companies;
mod deeds;
mod drains;
mod entries;
mod entry_types;
mod error;
mod ops;
mod planner;
mod quantity;
mod strategy;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
