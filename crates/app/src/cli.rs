//! Admin command line for the engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{
    Actor, CreateCompanyCmd, CreateDeedCmd, CreateEntryCmd, CreateEntryTypeCmd, DeedFilter,
    DeleteCmd, DeletedWindow, DistributeStrategy, DistributionSpec, DrainFilter, Engine,
    EngineError, EntryFilter, EntryTypeFilter, Page, Power, Quantity, UpdateDeedCmd,
};
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "dots")]
#[command(about = "Track entries of companies and the deeds that drain them")]
pub struct Cli {
    /// Database connection string (also read from `DATABASE_URL`); overrides
    /// the configured database.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Acting user.
    #[arg(long, global = true, default_value = "admin")]
    pub user: String,

    /// Powers of the acting user (repeatable).
    #[arg(
        long = "power",
        global = true,
        default_values_t = [Power::CreateOwn, Power::ReadOwn, Power::WriteOwn, Power::DeleteOwn]
    )]
    pub powers: Vec<Power>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user.clone(), self.powers.iter().copied())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Company(Company),
    EntryType(EntryType),
    Entry(Entry),
    Deed(Deed),
    Drain(Drain),
    /// Remaining quantity per entry or per entry type.
    Available(AvailableArgs),
}

#[derive(Args, Debug)]
pub struct Company {
    #[command(subcommand)]
    command: CompanyCommand,
}

#[derive(Subcommand, Debug)]
enum CompanyCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        tin: String,
        #[arg(long)]
        rn: String,
    },
    List,
}

#[derive(Args, Debug)]
pub struct EntryType {
    #[command(subcommand)]
    command: EntryTypeCommand,
}

#[derive(Subcommand, Debug)]
enum EntryTypeCommand {
    Create {
        #[arg(long)]
        code: String,
        #[arg(long)]
        unit: String,
        #[arg(long)]
        description: Option<String>,
    },
    List {
        #[arg(long)]
        code: Option<String>,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        deleted: DeletedArgs,
    },
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct Entry {
    #[command(subcommand)]
    command: EntryCommand,
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    Create {
        #[arg(long)]
        company: Uuid,
        #[arg(long)]
        entry_type: Uuid,
        #[arg(long)]
        quantity: Quantity,
        /// RFC 3339 timestamp; defaults to the current minute.
        #[arg(long)]
        date_added: Option<DateTime<Utc>>,
    },
    List {
        #[arg(long)]
        company: Option<Uuid>,
        #[arg(long)]
        entry_type: Option<Uuid>,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        deleted: DeletedArgs,
    },
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct Deed {
    #[command(subcommand)]
    command: DeedCommand,
}

#[derive(Subcommand, Debug)]
enum DeedCommand {
    Create {
        #[arg(long)]
        company: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        quantity: Quantity,
        #[arg(long)]
        unit: String,
        /// Price per unit in minor currency units.
        #[arg(long, default_value_t = 0)]
        unit_price: i64,
        #[command(flatten)]
        distribution: DistributionArgs,
    },
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        company: Option<Uuid>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        quantity: Option<Quantity>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        unit_price: Option<i64>,
        #[command(flatten)]
        distribution: DistributionArgs,
    },
    List {
        #[arg(long = "id")]
        ids: Vec<Uuid>,
        #[arg(long)]
        company: Option<Uuid>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        deleted: DeletedArgs,
    },
    Delete {
        #[command(flatten)]
        target: DeleteArgs,
        /// Reverse drains on delete, claim them back on resurrect.
        #[arg(long)]
        undrain: bool,
    },
}

#[derive(Args, Debug)]
pub struct Drain {
    #[command(subcommand)]
    command: DrainCommand,
}

#[derive(Subcommand, Debug)]
enum DrainCommand {
    List {
        #[arg(long)]
        deed: Option<Uuid>,
        #[arg(long)]
        entry: Option<Uuid>,
        #[arg(long)]
        include_reversed: bool,
    },
}

#[derive(Args, Debug)]
pub struct AvailableArgs {
    #[arg(long)]
    company: Uuid,
    #[arg(long = "entry", conflicts_with = "entry_types", required_unless_present = "entry_types")]
    entries: Vec<Uuid>,
    #[arg(long = "entry-type")]
    entry_types: Vec<Uuid>,
}

#[derive(Args, Debug)]
struct DistributionArgs {
    /// Explicit drain, `ENTRY_ID=QUANTITY` (repeatable).
    #[arg(long = "entry", value_parser = parse_allocation, conflicts_with = "from_type")]
    entries: Vec<(Uuid, Quantity)>,
    /// Planned drain, `ENTRY_TYPE_ID=QUANTITY` (repeatable).
    #[arg(long = "from-type", value_parser = parse_allocation)]
    from_type: Vec<(Uuid, Quantity)>,
    #[arg(long, default_value_t = DistributeStrategy::default())]
    strategy: DistributeStrategy,
}

impl DistributionArgs {
    fn spec(&self) -> Option<DistributionSpec> {
        if !self.from_type.is_empty() {
            return Some(DistributionSpec::by_entry_type(
                self.from_type.iter().copied(),
                self.strategy,
            ));
        }
        if !self.entries.is_empty() {
            return Some(DistributionSpec::explicit(self.entries.iter().copied()));
        }
        None
    }
}

#[derive(Args, Debug)]
struct PageArgs {
    /// 0 means no limit.
    #[arg(long, default_value_t = 0)]
    limit: u64,
    #[arg(long, default_value_t = 0)]
    offset: u64,
}

impl From<&PageArgs> for Page {
    fn from(args: &PageArgs) -> Self {
        Page {
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[derive(Args, Debug)]
struct DeletedArgs {
    /// List soft-deleted rows deleted at or after this time.
    #[arg(long)]
    deleted_from: Option<DateTime<Utc>>,
    /// List soft-deleted rows deleted before this time.
    #[arg(long)]
    deleted_to: Option<DateTime<Utc>>,
}

impl From<&DeletedArgs> for DeletedWindow {
    fn from(args: &DeletedArgs) -> Self {
        DeletedWindow {
            from: args.deleted_from,
            to: args.deleted_to,
        }
    }
}

#[derive(Args, Debug)]
struct DeleteArgs {
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    hard: bool,
    #[arg(long, conflicts_with = "hard")]
    resurrect: bool,
}

impl DeleteArgs {
    fn cmd(&self) -> DeleteCmd {
        if self.hard {
            DeleteCmd::hard(self.id)
        } else if self.resurrect {
            DeleteCmd::resurrect(self.id)
        } else {
            DeleteCmd::soft(self.id)
        }
    }
}

fn parse_allocation(raw: &str) -> Result<(Uuid, Quantity), String> {
    let (id, quantity) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=QUANTITY, got {raw}"))?;
    let id = Uuid::parse_str(id.trim()).map_err(|err| format!("invalid id {id}: {err}"))?;
    let quantity = quantity
        .parse::<Quantity>()
        .map_err(|err| err.to_string())?;
    Ok((id, quantity))
}

fn listing<T: serde::Serialize>(rows: Vec<T>, total: u64) -> Value {
    json!({ "rows": rows, "total": total })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|err| EngineError::Invalid(err.to_string()))
}

/// Runs a data command and returns its JSON output.
pub async fn run(engine: &Engine, actor: &Actor, command: Command) -> Result<Value, EngineError> {
    match command {
        Command::Company(Company { command }) => match command {
            CompanyCommand::Create { name, tin, rn } => {
                let company = engine
                    .create_company(actor, CreateCompanyCmd::new(name, tin, rn))
                    .await?;
                to_json(&company)
            }
            CompanyCommand::List => to_json(&engine.find_company(actor).await?),
        },
        Command::EntryType(EntryType { command }) => match command {
            EntryTypeCommand::Create {
                code,
                unit,
                description,
            } => {
                let mut cmd = CreateEntryTypeCmd::new(code, unit);
                if let Some(description) = description {
                    cmd = cmd.description(description);
                }
                to_json(&engine.create_entry_type(actor, cmd).await?)
            }
            EntryTypeCommand::List {
                code,
                page,
                deleted,
            } => {
                let filter = EntryTypeFilter {
                    code,
                    page: Page::from(&page),
                    deleted: DeletedWindow::from(&deleted),
                    ..EntryTypeFilter::default()
                };
                let (rows, total) = engine.find_entry_type(actor, &filter).await?;
                Ok(listing(rows, total))
            }
            EntryTypeCommand::Delete(args) => {
                let affected = engine.delete_entry_type(actor, args.cmd()).await?;
                Ok(json!({ "affected": affected }))
            }
        },
        Command::Entry(Entry { command }) => match command {
            EntryCommand::Create {
                company,
                entry_type,
                quantity,
                date_added,
            } => {
                let mut cmd = CreateEntryCmd::new(company, entry_type, quantity);
                if let Some(date_added) = date_added {
                    cmd = cmd.date_added(date_added);
                }
                to_json(&engine.create_entry(actor, cmd).await?)
            }
            EntryCommand::List {
                company,
                entry_type,
                page,
                deleted,
            } => {
                let filter = EntryFilter {
                    company_id: company,
                    entry_type_id: entry_type,
                    page: Page::from(&page),
                    deleted: DeletedWindow::from(&deleted),
                    ..EntryFilter::default()
                };
                let (rows, total) = engine.find_entry(actor, &filter).await?;
                Ok(listing(rows, total))
            }
            EntryCommand::Delete(args) => {
                let affected = engine.delete_entry(actor, args.cmd()).await?;
                Ok(json!({ "affected": affected }))
            }
        },
        Command::Deed(Deed { command }) => match command {
            DeedCommand::Create {
                company,
                title,
                quantity,
                unit,
                unit_price,
                distribution,
            } => {
                let spec = distribution
                    .spec()
                    .unwrap_or_else(|| DistributionSpec::Explicit(BTreeMap::new()));
                let cmd = CreateDeedCmd::new(company, title, quantity, unit, spec)
                    .unit_price_minor(unit_price);
                to_json(&engine.create_deed(actor, cmd).await?)
            }
            DeedCommand::Update {
                id,
                company,
                title,
                quantity,
                unit,
                unit_price,
                distribution,
            } => {
                let cmd = UpdateDeedCmd {
                    deed_id: id,
                    company_id: company,
                    title,
                    quantity,
                    unit,
                    unit_price_minor: unit_price,
                    distribution: distribution.spec(),
                };
                to_json(&engine.update_deed(actor, cmd).await?)
            }
            DeedCommand::List {
                ids,
                company,
                title,
                unit,
                page,
                deleted,
            } => {
                let filter = DeedFilter {
                    ids,
                    company_id: company,
                    title,
                    unit,
                    page: Page::from(&page),
                    deleted: DeletedWindow::from(&deleted),
                };
                let (rows, total) = engine.find_deed(actor, &filter).await?;
                Ok(listing(rows, total))
            }
            DeedCommand::Delete { target, undrain } => {
                let mut cmd = target.cmd();
                if undrain {
                    cmd = cmd.undrain();
                }
                let affected = engine.delete_deed(actor, cmd).await?;
                Ok(json!({ "affected": affected }))
            }
        },
        Command::Drain(Drain {
            command:
                DrainCommand::List {
                    deed,
                    entry,
                    include_reversed,
                },
        }) => {
            let filter = DrainFilter {
                deed_id: deed,
                entry_id: entry,
                include_reversed,
            };
            to_json(&engine.find_drain(actor, &filter).await?)
        }
        Command::Available(args) => {
            let available = if args.entry_types.is_empty() {
                engine
                    .available_for_entries(actor, args.company, &args.entries)
                    .await?
            } else {
                engine
                    .available_for_entry_types(actor, args.company, &args.entry_types)
                    .await?
            };
            to_json(&available)
        }
    }
}

/// JSON body printed on failure.
pub fn error_body(err: &EngineError) -> Value {
    json!({
        "error": err.kind(),
        "message": err.public_message(),
        "shortfall": err.shortfall(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_parse_id_and_quantity() {
        let id = Uuid::new_v4();
        let (got_id, qty) = parse_allocation(&format!("{id}=12,5")).unwrap();
        assert_eq!(got_id, id);
        assert_eq!(qty, "12.5".parse::<Quantity>().unwrap());
        assert!(parse_allocation("not-a-pair").is_err());
        assert!(parse_allocation(&format!("{id}=1.0000001")).is_err());
    }

    #[test]
    fn deed_create_accepts_type_level_distribution() {
        let et = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "dots",
            "deed",
            "create",
            "--company",
            &Uuid::new_v4().to_string(),
            "--title",
            "cut",
            "--quantity",
            "120",
            "--unit",
            "kg",
            "--from-type",
            &format!("{et}=120"),
            "--strategy",
            "old_many",
        ])
        .unwrap();
        let Command::Deed(Deed {
            command: DeedCommand::Create { distribution, .. },
        }) = cli.command
        else {
            panic!("expected deed create");
        };
        assert_eq!(
            distribution.spec(),
            Some(DistributionSpec::by_entry_type(
                [(et, Quantity::from_units(120))],
                DistributeStrategy::OldMany
            ))
        );
    }

    #[test]
    fn unknown_strategy_is_a_usage_error() {
        let result = Cli::try_parse_from([
            "dots",
            "deed",
            "create",
            "--company",
            &Uuid::new_v4().to_string(),
            "--title",
            "cut",
            "--quantity",
            "1",
            "--unit",
            "kg",
            "--strategy",
            "newest",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn powers_default_to_own_capabilities() {
        let cli = Cli::try_parse_from(["dots", "--user", "alice", "company", "list"]).unwrap();
        let actor = cli.actor();
        assert_eq!(actor, Actor::owner("alice"));
    }

    #[test]
    fn migrations_are_not_a_subcommand() {
        let err = Cli::try_parse_from(["dots", "migrate"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn error_body_carries_kind_and_shortfall() {
        let id = Uuid::new_v4();
        let err = engine::EngineError::Conflict {
            message: "not enough quantity".to_string(),
            shortfall: BTreeMap::from([(id, Quantity::from_units(50))]),
        };
        let body = error_body(&err);
        assert_eq!(body["error"], "conflict");
        assert_eq!(body["shortfall"][id.to_string()], 50.0);
    }
}
