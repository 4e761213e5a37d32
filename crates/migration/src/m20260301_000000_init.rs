//! Initial schema.
//!
//! - `companies`: owners of entries and deeds, scoped to a user
//! - `entry_types`: classification of entries
//! - `entries`: quantity lots, immutable after creation
//! - `deeds`: transactions consuming quantity
//! - `drains`: quantity of an entry consumed by a deed, one row per pair

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Companies {
    Table,
    Id,
    OwnerId,
    Longname,
    Tin,
    Rn,
    DeletedAt,
}

#[derive(Iden)]
enum EntryTypes {
    Table,
    Id,
    Code,
    Unit,
    Description,
    DeletedAt,
}

#[derive(Iden)]
enum Entries {
    Table,
    Id,
    EntryTypeId,
    CompanyId,
    QuantityMinor,
    DateAdded,
    DrainVersion,
    DeletedAt,
}

#[derive(Iden)]
enum Deeds {
    Table,
    Id,
    CompanyId,
    Title,
    QuantityMinor,
    Unit,
    UnitPriceMinor,
    DeletedAt,
}

#[derive(Iden)]
enum Drains {
    Table,
    DeedId,
    EntryId,
    QuantityMinor,
    IsDeleted,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Companies
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Companies::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Companies::OwnerId).string().not_null())
                    .col(ColumnDef::new(Companies::Longname).string().not_null())
                    .col(ColumnDef::new(Companies::Tin).string().not_null())
                    .col(ColumnDef::new(Companies::Rn).string().not_null())
                    .col(ColumnDef::new(Companies::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-companies-owner_id")
                    .table(Companies::Table)
                    .col(Companies::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Entry types
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(EntryTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EntryTypes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EntryTypes::Code).string().not_null())
                    .col(ColumnDef::new(EntryTypes::Unit).string().not_null())
                    .col(ColumnDef::new(EntryTypes::Description).string())
                    .col(ColumnDef::new(EntryTypes::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Entries::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Entries::EntryTypeId).string().not_null())
                    .col(ColumnDef::new(Entries::CompanyId).string().not_null())
                    .col(
                        ColumnDef::new(Entries::QuantityMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entries::DateAdded).timestamp().not_null())
                    .col(
                        ColumnDef::new(Entries::DrainVersion)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Entries::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-entry_type_id")
                            .from(Entries::Table, Entries::EntryTypeId)
                            .to(EntryTypes::Table, EntryTypes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-company_id")
                            .from(Entries::Table, Entries::CompanyId)
                            .to(Companies::Table, Companies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-company_id-entry_type_id")
                    .table(Entries::Table)
                    .col(Entries::CompanyId)
                    .col(Entries::EntryTypeId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Deeds
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Deeds::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deeds::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Deeds::CompanyId).string().not_null())
                    .col(ColumnDef::new(Deeds::Title).string().not_null())
                    .col(ColumnDef::new(Deeds::QuantityMinor).big_integer().not_null())
                    .col(ColumnDef::new(Deeds::Unit).string().not_null())
                    .col(
                        ColumnDef::new(Deeds::UnitPriceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Deeds::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-deeds-company_id")
                            .from(Deeds::Table, Deeds::CompanyId)
                            .to(Companies::Table, Companies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-deeds-company_id")
                    .table(Deeds::Table)
                    .col(Deeds::CompanyId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Drains
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Drains::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Drains::DeedId).string().not_null())
                    .col(ColumnDef::new(Drains::EntryId).string().not_null())
                    .col(ColumnDef::new(Drains::QuantityMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Drains::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(Index::create().col(Drains::DeedId).col(Drains::EntryId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-drains-deed_id")
                            .from(Drains::Table, Drains::DeedId)
                            .to(Deeds::Table, Deeds::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-drains-entry_id")
                            .from(Drains::Table, Drains::EntryId)
                            .to(Entries::Table, Entries::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-drains-entry_id")
                    .table(Drains::Table)
                    .col(Drains::EntryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Drains::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deeds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EntryTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        Ok(())
    }
}
