//! Tables backing the SQL flavour of the Aggregate Store.
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CacheEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CacheEntries::CacheKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CacheEntries::Payload).blob().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CacheHashFields::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CacheHashFields::CacheKey).string().not_null())
                    .col(ColumnDef::new(CacheHashFields::Field).string().not_null())
                    .col(
                        ColumnDef::new(CacheHashFields::Amount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(CacheHashFields::CacheKey)
                            .col(CacheHashFields::Field),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CacheHashFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CacheEntries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CacheEntries {
    Table,
    CacheKey,
    Payload,
}

#[derive(Iden)]
enum CacheHashFields {
    Table,
    CacheKey,
    Field,
    Amount,
}
