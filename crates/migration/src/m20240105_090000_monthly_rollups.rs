use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MonthlyRollups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MonthlyRollups::PartnerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MonthlyRollups::Ym).string_len(6).not_null())
                    .col(
                        ColumnDef::new(MonthlyRollups::Realized)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MonthlyRollups::ToPay)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(MonthlyRollups::PartnerId)
                            .col(MonthlyRollups::Ym),
                    )
                    .check(Expr::col(MonthlyRollups::Realized).gte(0))
                    .check(Expr::col(MonthlyRollups::ToPay).gte(0))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MonthlyRollups::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum MonthlyRollups {
    Table,
    PartnerId,
    Ym,
    Realized,
    ToPay,
}
