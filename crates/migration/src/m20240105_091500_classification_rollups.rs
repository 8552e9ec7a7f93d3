use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClassificationRollups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClassificationRollups::PartnerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassificationRollups::Ym)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassificationRollups::CategoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassificationRollups::SubCategoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassificationRollups::Realized)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ClassificationRollups::CategoryLabel)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassificationRollups::SubCategoryLabel)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ClassificationRollups::PartnerId)
                            .col(ClassificationRollups::Ym)
                            .col(ClassificationRollups::CategoryId)
                            .col(ClassificationRollups::SubCategoryId),
                    )
                    .check(Expr::col(ClassificationRollups::Realized).gte(0))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClassificationRollups::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ClassificationRollups {
    Table,
    PartnerId,
    Ym,
    CategoryId,
    SubCategoryId,
    Realized,
    CategoryLabel,
    SubCategoryLabel,
}
