pub use sea_orm_migration::prelude::*;

mod m20240105_090000_monthly_rollups;
mod m20240105_091500_classification_rollups;
mod m20240212_120000_cache_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240105_090000_monthly_rollups::Migration),
            Box::new(m20240105_091500_classification_rollups::Migration),
            Box::new(m20240212_120000_cache_tables::Migration),
        ]
    }
}
