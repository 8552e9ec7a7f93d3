use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveValue, DatabaseConnection, QueryFilter, TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict},
};

use super::{AggregateStore, ResultStore};
use crate::AggregateStoreError;

mod cache_entries {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "cache_entries")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub cache_key: String,
        pub payload: Vec<u8>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

mod cache_hash_fields {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "cache_hash_fields")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub cache_key: String,
        #[sea_orm(primary_key, auto_increment = false)]
        pub field: String,
        pub amount: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Aggregate Store persisted in a relational database through `sea-orm`.
///
/// Byte values live in `cache_entries`, hash fields in `cache_hash_fields`
/// (both created by the `migration` crate). The connection may point at the
/// ledger database or at a dedicated one.
#[derive(Clone, Debug)]
pub struct SqlAggregateStore {
    database: DatabaseConnection,
}

impl SqlAggregateStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

fn unavailable(err: DbErr) -> AggregateStoreError {
    AggregateStoreError::Unavailable(err.to_string())
}

fn hash_field(key: &str, field: &str, amount: i64) -> cache_hash_fields::ActiveModel {
    cache_hash_fields::ActiveModel {
        cache_key: ActiveValue::Set(key.to_string()),
        field: ActiveValue::Set(field.to_string()),
        amount: ActiveValue::Set(amount),
    }
}

#[async_trait]
impl AggregateStore for SqlAggregateStore {
    async fn get(&self, key: &str) -> ResultStore<Option<Vec<u8>>> {
        let model = cache_entries::Entity::find_by_id(key.to_string())
            .one(&self.database)
            .await
            .map_err(unavailable)?;
        Ok(model.map(|m| m.payload))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> ResultStore<()> {
        let entry = cache_entries::ActiveModel {
            cache_key: ActiveValue::Set(key.to_string()),
            payload: ActiveValue::Set(value),
        };
        cache_entries::Entity::insert(entry)
            .on_conflict(
                OnConflict::column(cache_entries::Column::CacheKey)
                    .update_column(cache_entries::Column::Payload)
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> ResultStore<()> {
        let db_tx = self.database.begin().await.map_err(unavailable)?;
        cache_entries::Entity::delete_many()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .exec(&db_tx)
            .await
            .map_err(unavailable)?;
        cache_hash_fields::Entity::delete_many()
            .filter(cache_hash_fields::Column::CacheKey.eq(key))
            .exec(&db_tx)
            .await
            .map_err(unavailable)?;
        db_tx.commit().await.map_err(unavailable)
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> ResultStore<i64> {
        let db_tx = self.database.begin().await.map_err(unavailable)?;
        cache_hash_fields::Entity::insert(hash_field(key, field, delta))
            .on_conflict(
                OnConflict::columns([
                    cache_hash_fields::Column::CacheKey,
                    cache_hash_fields::Column::Field,
                ])
                .value(
                    cache_hash_fields::Column::Amount,
                    Expr::cust_with_values("\"amount\" + ?", [delta]),
                )
                .to_owned(),
            )
            .exec_without_returning(&db_tx)
            .await
            .map_err(unavailable)?;
        let model = cache_hash_fields::Entity::find_by_id((key.to_string(), field.to_string()))
            .one(&db_tx)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| {
                AggregateStoreError::Corrupt(format!("{key}/{field} vanished after increment"))
            })?;
        db_tx.commit().await.map_err(unavailable)?;
        Ok(model.amount)
    }

    async fn hash_set(&self, key: &str, field: &str, value: i64) -> ResultStore<()> {
        cache_hash_fields::Entity::insert(hash_field(key, field, value))
            .on_conflict(
                OnConflict::columns([
                    cache_hash_fields::Column::CacheKey,
                    cache_hash_fields::Column::Field,
                ])
                .update_column(cache_hash_fields::Column::Amount)
                .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> ResultStore<Option<i64>> {
        let model = cache_hash_fields::Entity::find_by_id((key.to_string(), field.to_string()))
            .one(&self.database)
            .await
            .map_err(unavailable)?;
        Ok(model.map(|m| m.amount))
    }

    async fn hash_del(&self, key: &str, field: &str) -> ResultStore<()> {
        cache_hash_fields::Entity::delete_by_id((key.to_string(), field.to_string()))
            .exec(&self.database)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> ResultStore<HashMap<String, i64>> {
        let models = cache_hash_fields::Entity::find()
            .filter(cache_hash_fields::Column::CacheKey.eq(key))
            .all(&self.database)
            .await
            .map_err(unavailable)?;
        Ok(models.into_iter().map(|m| (m.field, m.amount)).collect())
    }
}
