use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db;
use crate::error::{storage_error, StoreError};
use crate::models::{SharingConfig, SharingLevel};
use crate::schema;

/// At most one public share token per design. The upsert is Postgres-native,
/// a single atomic statement.
pub struct SharingStore {
    pool: db::DbConnectionPool,
}

impl SharingStore {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::DbConnection, StoreError> {
        self.pool.get().await.map_err(storage_error)
    }

    pub async fn upsert(
        &self,
        design_id: Uuid,
        uuid: Uuid,
        level: SharingLevel,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        let config = SharingConfig {
            design_id,
            uuid,
            level,
        };
        diesel::insert_into(schema::sharing::table)
            .values(&config)
            .on_conflict(schema::sharing::design_id)
            .do_update()
            .set((
                schema::sharing::uuid.eq(uuid),
                schema::sharing::level.eq(level),
            ))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    pub async fn get(
        &self,
        design_id: Uuid,
    ) -> Result<Option<SharingConfig>, StoreError> {
        let mut conn = self.connect().await?;
        schema::sharing::table
            .find(design_id)
            .select(SharingConfig::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(StoreError::from)
    }

    /// Token-to-config resolution for public share links.
    pub async fn get_by_uuid(
        &self,
        uuid: Uuid,
    ) -> Result<SharingConfig, StoreError> {
        let mut conn = self.connect().await?;
        schema::sharing::table
            .filter(schema::sharing::uuid.eq(uuid))
            .select(SharingConfig::as_select())
            .first(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => {
                    StoreError::not_found("Share token not found")
                }
                err => storage_error(err),
            })
    }

    /// Idempotent; clearing an unshared design is not an error.
    pub async fn clear(&self, design_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        diesel::delete(schema::sharing::table)
            .filter(schema::sharing::design_id.eq(design_id))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }
}
