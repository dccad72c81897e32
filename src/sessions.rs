use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use log::{error, trace};
use tokio::time::{interval, Duration, MissedTickBehavior};
use uuid::Uuid;

use crate::db;
use crate::error::{storage_error, StoreError};
use crate::models::EditingSession;
use crate::schema;

/// Single-use optimistic-concurrency tokens. A session binds the document
/// version a client holds in memory to a server-issued secret; consuming it
/// is the compare-and-swap that lets exactly one of several racing clients
/// resume editing.
pub struct SessionRegistry {
    pool: db::DbConnectionPool,
}

impl SessionRegistry {
    pub fn new(pool: db::DbConnectionPool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::DbConnection, StoreError> {
        self.pool.get().await.map_err(storage_error)
    }

    pub async fn create(
        &self,
        session: EditingSession,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        diesel::insert_into(schema::editing_sessions::table)
            .values(&session)
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// Read-only check; does not consume. Returns the bound document version
    /// when the uuid/secret pair matches an unexpired row.
    pub async fn lookup(
        &self,
        uuid: Uuid,
        design_id: Uuid,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.connect().await?;
        schema::editing_sessions::table
            .filter(schema::editing_sessions::uuid.eq(uuid))
            .filter(schema::editing_sessions::design_id.eq(design_id))
            .filter(schema::editing_sessions::secret_hash.eq(secret_hash))
            .filter(schema::editing_sessions::expires_on.gt(now))
            .select(schema::editing_sessions::version)
            .first(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => {
                    StoreError::not_found("Editing session not found")
                }
                err => storage_error(err),
            })
    }

    /// Deletes the matching unexpired row. Exactly one of N racing callers
    /// gets `true`; delete-on-consume, never mark-on-consume.
    pub async fn consume(
        &self,
        uuid: Uuid,
        design_id: Uuid,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connect().await?;
        let num = diesel::delete(schema::editing_sessions::table)
            .filter(schema::editing_sessions::uuid.eq(uuid))
            .filter(schema::editing_sessions::design_id.eq(design_id))
            .filter(schema::editing_sessions::secret_hash.eq(secret_hash))
            .filter(schema::editing_sessions::expires_on.gt(now))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(num != 0)
    }

    /// Background sweep of expired rows. Expiry is otherwise passive: an
    /// expired session is already invisible to `lookup` and `consume`, the
    /// reaper only reclaims the dead rows.
    pub fn spawn_reaper(
        &self,
        every: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut conn = match pool.get().await {
                    Ok(conn) => conn,
                    Err(err) => {
                        error!("session reaper: {}", err);
                        continue;
                    }
                };
                let res = diesel::delete(schema::editing_sessions::table)
                    .filter(
                        schema::editing_sessions::expires_on.le(Utc::now()),
                    )
                    .execute(&mut conn)
                    .await;
                match res {
                    Ok(num) if num > 0 => {
                        trace!("session reaper: removed {} sessions", num)
                    }
                    Ok(_) => {}
                    Err(err) => error!("session reaper: {}", err),
                }
            }
        })
    }
}
