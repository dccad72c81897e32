use tokio::time::Duration;

use crate::acl::AclStore;
use crate::config::HubConfig;
use crate::content::ContentStore;
use crate::db;
use crate::designs::DesignStore;
use crate::error::{storage_error, StoreError};
use crate::invites::InviteStore;
use crate::sessions::SessionRegistry;
use crate::sharing::SharingStore;

/// Facade over the whole store: owns the connection pool and hands every
/// component the same visibility policy. The embedding service calls
/// `run_migrations` and `start_session_reaper` once at boot.
pub struct Hub {
    pool: db::DbConnectionPool,
    reaper_interval: Duration,
    pub designs: DesignStore,
    pub content: ContentStore,
    pub acl: AclStore,
    pub sessions: SessionRegistry,
    pub invites: InviteStore,
    pub sharing: SharingStore,
}

impl Hub {
    pub fn new(config: HubConfig) -> Result<Self, StoreError> {
        let pool = db::create_pool(&config.db)?;
        let visibility = config.visibility;
        Ok(Self {
            designs: DesignStore::new(pool.clone(), visibility),
            content: ContentStore::new(pool.clone(), visibility),
            acl: AclStore::new(pool.clone(), visibility),
            sessions: SessionRegistry::new(pool.clone()),
            invites: InviteStore::new(pool.clone(), visibility),
            sharing: SharingStore::new(pool.clone()),
            reaper_interval: Duration::from_secs(
                config.session_reaper_interval_secs,
            ),
            pool,
        })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.pool.get().await.map_err(storage_error)?;
        db::run_migrations(conn).await
    }

    pub fn start_session_reaper(&self) -> tokio::task::JoinHandle<()> {
        self.sessions.spawn_reaper(self.reaper_interval)
    }
}
