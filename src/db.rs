use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{
    embed_migrations, EmbeddedMigrations, MigrationHarness,
};
use serde::Deserialize;

use crate::error::{storage_error, StoreError};

pub type DbConnection =
    deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub type DbConnectionPool = deadpool::managed::Pool<
    AsyncDieselConnectionManager<diesel_async::AsyncPgConnection>,
>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Deserialize, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: i32,
    pub user: String,
    pub password: String,
    pub database: String,
}

pub fn create_pool(config: &DbConfig) -> Result<DbConnectionPool, StoreError> {
    let config_string = format!(
        "host={} port={} user={} password={} dbname={}",
        config.host, config.port, config.user, config.password, config.database,
    );
    let manager =
        AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(
            config_string,
        );
    Pool::builder(manager).build().map_err(storage_error)
}

/// Runs pending migrations on a dedicated connection taken out of the pool.
/// The migration harness is synchronous, so the connection is moved onto a
/// blocking thread through `AsyncConnectionWrapper`.
pub async fn run_migrations(conn: DbConnection) -> Result<(), StoreError> {
    let mut wrapper: AsyncConnectionWrapper<AsyncPgConnection> =
        deadpool::managed::Object::take(conn).into();
    tokio::task::spawn_blocking(move || {
        wrapper
            .run_pending_migrations(MIGRATIONS)
            .map(|_| ())
            .map_err(|err| StoreError::storage(&err.to_string()))
    })
    .await
    .map_err(storage_error)?
}
