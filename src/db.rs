use crate::config::{DatabaseConfig, STORE_DEADLINE};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::time::Duration;

pub type ConnectionPool = Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum DatabaseError {
    Migration(#[from] Box<dyn std::error::Error + Send + Sync>),
    Pool(#[from] diesel::r2d2::PoolError),
}

/// Builds the connection pool. Every connection handed out by the pool cancels
/// statements that run longer than the metadata deadline.
pub fn create_pool(config: &DatabaseConfig) -> Result<ConnectionPool, DatabaseError> {
    let manager = ConnectionManager::new(config.url());
    Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(STORE_DEADLINE)
        .test_on_check_out(true)
        .connection_customizer(Box::new(StatementTimeout(STORE_DEADLINE)))
        .build(manager)
        .map_err(DatabaseError::from)
}

/// Runs embedded migrations on a connection checked out of `pool`.
pub fn migrate(pool: &ConnectionPool) -> Result<(), DatabaseError> {
    let mut conn = pool.get()?;
    run_migrations(&mut conn)
}

/// Runs embedded migrations on the database.
pub fn run_migrations(conn: &mut PgConnection) -> Result<(), DatabaseError> {
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct StatementTimeout(pub Duration);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        let query = format!("SET statement_timeout = {}", self.0.as_millis());
        diesel::sql_query(query)
            .execute(conn)
            .map(|_| ())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}
