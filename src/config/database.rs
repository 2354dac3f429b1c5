//! Database configuration module.
//!
//! This module handles the `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema (including foreign keys and
//! their on-delete rules) always matches the Rust structs.

use crate::entities::{
    City, Country, KycApplication, StaffPermission, State, TeamMember, User, UserAddress,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Establishes a connection to the database at `database_url`.
///
/// `SQLite` connections are opened with foreign-key enforcement enabled, which
/// is what makes the protect/cascade/set-null rules on the entities effective.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    debug!("Ensured table {}", entity.table_name());
    Ok(())
}

/// Creates every table that does not exist yet, parents before children.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Country).await?;
    create_table(db, &schema, State).await?;
    create_table(db, &schema, City).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, UserAddress).await?;
    create_table(db, &schema, StaffPermission).await?;
    create_table(db, &schema, KycApplication).await?;
    create_table(db, &schema, TeamMember).await?;

    info!("Database tables ensured");
    Ok(())
}
