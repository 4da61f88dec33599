use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Error;

/// Stored in `PRAGMA user_version` once the posts table exists.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Creates the posts table on a fresh store and refuses stores written by a newer build.
pub fn ensure_schema(conn: &mut Connection) -> Result<(), Error> {
    match stored_version(conn)? {
        SCHEMA_VERSION => {
            debug!("Post store schema at version {}", SCHEMA_VERSION);
            Ok(())
        }
        0 => {
            info!("Creating post store schema version {}", SCHEMA_VERSION);
            let tx = conn.transaction()?;
            tx.execute_batch(SCHEMA_SQL)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;
            Ok(())
        }
        db_version => Err(Error::UnsupportedSchemaVersion {
            db_version,
            latest_supported: SCHEMA_VERSION,
        }),
    }
}

pub fn stored_version(conn: &Connection) -> Result<u32, Error> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
