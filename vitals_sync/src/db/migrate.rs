//! Embedded schema migrations.

use anyhow::anyhow;
use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Embedded Diesel migrations bundled with this crate.
///
/// Applied by [`run_sqlite`] to bring the database schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations on the SQLite database at the given URL.
///
/// Sets the journal mode to WAL first so the very first boot already
/// creates the database in the mode every later connection expects.
pub fn run_sqlite(url: &str) -> anyhow::Result<()> {
    let mut conn = SqliteConnection::establish(url)?;
    conn.batch_execute("PRAGMA journal_mode=WAL;")?;
    conn.run_pending_migrations(MIGRATIONS).map_err(|e| anyhow!(e))?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn migrations_apply_on_temp_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path().to_string_lossy().to_string();

        run_sqlite(&path).expect("migration run");

        let mut conn = SqliteConnection::establish(&path).unwrap();
        conn.batch_execute(
            "INSERT INTO raw_vitals \
             (user_id, metric_type, value, unit, start_ts, end_ts, data_source, created_at, updated_at) \
             VALUES (1, 'heart_rate', 72.0, 'bpm', '2025-01-01T08:00:00Z', '2025-01-01T08:00:00Z', \
                     'device_sync', '2025-01-01T08:00:01Z', '2025-01-01T08:00:01Z')",
        )
        .unwrap();
    }
}
