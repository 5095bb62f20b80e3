// Storage schema and database management

use rusqlite::{Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database path
    pub db_path: String,

    /// Whether to enable WAL mode
    pub wal_enabled: bool,

    /// Cache size in pages
    pub cache_size_pages: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "leaccueil.db".to_string(),
            wal_enabled: true,
            cache_size_pages: Some(10000),
        }
    }
}

/// Main storage interface
///
/// Owns the single SQLite connection. The record stores borrow the
/// connection (or a transaction on it) for the duration of one operation.
pub struct Storage {
    conn: Connection,
    config: StorageConfig,
}

impl Storage {
    /// Open storage with default config
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        Self::open_with_config(path, StorageConfig::default())
    }

    /// Open storage with custom config
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StorageConfig) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, config)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> SqliteResult<Self> {
        let config = StorageConfig {
            db_path: ":memory:".to_string(),
            wal_enabled: false,
            cache_size_pages: None,
        };
        Self::from_connection(Connection::open_in_memory()?, config)
    }

    fn from_connection(conn: Connection, config: StorageConfig) -> SqliteResult<Self> {
        // Enable WAL mode for better concurrency
        if config.wal_enabled {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        // Set cache size if specified
        if let Some(cache_size) = config.cache_size_pages {
            conn.pragma_update(None, "cache_size", cache_size)?;
        }

        // Cascading deletes of history and assignments depend on this
        conn.execute_batch("PRAGMA foreign_keys = ON")?;

        let mut storage = Self { conn, config };
        storage.initialize_schema()?;

        debug!(db_path = %storage.config.db_path, "storage opened");
        Ok(storage)
    }

    /// Initialize database schema
    fn initialize_schema(&mut self) -> SqliteResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS onboarding_requests (
                id TEXT PRIMARY KEY,
                trading_name TEXT NOT NULL,
                contact_name TEXT NOT NULL,
                contact_email TEXT NOT NULL,
                contact_phone TEXT,
                company_address TEXT,
                industry TEXT,
                company_size TEXT,
                request_type TEXT,
                region TEXT,
                status TEXT NOT NULL DEFAULT 'New',
                assigned_team TEXT,
                assigned_user_id TEXT,
                completion_percentage INTEGER NOT NULL DEFAULT 0,
                reference_number TEXT NOT NULL UNIQUE,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                created_by TEXT,
                updated_by TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS status_history (
                id TEXT PRIMARY KEY,
                request_id TEXT NOT NULL,
                old_status TEXT NOT NULL,
                new_status TEXT NOT NULL,
                changed_by TEXT NOT NULL DEFAULT '',
                changed_at TEXT NOT NULL,
                notes TEXT,
                FOREIGN KEY(request_id) REFERENCES onboarding_requests(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS team_assignments (
                id TEXT PRIMARY KEY,
                request_id TEXT NOT NULL,
                team_name TEXT NOT NULL,
                assigned_user_id TEXT,
                assigned_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Pending',
                FOREIGN KEY(request_id) REFERENCES onboarding_requests(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS routing_rules (
                id TEXT PRIMARY KEY,
                rule_name TEXT NOT NULL,
                priority INTEGER NOT NULL,
                conditions TEXT NOT NULL DEFAULT '{}',
                assigned_team TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_requests_status ON onboarding_requests(status)",
            "CREATE INDEX IF NOT EXISTS idx_requests_team ON onboarding_requests(assigned_team)",
            "CREATE INDEX IF NOT EXISTS idx_requests_created ON onboarding_requests(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_history_request ON status_history(request_id)",
            "CREATE INDEX IF NOT EXISTS idx_assignments_request ON team_assignments(request_id)",
            "CREATE INDEX IF NOT EXISTS idx_rules_priority ON routing_rules(priority) WHERE is_active = 1",
        ];
        for index_sql in indexes {
            self.conn.execute(index_sql, [])?;
        }

        Ok(())
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get mutable connection
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Active configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Checkpoint the WAL into the main database file
    ///
    /// Called on graceful shutdown so the -wal and -shm files are released.
    pub fn close(&mut self) -> SqliteResult<()> {
        if self.config.wal_enabled {
            self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
        }
        Ok(())
    }
}
