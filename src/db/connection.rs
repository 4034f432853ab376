use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;
use crate::errors::GuardianError;
use super::deadline::CallGuard;
use super::schema::{CREATE_TABLES, DROP_TABLES, REQUIRED_COLUMNS};
use tracing::{error, info, warn};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// What schema inspection found in an opened database.
#[derive(Debug, PartialEq)]
enum SchemaState {
    Valid,
    /// At least one table is absent; safe to create.
    Incomplete,
    /// Tables exist but lack required columns; dropping them is enough.
    Malformed(String),
    /// Page-level corruption; the file itself has to go.
    Damaged(String),
}

pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
    healthy: Arc<AtomicBool>,
}

impl Database {
    /// Open the incident log, verifying its schema.
    ///
    /// A structurally corrupt database is either recreated empty (history is
    /// lost) or rejected with a storage error, depending on `recreate_on_corruption`.
    pub fn open(
        path: &Path,
        recreate_on_corruption: bool,
        busy_timeout: Duration,
    ) -> Result<Self, GuardianError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut recovered = false;
        let mut rebuild = false;
        let mut conn = open_connection(path, busy_timeout)?;

        match inspect_schema(&conn) {
            Ok(SchemaState::Valid) => {}
            Ok(SchemaState::Incomplete) => {
                info!(path = %path.display(), "Creating LTM tables");
            }
            Ok(SchemaState::Damaged(detail)) => {
                error!(path = %path.display(), detail = %detail, "LTM integrity check failed");
                if !recreate_on_corruption {
                    return Err(GuardianError::Storage(format!(
                        "LTM database corrupt at {}: {}",
                        path.display(),
                        detail
                    )));
                }
                rebuild = true;
            }
            Ok(SchemaState::Malformed(detail)) => {
                error!(path = %path.display(), detail = %detail, "LTM schema malformed");
                if !recreate_on_corruption {
                    return Err(GuardianError::Storage(format!(
                        "LTM schema malformed at {}: {}",
                        path.display(),
                        detail
                    )));
                }
                warn!(path = %path.display(), "Dropping LTM tables, incident history is discarded");
                match conn.execute_batch(DROP_TABLES) {
                    Ok(()) => recovered = true,
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "Failed to drop malformed tables");
                        rebuild = true;
                    }
                }
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, code = ?e.sqlite_error_code(), "LTM database unreadable");
                if !recreate_on_corruption {
                    return Err(GuardianError::Storage(format!(
                        "LTM database unreadable at {}: {}",
                        path.display(),
                        e
                    )));
                }
                rebuild = true;
            }
        }

        if rebuild {
            drop(conn);
            for file in database_files(path) {
                if file.exists() {
                    warn!(path = %file.display(), "Removing corrupted LTM file, incident history is discarded");
                    std::fs::remove_file(&file)?;
                }
            }
            conn = open_connection(path, busy_timeout)?;
            recovered = true;
        }

        // WAL lets metrics readers proceed alongside the writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| GuardianError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            healthy: Arc::new(AtomicBool::new(!recovered)),
        };
        db.initialize()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, GuardianError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GuardianError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| GuardianError::Storage(format!("Failed to set pragmas: {}", e)))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            healthy: Arc::new(AtomicBool::new(true)),
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), GuardianError> {
        let conn = self.lock()?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(|e| GuardianError::Storage(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, GuardianError> {
        self.conn
            .lock()
            .map_err(|_| GuardianError::Storage("LTM connection lock poisoned".into()))
    }

    /// Wait for the connection only as long as the guard allows.
    pub(crate) fn lock_within(&self, guard: &CallGuard) -> Result<MutexGuard<'_, Connection>, GuardianError> {
        loop {
            match self.conn.try_lock() {
                Ok(conn) => return Ok(conn),
                Err(TryLockError::Poisoned(_)) => {
                    return Err(GuardianError::Storage("LTM connection lock poisoned".into()));
                }
                Err(TryLockError::WouldBlock) => {
                    if guard.expired() {
                        return Err(GuardianError::Storage("Timed out waiting for LTM connection".into()));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
            }
        }
    }

    /// Record whether the latest store operation succeeded.
    pub(crate) fn track<T>(&self, result: Result<T, GuardianError>) -> Result<T, GuardianError> {
        self.healthy.store(result.is_ok(), Ordering::SeqCst);
        result
    }

    /// False when the last open needed recovery or the last operation failed.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub fn conn(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            healthy: self.healthy.clone(),
        }
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection, GuardianError> {
    let conn = Connection::open(path)
        .map_err(|e| GuardianError::Storage(format!("Failed to open database: {}", e)))?;
    conn.busy_timeout(busy_timeout)
        .map_err(|e| GuardianError::Storage(format!("Failed to set busy timeout: {}", e)))?;
    Ok(conn)
}

/// The database file plus its WAL side files.
fn database_files(path: &Path) -> Vec<PathBuf> {
    let base = path.as_os_str().to_os_string();
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = base.clone();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}

/// Errors mean the file could not be read as a database at all.
fn inspect_schema(conn: &Connection) -> rusqlite::Result<SchemaState> {
    let integrity: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
    if integrity != "ok" {
        return Ok(SchemaState::Damaged(format!("integrity check failed: {}", integrity)));
    }

    let mut incomplete = false;
    for (table, required) in REQUIRED_COLUMNS {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        if columns.is_empty() {
            incomplete = true;
            continue;
        }
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|c| !columns.iter().any(|have| have == c))
            .collect();
        if !missing.is_empty() {
            return Ok(SchemaState::Malformed(format!(
                "table '{}' is missing columns: {}",
                table,
                missing.join(", ")
            )));
        }
    }

    Ok(if incomplete { SchemaState::Incomplete } else { SchemaState::Valid })
}
