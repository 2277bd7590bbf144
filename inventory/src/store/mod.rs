//! Store session lifecycle and the store-facing components.

pub mod applier;
pub mod backup;
pub mod reader;

use std::path::{Path, PathBuf};

use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{InventoryError, InventoryResult};

/// Filename SQLite treats as a private in-memory database.
const MEMORY_PATH: &str = ":memory:";

/// An exclusive session against the inventory store.
///
/// The session owns the single store connection for the duration of a run and
/// is passed by mutable reference to each phase — backup, page reads, and
/// mutations all go through it, and `close` releases the connection on every
/// exit path.
#[derive(Debug)]
pub struct StoreSession {
    conn: SqliteConnection,
    path: PathBuf,
}

impl StoreSession {
    /// Connects to the store, retrying a fixed number of times.
    ///
    /// Retries are immediate. Once the budget is exhausted the last driver
    /// error is returned as [`InventoryError::ConnectionFailed`]; callers
    /// never receive a half-open session.
    pub async fn connect(config: &StoreConfig) -> InventoryResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(config.create_if_missing);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match SqliteConnection::connect_with(&options).await {
                Ok(conn) => {
                    debug!(
                        path = %config.path.display(),
                        attempt,
                        "store connection established"
                    );
                    return Ok(Self {
                        conn,
                        path: config.path.clone(),
                    });
                }
                Err(error) if attempt <= config.connect_retries => {
                    warn!(
                        path = %config.path.display(),
                        attempt,
                        %error,
                        "store connection attempt failed, retrying"
                    );
                }
                Err(source) => {
                    return Err(InventoryError::ConnectionFailed {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }

    /// Returns the path of the backing database file.
    pub fn database_path(&self) -> &Path {
        &self.path
    }

    /// Returns true when the session is backed by an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    /// Returns the underlying connection.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Closes the session, releasing the store connection.
    pub async fn close(self) -> InventoryResult<()> {
        debug!(path = %self.path.display(), "closing store session");
        self.conn.close().await?;

        Ok(())
    }
}
