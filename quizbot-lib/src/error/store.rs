//! Persistence error types

/// Errors raised by the SQLite store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Error reported by SQLite or the connection thread.
    #[error("database error: {0}")]
    Database(#[from] async_sqlite::Error),

    /// Failed to prepare the database location on disk.
    #[error("database path error: {0}")]
    Io(#[from] std::io::Error),

    /// A row that must exist was not found.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Table or entity name.
        entity: &'static str,
        /// Primary key that was looked up.
        id: i64,
    },
}
