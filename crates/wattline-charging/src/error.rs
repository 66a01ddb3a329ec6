use thiserror::Error;

/// Errors that can occur within the charging engine.
#[derive(Debug, Error)]
pub enum ChargingError {
    /// The session store rejected a read or write.
    #[error("store error: {0}")]
    Store(#[from] wattline_sessions::StoreError),
}

pub type Result<T> = std::result::Result<T, ChargingError>;
