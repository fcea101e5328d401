use armory_core::ClientError;
use armory_core::config::ConfigError;
use armory_core::error::ScanFlowError;
use armory_core::scan::ScanError;
use armory_core::storage::StorageError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),

    #[error("Config::{}", .0)]
    Config(#[from] ConfigError),

    #[error("Storage::{}", .0)]
    Storage(#[from] StorageError),

    #[error("{}", .0)]
    Scan(ScanError),

    #[error("Scan cancelled")]
    Cancelled,
}

impl From<ScanFlowError> for Error {
    fn from(e: ScanFlowError) -> Self {
        match e {
            ScanFlowError::Scan(e) => Error::Scan(e),
            ScanFlowError::Cancelled => Error::Cancelled,
            ScanFlowError::Client(e) => Error::Client(e),
        }
    }
}
