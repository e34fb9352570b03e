pub mod commands;
pub mod config;

pub use commands::{
    BatchUploadOutcome, CategorizeOutcome, CommandError, FileUploadResult, Ledger, ToggleOutcome,
    UploadOutcome,
};
pub use config::{AppConfig, ConfigError};
