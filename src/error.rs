/// Centralized error types for the market session board
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown timezone '{zone}' for market {market}")]
    UnknownTimeZone { market: String, zone: String },

    #[error("Invalid market {id}: {reason}")]
    InvalidMarket { id: String, reason: String },

    #[error("Invalid holiday '{name}': {reason}")]
    InvalidHoliday { name: String, reason: String },

    #[error("Duplicate market id: {0}")]
    DuplicateMarket(String),

    #[error("Settings error: {0}")]
    Settings(#[from] ::config::ConfigError),

    #[error("Calendar parse failed: {0}")]
    Toml(#[from] toml::de::Error),

    // Presentation Errors
    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),

    // Persistence Errors
    #[error("Preference (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Errors raised while loading markets, holidays or settings.
    /// None of these can happen once the registry is built.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SessionError::ConfigError(_)
                | SessionError::UnknownTimeZone { .. }
                | SessionError::InvalidMarket { .. }
                | SessionError::InvalidHoliday { .. }
                | SessionError::DuplicateMarket(_)
                | SessionError::Settings(_)
                | SessionError::Toml(_)
        )
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &str {
        match self {
            SessionError::ConfigError(_) => "CFG_001",
            SessionError::Settings(_) => "CFG_002",
            SessionError::Toml(_) => "CFG_003",
            SessionError::UnknownTimeZone { .. } => "TZ_001",
            SessionError::InvalidMarket { .. } => "MKT_001",
            SessionError::DuplicateMarket(_) => "MKT_002",
            SessionError::InvalidHoliday { .. } => "HOL_001",
            SessionError::UnknownLanguage(_) => "I18N_001",
            SessionError::Json(_) => "PREF_001",
            SessionError::FileError(_) => "FILE_001",
        }
    }
}
