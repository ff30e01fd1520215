pub mod types;
pub mod error;
pub mod time;
pub mod calendar;
pub mod config;
pub mod i18n;
pub mod prefs;
pub mod presentation;

pub use types::*;
pub use calendar::MarketCalendar;
pub use error::{Result, SessionError};
