/// Application settings: optional TOML file layered under environment overrides
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::warn;

use crate::calendar::MarketCalendar;
use crate::config::loader::{embedded_calendar, load_calendar};
use crate::error::{Result, SessionError};

pub const ENV_PREFIX: &str = "MARKET_SESSIONS";

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// IANA zone used to show session times to the viewer
    pub viewer_timezone: Option<String>,
    /// Explicit language choice; persisted as the stored preference
    pub language: Option<String>,
    pub status_refresh_secs: u64,
    pub clock_refresh_secs: u64,
    pub log_filter: String,
    /// Emit log lines as JSON instead of plain text
    pub log_json: bool,
    pub preferences_path: String,
    /// Replaces the built-in market registry when set
    pub markets_path: Option<String>,
}

impl AppSettings {
    pub fn load(path: &str) -> Result<Self> {
        Self::from_sources(path, Some(ENV_PREFIX))
    }

    /// Defaults, then the optional file, then `<prefix>_*` variables when a prefix is given
    fn from_sources(path: &str, env_prefix: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .set_default("status_refresh_secs", 30_i64)?
            .set_default("clock_refresh_secs", 1_i64)?
            .set_default("log_filter", "market_sessions=info")?
            .set_default("log_json", false)?
            .set_default("preferences_path", "data/preferences.json")?
            .add_source(::config::File::with_name(path).required(false));
        if let Some(prefix) = env_prefix {
            builder = builder.add_source(::config::Environment::with_prefix(prefix));
        }

        let settings: AppSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clock_refresh_secs == 0 {
            return Err(SessionError::ConfigError(
                "clock_refresh_secs must be >= 1".to_string(),
            ));
        }
        if self.status_refresh_secs < self.clock_refresh_secs {
            return Err(SessionError::ConfigError(format!(
                "status_refresh_secs ({}) must be >= clock_refresh_secs ({})",
                self.status_refresh_secs, self.clock_refresh_secs
            )));
        }
        if let Some(zone) = &self.viewer_timezone {
            parse_zone(zone)?;
        }
        Ok(())
    }

    /// Configured zone, else `$TZ`, else UTC
    pub fn viewer_zone(&self) -> Result<Tz> {
        if let Some(zone) = &self.viewer_timezone {
            return parse_zone(zone);
        }
        match std::env::var("TZ") {
            Ok(zone) => match zone.parse::<Tz>() {
                Ok(tz) => Ok(tz),
                Err(_) => {
                    warn!("Ignoring unrecognised TZ '{}' - using UTC", zone);
                    Ok(chrono_tz::UTC)
                }
            },
            Err(_) => Ok(chrono_tz::UTC),
        }
    }

    pub fn calendar(&self) -> Result<MarketCalendar> {
        match &self.markets_path {
            Some(path) => load_calendar(path),
            None => embedded_calendar(),
        }
    }
}

fn parse_zone(zone: &str) -> Result<Tz> {
    zone.parse().map_err(|_| SessionError::UnknownTimeZone {
        market: "viewer".to_string(),
        zone: zone.to_string(),
    })
}
