/// Market calendar loading from TOML
use std::path::Path;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::info;

use crate::calendar::MarketCalendar;
use crate::error::{Result, SessionError};
use crate::time::Holiday;
use crate::types::{minute_of_day, HighlightBand, Market, MarketCategory};

const EMBEDDED_CALENDAR: &str = include_str!("../../config/markets.toml");

/// On-disk layout of the calendar file
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarFile {
    #[serde(default)]
    pub markets: Vec<MarketRecord>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketRecord {
    pub id: String,
    pub name: String,
    pub timezone: String,
    pub category: MarketCategory,
    pub open: String,
    pub close: String,
    pub open_days: Vec<u32>,
    #[serde(default)]
    pub pre_open_hour: Option<u32>,
    #[serde(default)]
    pub after_close_hour: Option<u32>,
    #[serde(default)]
    pub highlight_bands: Vec<BandRecord>,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BandRecord {
    pub start: String,
    pub end: String,
    pub tag: String,
    #[serde(default)]
    pub label_key: Option<String>,
}

/// Built-in registry shipped with the binary
pub fn embedded_calendar() -> Result<MarketCalendar> {
    parse_calendar(EMBEDDED_CALENDAR)
}

pub fn load_calendar<P: AsRef<Path>>(path: P) -> Result<MarketCalendar> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        SessionError::ConfigError(format!("Failed to read calendar file {}: {}", path.display(), e))
    })?;
    parse_calendar(&content)
}

pub fn parse_calendar(content: &str) -> Result<MarketCalendar> {
    let file: CalendarFile = toml::from_str(content)?;

    let markets = file
        .markets
        .into_iter()
        .map(build_market)
        .collect::<Result<Vec<_>>>()?;

    let calendar = MarketCalendar::new(markets, file.holidays)?;
    info!(
        "Calendar loaded: {} markets, {} holidays",
        calendar.markets().len(),
        calendar.holidays().len()
    );
    Ok(calendar)
}

fn build_market(record: MarketRecord) -> Result<Market> {
    let time_zone: Tz = record
        .timezone
        .parse()
        .map_err(|_| SessionError::UnknownTimeZone {
            market: record.id.clone(),
            zone: record.timezone.clone(),
        })?;

    let session_open = parse_clock(&record.id, "open", &record.open)?;
    let session_close = parse_clock(&record.id, "close", &record.close)?;

    let highlight_bands = record
        .highlight_bands
        .into_iter()
        .map(|band| -> Result<HighlightBand> {
            Ok(HighlightBand {
                start_minute: minute_of_day(parse_clock(&record.id, "band start", &band.start)?),
                end_minute: parse_band_end(&record.id, &band.end)?,
                tag: band.tag,
                label_key: band.label_key,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Market {
        id: record.id,
        display_name: record.name,
        time_zone,
        category: record.category,
        session_open,
        session_close,
        trading_weekdays: record.open_days.into_iter().collect(),
        pre_open_hour: record.pre_open_hour,
        after_close_hour: record.after_close_hour,
        highlight_bands,
        icon: record.icon,
    })
}

fn parse_clock(market_id: &str, field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| SessionError::InvalidMarket {
            id: market_id.to_string(),
            reason: format!("invalid {} time '{}': {}", field, value, e),
        })
}

/// Band ends may be "24:00" to run until midnight
fn parse_band_end(market_id: &str, value: &str) -> Result<u32> {
    if value == "24:00" {
        return Ok(24 * 60);
    }
    Ok(minute_of_day(parse_clock(market_id, "band end", value)?))
}
