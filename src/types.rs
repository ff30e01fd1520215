/// Core type definitions for the market session board
use std::collections::BTreeSet;

use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::time::{Holiday, ZonedParts};

/// Market category (decides which holiday effects apply)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketCategory {
    Stock,
    Forex,
}

impl MarketCategory {
    pub fn as_str(&self) -> &str {
        match self {
            MarketCategory::Stock => "STOCK",
            MarketCategory::Forex => "FOREX",
        }
    }
}

/// Cosmetic intraday band, `[start_minute, end_minute)` in market-local minutes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightBand {
    pub start_minute: u32,
    pub end_minute: u32,
    pub tag: String,
    pub label_key: Option<String>,
}

impl HighlightBand {
    pub fn contains(&self, minute_of_day: u32) -> bool {
        minute_of_day >= self.start_minute && minute_of_day < self.end_minute
    }
}

/// Validated market definition. Built once by the calendar loader.
#[derive(Debug, Clone)]
pub struct Market {
    pub id: String,
    pub display_name: String,
    pub time_zone: Tz,
    pub category: MarketCategory,
    pub session_open: NaiveTime,
    pub session_close: NaiveTime,
    /// 0 = Sunday .. 6 = Saturday
    pub trading_weekdays: BTreeSet<u32>,
    pub pre_open_hour: Option<u32>,
    pub after_close_hour: Option<u32>,
    pub highlight_bands: Vec<HighlightBand>,
    pub icon: String,
}

impl Market {
    pub fn open_minute(&self) -> u32 {
        minute_of_day(self.session_open)
    }

    pub fn close_minute(&self) -> u32 {
        minute_of_day(self.session_close)
    }

    pub fn trades_on(&self, weekday_index: u32) -> bool {
        self.trading_weekdays.contains(&weekday_index)
    }

    /// First declared band covering `minute_of_day`
    pub fn highlight_at(&self, minute_of_day: u32) -> Option<&HighlightBand> {
        self.highlight_bands.iter().find(|b| b.contains(minute_of_day))
    }
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Session status, recomputed from scratch on every evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
    Closed,
    ClosedHoliday,
    Soon,
    SoonExtended,
    LimitedLiquidity,
    Open,
    OpenHighSpread,
}

impl StatusKind {
    pub fn as_str(&self) -> &str {
        match self {
            StatusKind::Closed => "CLOSED",
            StatusKind::ClosedHoliday => "CLOSED_HOLIDAY",
            StatusKind::Soon => "SOON",
            StatusKind::SoonExtended => "SOON_EXTENDED",
            StatusKind::LimitedLiquidity => "LIMITED_LIQUIDITY",
            StatusKind::Open => "OPEN",
            StatusKind::OpenHighSpread => "OPEN_HIGH_SPREAD",
        }
    }

    /// Open states sort first on the board
    pub fn is_open(&self) -> bool {
        matches!(self, StatusKind::Open | StatusKind::OpenHighSpread)
    }
}

/// Output of one evaluation. Borrows from the registry it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusDescriptor<'a> {
    pub market_id: &'a str,
    pub status: StatusKind,
    pub label_key: &'static str,
    pub label_params: Vec<String>,
    /// 0.0 ..= 100.0, one decimal
    pub progress: f64,
    pub highlight_tag: Option<&'a str>,
    pub holiday: Option<&'a Holiday>,
    pub local_clock: ZonedParts,
}
