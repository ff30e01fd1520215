/// Read-only registry of markets and recurring holidays
use std::collections::HashSet;

use tracing::warn;

use crate::error::{Result, SessionError};
use crate::time::holidays::{self, Holiday, StockEffect};
use crate::types::{Market, MarketCategory};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Validated on construction and never mutated afterwards, so it can be
/// shared freely between evaluations.
#[derive(Debug, Clone)]
pub struct MarketCalendar {
    markets: Vec<Market>,
    holidays: Vec<Holiday>,
}

impl MarketCalendar {
    pub fn new(markets: Vec<Market>, holidays: Vec<Holiday>) -> Result<Self> {
        let mut seen = HashSet::new();
        for market in &markets {
            validate_market(market)?;
            if !seen.insert(market.id.as_str()) {
                return Err(SessionError::DuplicateMarket(market.id.clone()));
            }
        }

        for holiday in &holidays {
            validate_holiday(holiday, &markets)?;
        }

        for (observed, hidden) in holidays::shadowed(&holidays) {
            warn!(
                "Holiday '{}' on {:02}-{:02} is shadowed by '{}' and will never apply",
                hidden.name, hidden.month, hidden.day, observed.name
            );
        }

        Ok(MarketCalendar { markets, holidays })
    }

    /// Markets in declaration order
    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    pub fn market(&self, id: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.id == id)
    }

    /// First declared holiday on that date, if any
    pub fn holiday_for_date(&self, month: u32, day: u32) -> Option<&Holiday> {
        holidays::first_match(&self.holidays, month, day)
    }

    pub fn is_category(&self, market_id: &str, category: MarketCategory) -> bool {
        self.markets
            .iter()
            .any(|m| m.id == market_id && m.category == category)
    }

    pub fn markets_in(&self, category: MarketCategory) -> impl Iterator<Item = &Market> {
        self.markets.iter().filter(move |m| m.category == category)
    }
}

fn invalid_market(market: &Market, reason: impl Into<String>) -> SessionError {
    SessionError::InvalidMarket {
        id: market.id.clone(),
        reason: reason.into(),
    }
}

fn validate_market(market: &Market) -> Result<()> {
    if market.id.trim().is_empty() {
        return Err(invalid_market(market, "empty id"));
    }

    if market.trading_weekdays.is_empty() {
        return Err(invalid_market(market, "empty trading weekday set"));
    }
    if let Some(day) = market.trading_weekdays.iter().find(|d| **d > 6) {
        return Err(invalid_market(market, format!("weekday {} outside 0..=6", day)));
    }

    let open = market.open_minute();
    let close = market.close_minute();
    if open >= close {
        return Err(invalid_market(
            market,
            format!("session open {} must be before close {}", market.session_open, market.session_close),
        ));
    }

    if let Some(hour) = market.pre_open_hour {
        if hour.saturating_mul(60) >= open {
            return Err(invalid_market(
                market,
                format!("pre_open_hour {} must be before the session open", hour),
            ));
        }
    }

    if let Some(hour) = market.after_close_hour {
        if hour > 24 || hour * 60 <= close {
            return Err(invalid_market(
                market,
                format!("after_close_hour {} must be after the close and at most 24", hour),
            ));
        }
    }

    for band in &market.highlight_bands {
        if band.start_minute >= band.end_minute || band.end_minute > MINUTES_PER_DAY {
            return Err(invalid_market(
                market,
                format!("highlight band '{}' has an empty or out-of-day range", band.tag),
            ));
        }
    }

    Ok(())
}

fn days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn validate_holiday(holiday: &Holiday, markets: &[Market]) -> Result<()> {
    let invalid = |reason: String| SessionError::InvalidHoliday {
        name: holiday.name.clone(),
        reason,
    };

    if !(1..=12).contains(&holiday.month) {
        return Err(invalid(format!("month {} outside 1..=12", holiday.month)));
    }
    if holiday.day == 0 || holiday.day > days_in_month(holiday.month) {
        return Err(invalid(format!(
            "day {} does not exist in month {}",
            holiday.day, holiday.month
        )));
    }

    if let StockEffect::RestrictedIds(ids) = &holiday.stocks {
        if ids.is_empty() {
            return Err(invalid("restricted_ids is empty".to_string()));
        }
        for id in ids {
            let known = markets
                .iter()
                .any(|m| &m.id == id && m.category == MarketCategory::Stock);
            if !known {
                return Err(invalid(format!("restricted id '{}' is not a stock market", id)));
            }
        }
    }

    Ok(())
}
