/// Recurring annual holidays and their per-category effects
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Market, MarketCategory};

/// Effect of a holiday on STOCK markets
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEffect {
    #[default]
    NoEffect,
    FullClose,
    /// Only the listed stock markets close
    RestrictedIds(BTreeSet<String>),
}

/// Effect of a holiday on FOREX markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForexEffect {
    #[default]
    NoEffect,
    FullClose,
    LimitedLiquidity,
    HighSpread,
}

/// Holiday recurring every year on `(month, day)` in each market's local date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub month: u32,
    pub day: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stocks: StockEffect,
    #[serde(default)]
    pub forex: ForexEffect,
}

impl Holiday {
    pub fn falls_on(&self, month: u32, day: u32) -> bool {
        self.month == month && self.day == day
    }

    /// No category effect declared: closes every market on that date
    pub fn is_generic(&self) -> bool {
        self.stocks == StockEffect::NoEffect && self.forex == ForexEffect::NoEffect
    }

    /// Whether the holiday forces `CLOSED_HOLIDAY` for the whole day
    pub fn closes(&self, market: &Market) -> bool {
        if self.is_generic() {
            return true;
        }
        match market.category {
            MarketCategory::Stock => match &self.stocks {
                StockEffect::FullClose => true,
                StockEffect::RestrictedIds(ids) => ids.contains(&market.id),
                StockEffect::NoEffect => false,
            },
            MarketCategory::Forex => self.forex == ForexEffect::FullClose,
        }
    }

    /// Partial effect for this market; always `NoEffect` for stocks
    pub fn partial_effect(&self, market: &Market) -> ForexEffect {
        match (market.category, self.forex) {
            (MarketCategory::Forex, effect @ (ForexEffect::LimitedLiquidity | ForexEffect::HighSpread)) => effect,
            _ => ForexEffect::NoEffect,
        }
    }

    pub fn affects(&self, market: &Market) -> bool {
        self.closes(market) || self.partial_effect(market) != ForexEffect::NoEffect
    }
}

/// First declared holiday on `(month, day)`; later entries with the same key are never observed
pub fn first_match(holidays: &[Holiday], month: u32, day: u32) -> Option<&Holiday> {
    holidays.iter().find(|h| h.falls_on(month, day))
}

/// Pairs of (observed, shadowed) holidays sharing a date
pub fn shadowed(holidays: &[Holiday]) -> Vec<(&Holiday, &Holiday)> {
    holidays
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| {
            holidays[..idx]
                .iter()
                .find(|earlier| earlier.falls_on(h.month, h.day))
                .map(|earlier| (earlier, h))
        })
        .collect()
}
