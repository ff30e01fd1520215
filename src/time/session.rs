/// Market session status engine
///
/// `evaluate` is a pure function of (market, calendar, instant). Nothing is
/// cached between calls, so markets can be evaluated in any order or in
/// parallel against the same shared calendar.
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use tracing::trace;

use crate::calendar::MarketCalendar;
use crate::time::holidays::{ForexEffect, Holiday};
use crate::time::zone::{add_days, local_to_utc, zoned_parts, LocalFields, ZonedParts};
use crate::types::{Market, StatusDescriptor, StatusKind};

pub const LABEL_CLOSED: &str = "status.closed";
pub const LABEL_CLOSED_HOLIDAY: &str = "status.closed_holiday";
pub const LABEL_OPEN: &str = "status.open";
pub const LABEL_UPCOMING_OPEN: &str = "status.upcoming_open";
pub const LABEL_PRE_MARKET: &str = "status.pre_market";
pub const LABEL_AFTER_HOURS: &str = "status.after_hours";
pub const LABEL_LIMITED_LIQUIDITY: &str = "status.liquidity_limited";
pub const LABEL_OPEN_HIGH_SPREADS: &str = "status.open_high_spreads";

/// Minutes before the open that count as "about to open" when a market has
/// no declared pre-open window
pub const SOON_WINDOW_MINUTES: u32 = 60;

/// Days `next_open` looks ahead
pub const NEXT_OPEN_HORIZON_DAYS: i64 = 14;

/// Classification before holiday overlays
#[derive(Debug, Clone, Copy, PartialEq)]
struct BaseState {
    status: StatusKind,
    label_key: &'static str,
    progress: f64,
}

impl BaseState {
    fn new(status: StatusKind, label_key: &'static str, progress: f64) -> Self {
        BaseState {
            status,
            label_key,
            progress,
        }
    }
}

/// Status of one market at one instant
pub fn evaluate<'a>(
    market: &'a Market,
    calendar: &'a MarketCalendar,
    now: DateTime<Utc>,
) -> StatusDescriptor<'a> {
    let clock = zoned_parts(now, market.time_zone);
    let minute = clock.minute_of_day();

    if !market.trades_on(clock.weekday_index) {
        return terminal(market, clock, StatusKind::Closed, LABEL_CLOSED, None);
    }

    let holiday = calendar
        .holiday_for_date(clock.month, clock.day)
        .filter(|h| h.affects(market));
    if let Some(h) = holiday.filter(|h| h.closes(market)) {
        return terminal(market, clock, StatusKind::ClosedHoliday, LABEL_CLOSED_HOLIDAY, Some(h));
    }

    let base = classify(market, minute);
    let mut state = base;
    let mut label_params = Vec::new();
    let mut holiday_ref = None;

    if let Some(h) = holiday {
        match h.partial_effect(market) {
            ForexEffect::LimitedLiquidity => {
                state.status = StatusKind::LimitedLiquidity;
                state.label_key = LABEL_LIMITED_LIQUIDITY;
                if base.status != StatusKind::Open {
                    state.progress = 0.0;
                }
                holiday_ref = Some(h);
            }
            ForexEffect::HighSpread => {
                if base.status == StatusKind::Open {
                    state.status = StatusKind::OpenHighSpread;
                    state.label_key = LABEL_OPEN_HIGH_SPREADS;
                } else {
                    state.status = StatusKind::ClosedHoliday;
                    state.label_key = LABEL_CLOSED_HOLIDAY;
                    state.progress = 0.0;
                    label_params.push(h.name.clone());
                }
                holiday_ref = Some(h);
            }
            ForexEffect::NoEffect | ForexEffect::FullClose => {}
        }
    }

    let highlight_tag = market.highlight_at(minute).map(|band| band.tag.as_str());

    trace!(
        "{} @ {:02}:{:02} local -> {} ({:.1}%)",
        market.id,
        clock.hour,
        clock.minute,
        state.status.as_str(),
        state.progress
    );

    StatusDescriptor {
        market_id: &market.id,
        status: state.status,
        label_key: state.label_key,
        label_params,
        progress: round_progress(state.progress),
        highlight_tag,
        holiday: holiday_ref,
        local_clock: clock,
    }
}

/// Evaluate every market of the calendar, in declaration order
pub fn evaluate_all(calendar: &MarketCalendar, now: DateTime<Utc>) -> Vec<StatusDescriptor<'_>> {
    calendar
        .markets()
        .iter()
        .map(|market| evaluate(market, calendar, now))
        .collect()
}

fn terminal<'a>(
    market: &'a Market,
    clock: ZonedParts,
    status: StatusKind,
    label_key: &'static str,
    holiday: Option<&'a Holiday>,
) -> StatusDescriptor<'a> {
    StatusDescriptor {
        market_id: &market.id,
        status,
        label_key,
        label_params: holiday.map(|h| vec![h.name.clone()]).unwrap_or_default(),
        progress: 0.0,
        highlight_tag: None,
        holiday,
        local_clock: clock,
    }
}

/// Time-of-day classification on a regular trading day
fn classify(market: &Market, minute: u32) -> BaseState {
    let open = market.open_minute();
    let close = market.close_minute();

    if minute >= open && minute < close {
        let progress = (minute - open) as f64 / (close - open) as f64 * 100.0;
        return BaseState::new(StatusKind::Open, LABEL_OPEN, progress.clamp(0.0, 100.0));
    }

    if minute < open {
        // A declared pre-open window replaces the one-hour heuristic
        let soon = match market.pre_open_hour {
            Some(hour) if minute >= hour * 60 => Some(LABEL_PRE_MARKET),
            Some(_) => None,
            None if minute + SOON_WINDOW_MINUTES >= open => Some(LABEL_UPCOMING_OPEN),
            None => None,
        };
        return match soon {
            Some(label) => BaseState::new(StatusKind::Soon, label, 0.0),
            None => BaseState::new(StatusKind::Closed, LABEL_CLOSED, 0.0),
        };
    }

    match market.after_close_hour {
        Some(hour) if minute < hour * 60 => {
            BaseState::new(StatusKind::SoonExtended, LABEL_AFTER_HOURS, 100.0)
        }
        _ => BaseState::new(StatusKind::Closed, LABEL_CLOSED, 100.0),
    }
}

fn round_progress(progress: f64) -> f64 {
    (progress * 10.0).round() / 10.0
}

/// UTC instants of one market-local session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionBounds {
    pub open: DateTime<Utc>,
    pub close: DateTime<Utc>,
}

/// Open and close of the session on the market-local date of `now`
pub fn session_bounds(market: &Market, now: DateTime<Utc>) -> SessionBounds {
    let today = zoned_parts(now, market.time_zone).date();
    let at = |time: chrono::NaiveTime| {
        local_to_utc(LocalFields::at(today, time.hour(), time.minute()), market.time_zone)
    };
    SessionBounds {
        open: at(market.session_open),
        close: at(market.session_close),
    }
}

/// First session open strictly after `now` on a trading weekday that is not
/// a full holiday closure for this market
pub fn next_open(market: &Market, calendar: &MarketCalendar, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = zoned_parts(now, market.time_zone).date();

    (0..=NEXT_OPEN_HORIZON_DAYS)
        .map(|offset| add_days(today, offset))
        .filter(|date| market.trades_on(date.weekday_index()))
        .filter(|date| {
            !calendar
                .holiday_for_date(date.month, date.day)
                .is_some_and(|h| h.closes(market))
        })
        .map(|date| {
            local_to_utc(
                LocalFields::at(date, market.session_open.hour(), market.session_open.minute()),
                market.time_zone,
            )
        })
        .find(|open| *open > now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_calendar;
    use chrono::{Duration, TimeZone};
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::London;
    use chrono_tz::Tz;
    use proptest::prelude::*;

    const CALENDAR: &str = r#"
        [[markets]]
        id = "nasdaq"
        name = "NASDAQ"
        timezone = "America/New_York"
        category = "STOCK"
        open = "09:30"
        close = "16:00"
        open_days = [1, 2, 3, 4, 5]

        [[markets.highlight_bands]]
        start = "09:30"
        end = "10:30"
        tag = "morning"

        [[markets.highlight_bands]]
        start = "11:30"
        end = "13:30"
        tag = "midday"

        [[markets]]
        id = "nasdaq_ext"
        name = "NASDAQ extended"
        timezone = "America/New_York"
        category = "STOCK"
        open = "09:30"
        close = "16:00"
        open_days = [1, 2, 3, 4, 5]
        pre_open_hour = 4
        after_close_hour = 20

        [[markets]]
        id = "london"
        name = "London"
        timezone = "Europe/London"
        category = "FOREX"
        open = "08:00"
        close = "17:00"
        open_days = [0, 1, 2, 3, 4, 5]

        [[markets]]
        id = "ny"
        name = "New York"
        timezone = "America/New_York"
        category = "FOREX"
        open = "08:00"
        close = "17:00"
        open_days = [1, 2, 3, 4, 5]

        [[holidays]]
        month = 7
        day = 4
        name = "Independence Day"
        stocks = { restricted_ids = ["nasdaq"] }
        forex = "limited_liquidity"

        [[holidays]]
        month = 11
        day = 25
        name = "Thanksgiving"
        stocks = "full_close"
        forex = "high_spread"

        [[holidays]]
        month = 12
        day = 24
        name = "Christmas Eve"
        stocks = "full_close"
        forex = "full_close"

        [[holidays]]
        month = 12
        day = 24
        name = "Shadowed Eve"
        forex = "limited_liquidity"

        [[holidays]]
        month = 1
        day = 1
        name = "New Year"
    "#;

    fn calendar() -> MarketCalendar {
        parse_calendar(CALENDAR).unwrap()
    }

    fn local(tz: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        tz.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().with_timezone(&Utc)
    }

    fn status_at<'a>(cal: &'a MarketCalendar, id: &str, now: DateTime<Utc>) -> StatusDescriptor<'a> {
        evaluate(cal.market(id).unwrap(), cal, now)
    }

    #[test]
    fn test_restricted_holiday_closes_nasdaq() {
        let cal = calendar();
        let d = status_at(&cal, "nasdaq", local(New_York, 2024, 7, 4, 11, 0));
        assert_eq!(d.status, StatusKind::ClosedHoliday);
        assert_eq!(d.progress, 0.0);
        assert_eq!(d.label_key, LABEL_CLOSED_HOLIDAY);
        assert_eq!(d.label_params, vec!["Independence Day".to_string()]);
        assert_eq!(d.holiday.unwrap().name, "Independence Day");
        assert!(d.highlight_tag.is_none());

        // Same holiday, stock market not on the list: a normal session
        let ext = status_at(&cal, "nasdaq_ext", local(New_York, 2024, 7, 4, 11, 0));
        assert_eq!(ext.status, StatusKind::Open);
        assert!(ext.holiday.is_none());
    }

    #[test]
    fn test_forex_saturday_is_closed() {
        let cal = calendar();
        let d = status_at(&cal, "london", local(London, 2024, 7, 6, 12, 0));
        assert_eq!(d.local_clock.weekday_index, 6);
        assert_eq!(d.status, StatusKind::Closed);
        assert_eq!(d.progress, 0.0);
    }

    #[test]
    fn test_half_hour_before_open_is_soon() {
        let cal = calendar();
        let d = status_at(&cal, "ny", local(New_York, 2024, 7, 8, 7, 30));
        assert_eq!(d.status, StatusKind::Soon);
        assert_eq!(d.label_key, LABEL_UPCOMING_OPEN);
        assert_eq!(d.progress, 0.0);

        // Exactly one hour before is still inside the window, earlier is not
        let edge = status_at(&cal, "ny", local(New_York, 2024, 7, 8, 7, 0));
        assert_eq!(edge.status, StatusKind::Soon);
        let early = status_at(&cal, "ny", local(New_York, 2024, 7, 8, 6, 59));
        assert_eq!(early.status, StatusKind::Closed);
    }

    #[test]
    fn test_midday_progress_and_highlight() {
        let cal = calendar();
        let d = status_at(&cal, "nasdaq", local(New_York, 2024, 7, 8, 12, 0));
        assert_eq!(d.status, StatusKind::Open);
        assert_eq!(d.progress, 38.5);
        assert_eq!(d.highlight_tag, Some("midday"));
        assert_eq!((d.local_clock.hour, d.local_clock.minute), (12, 0));
    }

    #[test]
    fn test_session_edges() {
        let cal = calendar();
        let open = status_at(&cal, "nasdaq", local(New_York, 2024, 7, 8, 9, 30));
        assert_eq!(open.status, StatusKind::Open);
        assert_eq!(open.progress, 0.0);
        assert_eq!(open.highlight_tag, Some("morning"));

        let last = status_at(&cal, "nasdaq", local(New_York, 2024, 7, 8, 15, 59));
        assert_eq!(last.status, StatusKind::Open);
        assert!(last.progress < 100.0);

        let closed = status_at(&cal, "nasdaq", local(New_York, 2024, 7, 8, 16, 0));
        assert_eq!(closed.status, StatusKind::Closed);
        assert_eq!(closed.progress, 100.0);
        assert!(closed.highlight_tag.is_none());
    }

    #[test]
    fn test_declared_windows() {
        let cal = calendar();
        let pre = status_at(&cal, "nasdaq_ext", local(New_York, 2024, 7, 8, 4, 0));
        assert_eq!(pre.status, StatusKind::Soon);
        assert_eq!(pre.label_key, LABEL_PRE_MARKET);

        let night = status_at(&cal, "nasdaq_ext", local(New_York, 2024, 7, 8, 3, 59));
        assert_eq!(night.status, StatusKind::Closed);

        // No fallback to the one-hour heuristic once a window is declared
        let after = status_at(&cal, "nasdaq_ext", local(New_York, 2024, 7, 8, 17, 0));
        assert_eq!(after.status, StatusKind::SoonExtended);
        assert_eq!(after.label_key, LABEL_AFTER_HOURS);
        assert_eq!(after.progress, 100.0);

        let late = status_at(&cal, "nasdaq_ext", local(New_York, 2024, 7, 8, 20, 0));
        assert_eq!(late.status, StatusKind::Closed);
        assert_eq!(late.progress, 100.0);
    }

    #[test]
    fn test_limited_liquidity_overlay() {
        let cal = calendar();
        let open = status_at(&cal, "london", local(London, 2024, 7, 4, 12, 30));
        assert_eq!(open.status, StatusKind::LimitedLiquidity);
        assert_eq!(open.label_key, LABEL_LIMITED_LIQUIDITY);
        assert_eq!(open.progress, 50.0);
        assert_eq!(open.holiday.unwrap().name, "Independence Day");

        let after = status_at(&cal, "london", local(London, 2024, 7, 4, 18, 0));
        assert_eq!(after.status, StatusKind::LimitedLiquidity);
        assert_eq!(after.progress, 0.0);
    }

    #[test]
    fn test_high_spread_overlay() {
        let cal = calendar();
        // 2024-11-25 is a Monday
        let open = status_at(&cal, "ny", local(New_York, 2024, 11, 25, 12, 0));
        assert_eq!(open.status, StatusKind::OpenHighSpread);
        assert_eq!(open.label_key, LABEL_OPEN_HIGH_SPREADS);
        assert!(open.progress > 0.0);
        assert!(open.label_params.is_empty());

        let before = status_at(&cal, "ny", local(New_York, 2024, 11, 25, 7, 30));
        assert_eq!(before.status, StatusKind::ClosedHoliday);
        assert_eq!(before.progress, 0.0);
        assert_eq!(before.label_params, vec!["Thanksgiving".to_string()]);

        let stock = status_at(&cal, "nasdaq", local(New_York, 2024, 11, 25, 12, 0));
        assert_eq!(stock.status, StatusKind::ClosedHoliday);
    }

    #[test]
    fn test_first_declared_holiday_wins() {
        let cal = calendar();
        // 2024-12-24 is a Tuesday; the shadowed entry would only limit liquidity
        let d = status_at(&cal, "london", local(London, 2024, 12, 24, 12, 0));
        assert_eq!(d.status, StatusKind::ClosedHoliday);
        assert_eq!(d.holiday.unwrap().name, "Christmas Eve");
    }

    #[test]
    fn test_generic_holiday_closes_all_categories() {
        let cal = calendar();
        // 2024-01-01 is a Monday
        for id in ["nasdaq", "london", "ny"] {
            let tz = cal.market(id).unwrap().time_zone;
            let d = status_at(&cal, id, local(tz, 2024, 1, 1, 12, 0));
            assert_eq!(d.status, StatusKind::ClosedHoliday, "{}", id);
        }
    }

    #[test]
    fn test_weekday_check_precedes_holiday() {
        let cal = calendar();
        // 2022-12-24 is a Saturday
        let d = status_at(&cal, "nasdaq", local(New_York, 2022, 12, 24, 12, 0));
        assert_eq!(d.status, StatusKind::Closed);
        assert!(d.holiday.is_none());
    }

    #[test]
    fn test_holiday_uses_market_local_date() {
        let cal = calendar();
        // 2024-07-04 01:00 in London is still July 3 in New York
        let now = local(London, 2024, 7, 4, 1, 0);
        let ny = status_at(&cal, "nasdaq", now);
        assert_eq!(ny.local_clock.day, 3);
        assert_ne!(ny.status, StatusKind::ClosedHoliday);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let cal = calendar();
        let now = local(New_York, 2024, 7, 8, 12, 0);
        let first = evaluate_all(&cal, now);
        let second = evaluate_all(&cal, now);
        assert_eq!(first, second);
        assert_eq!(first.len(), cal.markets().len());
        assert_eq!(first[0].market_id, "nasdaq");
    }

    #[test]
    fn test_session_bounds_follow_dst() {
        let cal = calendar();
        let nasdaq = cal.market("nasdaq").unwrap();

        let summer = session_bounds(nasdaq, local(New_York, 2024, 7, 8, 12, 0));
        assert_eq!(summer.open, Utc.with_ymd_and_hms(2024, 7, 8, 13, 30, 0).unwrap());
        assert_eq!(summer.close, Utc.with_ymd_and_hms(2024, 7, 8, 20, 0, 0).unwrap());

        let winter = session_bounds(nasdaq, local(New_York, 2024, 1, 8, 12, 0));
        assert_eq!(winter.open, Utc.with_ymd_and_hms(2024, 1, 8, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_next_open_skips_weekend_and_holiday() {
        let cal = calendar();
        let nasdaq = cal.market("nasdaq").unwrap();

        // Friday after the close -> Monday open
        let friday = local(New_York, 2024, 7, 5, 17, 0);
        assert_eq!(next_open(nasdaq, &cal, friday), Some(local(New_York, 2024, 7, 8, 9, 30)));

        // Wednesday July 3 after the close -> skips the July 4 closure
        let eve = local(New_York, 2024, 7, 3, 17, 0);
        assert_eq!(next_open(nasdaq, &cal, eve), Some(local(New_York, 2024, 7, 5, 9, 30)));

        // Before today's open -> today
        let morning = local(New_York, 2024, 7, 8, 8, 0);
        assert_eq!(next_open(nasdaq, &cal, morning), Some(local(New_York, 2024, 7, 8, 9, 30)));
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(round_progress(38.461_538), 38.5);
        assert_eq!(round_progress(99.97), 100.0);
        assert_eq!(round_progress(0.04), 0.0);
    }

    proptest! {
        #[test]
        fn prop_non_trading_weekday_is_closed(secs in 1_577_836_800i64..1_893_456_000i64) {
            let cal = calendar();
            let now = DateTime::from_timestamp(secs, 0).unwrap();
            for market in cal.markets() {
                let d = evaluate(market, &cal, now);
                if !market.trades_on(d.local_clock.weekday_index) {
                    prop_assert_eq!(d.status, StatusKind::Closed);
                    prop_assert_eq!(d.progress, 0.0);
                }
            }
        }

        #[test]
        fn prop_open_progress_is_monotonic(start in 0u32..389, step in 1u32..30) {
            let cal = calendar();
            let nasdaq = cal.market("nasdaq").unwrap();
            let open = local(New_York, 2024, 7, 8, 9, 30);
            let a = evaluate(nasdaq, &cal, open + Duration::minutes(start as i64));
            let b = evaluate(nasdaq, &cal, open + Duration::minutes((start + step).min(389) as i64));
            prop_assert_eq!(a.status, StatusKind::Open);
            prop_assert_eq!(b.status, StatusKind::Open);
            prop_assert!(a.progress <= b.progress);
            prop_assert!(b.progress < 100.0);
        }

        #[test]
        fn prop_stock_full_close_ignores_time_of_day(minute in 0i64..1440) {
            let cal = calendar();
            let nasdaq = cal.market("nasdaq").unwrap();
            // Monday 2024-11-25, Thanksgiving entry closes all stocks
            let now = local(New_York, 2024, 11, 25, 0, 0) + Duration::minutes(minute);
            prop_assert_eq!(evaluate(nasdaq, &cal, now).status, StatusKind::ClosedHoliday);
        }
    }
}
