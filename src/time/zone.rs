/// Conversion between UTC instants and wall clocks in IANA zones
///
/// Offsets and DST rules always come from `chrono-tz`. Calendar arithmetic
/// on raw fields uses Howard Hinnant's civil-day algorithms so that edge
/// integers are normalized instead of rejected.
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

const SECS_PER_DAY: i64 = 86_400;
/// Roughly +/- 2.7 billion years, past any i32 year
const MAX_CIVIL_DAYS: i64 = 1_000_000_000_000;

/// Fixed-point correction steps in `local_to_utc`
pub const MAX_RESOLVE_STEPS: usize = 4;

/// Wall-clock reading of an instant in one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZonedParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// 0 = Sunday .. 6 = Saturday
    pub weekday_index: u32,
}

impl ZonedParts {
    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn date(&self) -> YearMonthDay {
        YearMonthDay {
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }

    pub fn to_local_fields(&self) -> LocalFields {
        LocalFields {
            year: self.year,
            month: self.month as i32,
            day: self.day as i32,
            hour: self.hour as i32,
            minute: self.minute as i32,
            second: self.second as i32,
        }
    }
}

/// Local wall-clock fields as supplied by callers. Out-of-range values roll
/// over (hour 25 is 01:00 the next day, month 13 is January of the next year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalFields {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
}

impl LocalFields {
    pub fn at(date: YearMonthDay, hour: u32, minute: u32) -> Self {
        LocalFields {
            year: date.year,
            month: date.month as i32,
            day: date.day as i32,
            hour: hour as i32,
            minute: minute as i32,
            second: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonthDay {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl YearMonthDay {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        YearMonthDay { year, month, day }
    }

    /// 0 = Sunday .. 6 = Saturday
    pub fn weekday_index(&self) -> u32 {
        // 1970-01-01 was a Thursday
        (civil_day_number(self.year as i64, self.month as i64, self.day as i64) + 4).rem_euclid(7)
            as u32
    }
}

/// Wall-clock reading of `instant` in `tz`
pub fn zoned_parts(instant: DateTime<Utc>, tz: Tz) -> ZonedParts {
    let local = instant.with_timezone(&tz);
    ZonedParts {
        year: local.year(),
        month: local.month(),
        day: local.day(),
        hour: local.hour(),
        minute: local.minute(),
        second: local.second(),
        weekday_index: local.weekday().num_days_from_sunday(),
    }
}

/// Resolve a local wall-clock reading in `tz` to the UTC instant it denotes.
///
/// Starts from the fields read as if they were UTC and corrects the guess by
/// the difference between the reading it produces and the intended one, for
/// at most [`MAX_RESOLVE_STEPS`] steps.
///
/// - Inside a spring-forward gap no guess matches and the iteration
///   oscillates around the transition; the visited candidate past the
///   transition is returned, so 02:30 in a one-hour gap resolves to 03:30.
/// - Inside a fall-back overlap the result is whichever of the two valid
///   instants the iteration reaches first. That is an artifact of the
///   starting guess, not an earliest/latest rule.
pub fn local_to_utc(fields: LocalFields, tz: Tz) -> DateTime<Utc> {
    let intended = naive_seconds(&fields);
    let mut guess = intended;
    // (guess, diff) with the smallest positive diff seen so far
    let mut past_transition: Option<(i64, i64)> = None;

    for step in 0..=MAX_RESOLVE_STEPS {
        let observed = naive_seconds(&zoned_parts(instant_from_seconds(guess), tz).to_local_fields());
        let diff = observed - intended;
        if diff == 0 {
            return instant_from_seconds(guess);
        }
        if diff > 0 && past_transition.map_or(true, |(_, best)| diff < best) {
            past_transition = Some((guess, diff));
        }
        if step == MAX_RESOLVE_STEPS {
            break;
        }
        guess -= diff;
    }

    let resolved = past_transition.map_or(guess, |(candidate, _)| candidate);
    instant_from_seconds(resolved)
}

/// Calendar-correct day arithmetic, independent of any zone
pub fn add_days(date: YearMonthDay, delta_days: i64) -> YearMonthDay {
    let days = civil_day_number(date.year as i64, date.month as i64, date.day as i64)
        .saturating_add(delta_days)
        .clamp(-MAX_CIVIL_DAYS, MAX_CIVIL_DAYS);
    let (year, month, day) = civil_from_days(days);
    YearMonthDay {
        year: year.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        month: month as u32,
        day: day as u32,
    }
}

/// Seconds since the epoch of the fields read as a UTC wall clock
fn naive_seconds(fields: &LocalFields) -> i64 {
    let days = civil_day_number(fields.year as i64, fields.month as i64, fields.day as i64);
    days * SECS_PER_DAY
        + fields.hour as i64 * 3_600
        + fields.minute as i64 * 60
        + fields.second as i64
}

/// Day number (0 = 1970-01-01) of a possibly unnormalized year/month/day
fn civil_day_number(year: i64, month: i64, day: i64) -> i64 {
    let months = year * 12 + (month - 1);
    let y = months.div_euclid(12);
    let m = months.rem_euclid(12) + 1;
    days_from_civil(y, m, 1) + (day - 1)
}

fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    let d = doy - (153 * mp + 2) / 5 + 1;
    (y, m, d)
}

/// Saturates to chrono's range, keeping a day of margin so any zone offset
/// still yields a representable local reading.
fn instant_from_seconds(secs: i64) -> DateTime<Utc> {
    let min = (DateTime::<Utc>::MIN_UTC + Duration::days(1)).timestamp();
    let max = (DateTime::<Utc>::MAX_UTC - Duration::days(1)).timestamp();
    DateTime::from_timestamp(secs.clamp(min, max), 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
