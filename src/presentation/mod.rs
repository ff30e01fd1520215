/// Board ordering and plain-text rendering of status descriptors
use std::cmp::Ordering;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::calendar::MarketCalendar;
use crate::i18n::Language;
use crate::time::session::{evaluate_all, next_open, session_bounds};
use crate::types::{Market, MarketCategory, StatusDescriptor, StatusKind};

const BAR_CELLS: usize = 20;

/// Keyed label lookup. Never fails: unknown keys come back verbatim.
pub trait LabelResolver {
    fn resolve(&self, language: Language, key: &str, params: &[String]) -> String;
}

#[derive(Debug, Clone)]
pub struct BoardEntry<'a> {
    pub market: &'a Market,
    pub status: StatusDescriptor<'a>,
}

/// One category block of the board
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub category: MarketCategory,
    pub title_key: &'static str,
    pub entries: Vec<BoardEntry<'a>>,
}

/// Open markets first; everything else keeps its input order
pub fn order_for_display<'a>(
    markets: &[&'a Market],
    descriptors: Vec<StatusDescriptor<'a>>,
) -> Vec<BoardEntry<'a>> {
    let mut entries: Vec<BoardEntry<'a>> = markets
        .iter()
        .zip(descriptors)
        .map(|(&market, status)| BoardEntry { market, status })
        .collect();

    // sort_by is stable, so Equal keeps the input order
    entries.sort_by(|a, b| match (a.status.status.is_open(), b.status.status.is_open()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    });
    entries
}

/// Forex section first, then stocks
pub fn board_sections(calendar: &MarketCalendar, now: DateTime<Utc>) -> Vec<Section<'_>> {
    let (forex, stocks): (Vec<_>, Vec<_>) = calendar
        .markets()
        .iter()
        .zip(evaluate_all(calendar, now))
        .partition(|(market, _)| market.category == MarketCategory::Forex);

    [
        (MarketCategory::Forex, "forex.title", forex),
        (MarketCategory::Stock, "stocks.title", stocks),
    ]
    .into_iter()
    .filter(|(_, _, evaluated)| !evaluated.is_empty())
    .map(|(category, title_key, evaluated)| {
        let (markets, descriptors): (Vec<&Market>, Vec<StatusDescriptor<'_>>) =
            evaluated.into_iter().unzip();
        Section {
            category,
            title_key,
            entries: order_for_display(&markets, descriptors),
        }
    })
    .collect()
}

/// Everything a renderer needs besides the descriptors themselves
pub struct RenderContext<'r> {
    pub resolver: &'r dyn LabelResolver,
    pub language: Language,
    pub viewer_tz: Tz,
    pub now: DateTime<Utc>,
}

impl RenderContext<'_> {
    fn t(&self, key: &str) -> String {
        self.resolver.resolve(self.language, key, &[])
    }

    fn viewer_time(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.viewer_tz).format("%H:%M").to_string()
    }
}

pub fn render_board(calendar: &MarketCalendar, ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", ctx.t("title"));
    let _ = writeln!(out, "{}", render_clock(ctx.now, ctx.viewer_tz));

    for section in board_sections(calendar, ctx.now) {
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ==", ctx.t(section.title_key));
        for entry in &section.entries {
            out.push_str(&render_card(entry, calendar, ctx));
        }
    }
    out
}

pub fn render_card(entry: &BoardEntry<'_>, calendar: &MarketCalendar, ctx: &RenderContext<'_>) -> String {
    let market = entry.market;
    let status = &entry.status;
    let label = ctx
        .resolver
        .resolve(ctx.language, status.label_key, &status.label_params);

    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", market.display_name, market.icon);

    let _ = match status.highlight_tag {
        Some(tag) => writeln!(out, "  {} {}  ({})", status_marker(status.status), label, tag),
        None => writeln!(out, "  {} {}", status_marker(status.status), label),
    };

    let _ = writeln!(
        out,
        "  {} {:.1}%  [{}]",
        ctx.t("elapsed"),
        status.progress,
        progress_bar(status.progress)
    );

    let bounds = session_bounds(market, ctx.now);
    let _ = writeln!(
        out,
        "  {} {}   {} {}",
        ctx.t("open_label"),
        ctx.viewer_time(bounds.open),
        ctx.t("close_label"),
        ctx.viewer_time(bounds.close)
    );
    let _ = writeln!(
        out,
        "  {} {:02}:{:02}",
        ctx.t("market_time"),
        status.local_clock.hour,
        status.local_clock.minute
    );

    if !status.status.is_open() {
        if let Some(next) = next_open(market, calendar, ctx.now) {
            let _ = writeln!(
                out,
                "  {} {}",
                ctx.t("next_open"),
                next.with_timezone(&ctx.viewer_tz).format("%d/%m %H:%M")
            );
        }
    }

    let legend: Vec<String> = market
        .highlight_bands
        .iter()
        .filter_map(|band| {
            band.label_key.as_ref().map(|key| {
                format!(
                    "{} {} – {}",
                    ctx.t(key),
                    format_minute(band.start_minute),
                    format_minute(band.end_minute)
                )
            })
        })
        .collect();
    if !legend.is_empty() {
        let _ = writeln!(out, "  {}", legend.join(" | "));
    }

    if let Some(holiday) = status.holiday {
        let _ = writeln!(out, "  {} {}", ctx.t("holiday_prefix"), holiday.name);
    }
    out
}

/// Wall clock line for the viewer; refreshed more often than the statuses
pub fn render_clock(now: DateTime<Utc>, viewer_tz: Tz) -> String {
    format!(
        "{}  {}",
        now.with_timezone(&viewer_tz).format("%H:%M:%S"),
        viewer_tz.name().replacen('_', " ", 1)
    )
}

fn status_marker(status: StatusKind) -> char {
    match status {
        StatusKind::Open => '●',
        StatusKind::Soon
        | StatusKind::SoonExtended
        | StatusKind::LimitedLiquidity
        | StatusKind::OpenHighSpread => '◐',
        StatusKind::Closed | StatusKind::ClosedHoliday => '○',
    }
}

fn progress_bar(progress: f64) -> String {
    let filled = ((progress / 100.0) * BAR_CELLS as f64).round().clamp(0.0, BAR_CELLS as f64) as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_CELLS - filled))
}

fn format_minute(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
