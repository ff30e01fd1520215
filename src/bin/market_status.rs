/// Print every market's status as JSON, open markets first within each section
use chrono::{DateTime, Utc};
use market_sessions::{
    config::AppSettings,
    presentation::board_sections,
    time::next_open,
};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    // Optional RFC 3339 instant to evaluate instead of the current time
    let now = match std::env::args().nth(1) {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc),
        None => Utc::now(),
    };

    let settings_path = std::env::var("MARKET_SESSIONS_SETTINGS")
        .unwrap_or_else(|_| "config/settings.toml".to_string());
    let settings = AppSettings::load(&settings_path)?;
    let calendar = settings.calendar()?;

    let sections: Vec<_> = board_sections(&calendar, now)
        .into_iter()
        .map(|section| {
            let entries: Vec<_> = section
                .entries
                .iter()
                .map(|entry| {
                    json!({
                        "market": entry.market.display_name,
                        "status": entry.status,
                        "next_open": next_open(entry.market, &calendar, now)
                            .map(|t| t.to_rfc3339()),
                    })
                })
                .collect();
            json!({
                "category": section.category,
                "markets": entries,
            })
        })
        .collect();

    let report = json!({
        "evaluated_at": now.to_rfc3339(),
        "sections": sections,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
