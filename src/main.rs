/// Main entry point for the market session board
use std::io::Write;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use market_sessions::{
    config::AppSettings,
    error::Result,
    i18n::{Catalog, Language},
    presentation::{render_board, render_clock, RenderContext},
    prefs::PreferenceStore,
    MarketCalendar,
};

const SETTINGS_ENV: &str = "MARKET_SESSIONS_SETTINGS";

/// Application state
pub struct BoardApp {
    settings: AppSettings,
    calendar: MarketCalendar,
    catalog: Catalog,
    language: Language,
    viewer_tz: Tz,
}

impl BoardApp {
    pub fn new(settings: AppSettings) -> Result<Self> {
        let calendar = settings.calendar()?;
        info!(
            "Calendar ready: {} markets, {} holidays",
            calendar.markets().len(),
            calendar.holidays().len()
        );

        let catalog = Catalog::embedded()?;
        let viewer_tz = settings.viewer_zone()?;

        let mut prefs = PreferenceStore::load(&settings.preferences_path);
        if let Some(code) = &settings.language {
            let chosen: Language = code.parse()?;
            match prefs.set_language(chosen) {
                Ok(true) => info!("Language preference set to {}", chosen),
                Ok(false) => {}
                Err(e) => warn!("Could not persist language preference: {} ({})", e, e.error_code()),
            }
        }
        let locale = std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LANG"))
            .ok();
        let language = Language::detect(prefs.language(), locale.as_deref());
        info!("Viewer zone {}, language {}", viewer_tz, language);

        Ok(BoardApp {
            settings,
            calendar,
            catalog,
            language,
            viewer_tz,
        })
    }

    fn snapshot(&self) -> String {
        let ctx = RenderContext {
            resolver: &self.catalog,
            language: self.language,
            viewer_tz: self.viewer_tz,
            now: Utc::now(),
        };
        render_board(&self.calendar, &ctx)
    }

    /// Statuses on the slow tick, the wall clock on the fast one
    pub async fn run(&self) -> Result<()> {
        let mut status_tick = tokio::time::interval(tokio::time::Duration::from_secs(
            self.settings.status_refresh_secs,
        ));
        let mut clock_tick = tokio::time::interval(tokio::time::Duration::from_secs(
            self.settings.clock_refresh_secs,
        ));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut stdout = std::io::stdout();
        loop {
            tokio::select! {
                _ = status_tick.tick() => {
                    debug!("Recomputing market statuses");
                    writeln!(stdout)?;
                    write!(stdout, "{}", self.snapshot())?;
                }
                _ = clock_tick.tick() => {
                    write!(stdout, "\r{}", render_clock(Utc::now(), self.viewer_tz))?;
                    stdout.flush()?;
                }
                res = &mut shutdown => {
                    if let Err(e) = res {
                        warn!("Ctrl+C handler failed: {}", e);
                    }
                    info!("Ctrl+C received - stopping board");
                    break;
                }
            }
        }
        writeln!(stdout)?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings_path =
        std::env::var(SETTINGS_ENV).unwrap_or_else(|_| "config/settings.toml".to_string());
    let settings = AppSettings::load(&settings_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if settings.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting market session board...");
    let app = BoardApp::new(settings)?;

    if std::env::args().any(|arg| arg == "--once") {
        print!("{}", app.snapshot());
        return Ok(());
    }

    app.run().await
}
