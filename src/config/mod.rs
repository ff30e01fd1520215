pub mod loader;
pub mod settings;

pub use loader::{embedded_calendar, load_calendar, parse_calendar};
pub use settings::AppSettings;
