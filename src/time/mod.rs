pub mod holidays;
pub mod session;
pub mod zone;

pub use holidays::{ForexEffect, Holiday, StockEffect};
pub use session::{evaluate, evaluate_all, next_open, session_bounds, SessionBounds};
pub use zone::{add_days, local_to_utc, zoned_parts, LocalFields, YearMonthDay, ZonedParts};
