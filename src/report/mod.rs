pub mod aggregate;
pub mod format;
pub mod period;

pub use aggregate::{PeriodGroup, PeriodSummary, aggregate};
pub use format::{format_date, format_duration, format_time};
pub use period::{GroupingMode, biweek_start, month_start, period_start, week_start};
