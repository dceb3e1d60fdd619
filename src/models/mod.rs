//! Workforce scheduling domain models.
//!
//! Provides the read-only inputs of a run (horizon, staff, contracts,
//! templates, forecast, priority rules) and the schedule it produces.
//!
//! # Domain Mappings
//!
//! | u-shift | Contact center | Meaning |
//! |---------|----------------|---------|
//! | TimeBucket | Interval | 30-minute slot of the horizon |
//! | SkillGroup | Queue / split | Demand and allocation target |
//! | Stream | Direction × channel | Unit of priority ranking |
//! | EmploymentGroup | Contract | Daily and weekly hour bounds |
//! | ShiftTemplate | Shift pattern | Start time + worked buckets |
//! | Schedule | Roster | Employee-day shifts + bucket allocations |

mod forecast;
mod problem;
mod schedule;
mod staff;
mod template;
mod time_index;
mod window;

pub use forecast::{ForecastRow, OperatingHours, PriorityEntry, PriorityWindow, Stream};
pub use problem::{Problem, Reserved};
pub use schedule::{BucketAllocation, Schedule, ShiftAssignment, Violation, ViolationType};
pub use staff::{Channel, Employee, EmploymentGroup, HoursRange, SkillGroup, HOURS_EPSILON};
pub use template::{ShiftTemplate, TemplateShape};
pub use time_index::{
    parse_clock, parse_forecast_timestamp, parse_weekday, TimeBucket, TimeIndex, DAYS_PER_WEEK,
    DEFAULT_BUCKET_MINUTES, DEFAULT_DAYS, MINUTES_PER_DAY,
};
pub use window::{ClockWindow, DaySet};
