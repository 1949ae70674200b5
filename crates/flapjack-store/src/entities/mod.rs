pub mod check;
pub mod contact;
pub mod maintenance;
pub mod medium;
pub mod route;
pub mod rule;
pub mod state;
pub mod tag;

pub use check::CheckRecord;
pub use contact::ContactRecord;
pub use maintenance::{ScheduledMaintenanceRecord, UnscheduledMaintenanceRecord};
pub use medium::MediumRecord;
pub use route::RouteRecord;
pub use rule::{RuleRecord, TimeRestriction};
pub use state::StateRecord;
pub use tag::TagRecord;
