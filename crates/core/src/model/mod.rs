mod question;
mod stats;

pub use question::Question;
pub use stats::{GameRecord, StatsAggregate, StatsError};
