//! Pure computation for the profit-split derivation chain.

pub mod book;
pub mod series;
pub mod split;

pub use book::{AgentStats, SplitBook};
pub use series::{daily_series, DailyPnl};
pub use split::{ProfitSplit, SplitCalculator};
