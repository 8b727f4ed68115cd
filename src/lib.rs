pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::{Config, WalletPolicy};
pub use datasource::{MockProfileSource, ProfileSource, ProfileSourceError, RestProfileSource};
pub use db::{init_db, Repository};
pub use domain::{Decimal, PlanTier, Status, TimeMs, UserId};
pub use engine::{ProfitSplit, SplitCalculator};
pub use error::AppError;
