//! Commands that span several tables: the PnL ledger, plan enrollment and
//! the profile directory refresh.

pub mod enrollment;
pub mod ledger;
pub mod sync;

pub use enrollment::{Enroller, EnrollmentError};
pub use ledger::{LedgerError, LedgerLine, PnlLedger};
pub use sync::{ProfileSync, SyncError, SyncReport};
