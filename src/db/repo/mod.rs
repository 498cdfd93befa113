//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `catalog.rs` - users, products, templates, and override windows (also
//!   implements the engine's provider ports)
//! - `ledger.rs` - commission ledger writes, summaries, and status
//!   transitions

mod catalog;
mod ledger;

pub use ledger::SummaryFilter;

use crate::domain::{CommissionRecord, Decimal};
use sqlx::sqlite::SqlitePool;

/// Aggregated view of one beneficiary's commissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCommissionSummary {
    pub total_pending: Decimal,
    pub total_approved: Decimal,
    pub total_paid: Decimal,
    pub commissions: Vec<CommissionRecord>,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
