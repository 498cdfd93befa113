//! Per-order commission generation with at-most-once semantics.
//!
//! The triggering event (an order-completion webhook) can be redelivered, so
//! generation is guarded twice: a cheap existence check up front, and the
//! ledger's content-derived entry keys underneath. A retried order is always
//! a no-op success, never a duplicate payout.

use crate::db::Repository;
use crate::domain::{CommissionRecord, Order, TimeMs};
use crate::engine::{CalculationError, CommissionCalculator};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    /// The ledger write failed. Nothing was persisted for this order (writes
    /// are all-or-nothing), so the caller may retry safely.
    #[error("ledger write failed: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Result of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// False when the order already had ledger rows and nothing was written.
    pub generated: bool,
    pub records: Vec<CommissionRecord>,
}

/// Runs the full commission pipeline for completed orders.
pub struct CommissionGenerator {
    repo: Arc<Repository>,
    calculator: CommissionCalculator,
}

impl CommissionGenerator {
    pub fn new(repo: Arc<Repository>, max_upline_depth: u8) -> Self {
        let calculator = CommissionCalculator::new(repo.clone(), repo.clone(), max_upline_depth);
        Self { repo, calculator }
    }

    /// Generate and persist commissions for `order`.
    ///
    /// Idempotent: an order that already has ledger rows returns them
    /// unchanged with `generated: false`. An order whose line items all fail
    /// to resolve a template succeeds with an empty record set.
    pub async fn generate_for_order(
        &self,
        order: &Order,
    ) -> Result<GenerationOutcome, GenerationError> {
        if self.repo.order_has_commissions(&order.id).await? {
            info!(order_id = %order.id, "commissions already generated, treating redelivery as no-op");
            let records = self.repo.get_order_commissions(&order.id).await?;
            return Ok(GenerationOutcome {
                generated: false,
                records,
            });
        }

        let drafts = self.calculator.calculate(order).await?;
        if drafts.is_empty() {
            warn!(order_id = %order.id, "order produced no commission drafts");
            return Ok(GenerationOutcome {
                generated: true,
                records: Vec::new(),
            });
        }

        let inserted = self
            .repo
            .insert_drafts_atomic(&drafts, TimeMs::now())
            .await?;
        info!(
            order_id = %order.id,
            drafts = drafts.len(),
            inserted,
            "commission records persisted"
        );

        let records = self.repo.get_order_commissions(&order.id).await?;
        Ok(GenerationOutcome {
            generated: true,
            records,
        })
    }
}
