//! Commission ledger operations: atomic draft persistence, beneficiary
//! summaries, and guarded status transitions.

use crate::domain::{
    BeneficiaryType, CommissionDraft, CommissionKind, CommissionLevel, CommissionRecord,
    CommissionStatus, Decimal, OrderId, ProductId, TemplateId, TimeMs,
};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::{Repository, UserCommissionSummary};

/// Optional filters for a beneficiary's commission summary.
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub status: Option<CommissionStatus>,
    pub from_ms: Option<TimeMs>,
    pub to_ms: Option<TimeMs>,
}

impl Repository {
    // =========================================================================
    // Ledger writes
    // =========================================================================

    /// Persist all drafts for an order in a single transaction.
    ///
    /// All-or-nothing: a failure rolls the whole batch back, so the caller
    /// never observes a partially written order. Rows whose entry_key already
    /// exists are left untouched, which makes a redelivered generation run a
    /// no-op. Returns the number of newly inserted rows.
    pub async fn insert_drafts_atomic(
        &self,
        drafts: &[CommissionDraft],
        created_ms: TimeMs,
    ) -> Result<usize, sqlx::Error> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0usize;
        let mut tx = self.pool().begin().await?;

        for draft in drafts {
            let result = sqlx::query(
                r#"
                INSERT INTO commission_ledger
                (entry_key, order_id, line_index, product_id, beneficiary_id, beneficiary_type,
                 level_type, commission_kind, commission_rate, commission_amount, status,
                 applied_template_id, created_ms)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
                ON CONFLICT(entry_key) DO NOTHING
                "#,
            )
            .bind(draft.entry_key())
            .bind(draft.order_id.as_str())
            .bind(draft.line_index as i64)
            .bind(draft.product_id.as_str())
            .bind(&draft.beneficiary_id)
            .bind(draft.beneficiary_type.encode())
            .bind(draft.level.encode())
            .bind(draft.kind.encode())
            .bind(draft.rate.to_canonical_string())
            .bind(draft.amount.to_canonical_string())
            .bind(draft.applied_template_id.as_i64())
            .bind(created_ms.as_i64())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    // =========================================================================
    // Ledger reads
    // =========================================================================

    /// True when the order already has commission rows (duplicate-generation
    /// guard).
    pub async fn order_has_commissions(&self, order_id: &OrderId) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM commission_ledger WHERE order_id = ?")
            .bind(order_id.as_str())
            .fetch_one(self.pool())
            .await?;

        Ok(row.get::<i64, _>("n") > 0)
    }

    /// All ledger rows for an order, in deterministic order.
    pub async fn get_order_commissions(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<CommissionRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_key, order_id, line_index, product_id, beneficiary_id,
                   beneficiary_type, level_type, commission_kind, commission_rate,
                   commission_amount, status, applied_template_id, created_ms, paid_ms
            FROM commission_ledger
            WHERE order_id = ?
            ORDER BY line_index ASC, id ASC
            "#,
        )
        .bind(order_id.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().filter_map(record_from_row).collect())
    }

    /// Aggregate one beneficiary's commissions, grouped by status.
    ///
    /// Totals are summed in Rust over `Decimal`; SQLite's SUM aggregate
    /// returns REAL and would lose precision for money.
    pub async fn user_commission_summary(
        &self,
        beneficiary_id: &str,
        filter: &SummaryFilter,
    ) -> Result<UserCommissionSummary, sqlx::Error> {
        let mut sql = String::from(
            r#"
            SELECT id, entry_key, order_id, line_index, product_id, beneficiary_id,
                   beneficiary_type, level_type, commission_kind, commission_rate,
                   commission_amount, status, applied_template_id, created_ms, paid_ms
            FROM commission_ledger
            WHERE beneficiary_id = ?
            "#,
        );
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.from_ms.is_some() {
            sql.push_str(" AND created_ms >= ?");
        }
        if filter.to_ms.is_some() {
            sql.push_str(" AND created_ms <= ?");
        }
        sql.push_str(" ORDER BY created_ms ASC, id ASC");

        let mut query = sqlx::query(&sql).bind(beneficiary_id);
        if let Some(status) = filter.status {
            query = query.bind(status.encode());
        }
        if let Some(from) = filter.from_ms {
            query = query.bind(from.as_i64());
        }
        if let Some(to) = filter.to_ms {
            query = query.bind(to.as_i64());
        }

        let rows = query.fetch_all(self.pool()).await?;
        let commissions: Vec<CommissionRecord> = rows.iter().filter_map(record_from_row).collect();

        let mut total_pending = Decimal::zero();
        let mut total_approved = Decimal::zero();
        let mut total_paid = Decimal::zero();
        for record in &commissions {
            match record.status {
                CommissionStatus::Pending => total_pending = total_pending + record.amount,
                CommissionStatus::Approved => total_approved = total_approved + record.amount,
                CommissionStatus::Paid => total_paid = total_paid + record.amount,
            }
        }

        Ok(UserCommissionSummary {
            total_pending,
            total_approved,
            total_paid,
            commissions,
        })
    }

    /// Fetch ledger rows by id, in id order.
    pub async fn get_commissions_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<CommissionRecord>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT id, entry_key, order_id, line_index, product_id, beneficiary_id,
                   beneficiary_type, level_type, commission_kind, commission_rate,
                   commission_amount, status, applied_template_id, created_ms, paid_ms
            FROM commission_ledger
            WHERE id IN ({})
            ORDER BY id ASC
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows.iter().filter_map(record_from_row).collect())
    }

    // =========================================================================
    // Status transitions (forward-only)
    // =========================================================================

    /// Batch transition pending -> approved.
    ///
    /// Guarded: rows not currently pending are untouched, so re-approving is
    /// a no-op and a paid row can never move backwards. Returns the number of
    /// rows transitioned.
    pub async fn approve_commissions(&self, ids: &[i64]) -> Result<u64, sqlx::Error> {
        self.transition(ids, CommissionStatus::Pending, CommissionStatus::Approved, None)
            .await
    }

    /// Batch transition approved -> paid, stamping `paid_ms`.
    pub async fn mark_commissions_paid(
        &self,
        ids: &[i64],
        paid_ms: TimeMs,
    ) -> Result<u64, sqlx::Error> {
        self.transition(
            ids,
            CommissionStatus::Approved,
            CommissionStatus::Paid,
            Some(paid_ms),
        )
        .await
    }

    async fn transition(
        &self,
        ids: &[i64],
        from: CommissionStatus,
        to: CommissionStatus,
        paid_ms: Option<TimeMs>,
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE commission_ledger SET status = ?, paid_ms = COALESCE(?, paid_ms) WHERE status = ? AND id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql)
            .bind(to.encode())
            .bind(paid_ms.map(|t| t.as_i64()))
            .bind(from.encode());
        for id in ids {
            query = query.bind(id);
        }

        let result = query.execute(self.pool()).await?;
        Ok(result.rows_affected())
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<CommissionRecord> {
    let id: i64 = row.get("id");

    let level_str: String = row.get("level_type");
    let Some(level) = CommissionLevel::decode(&level_str) else {
        warn!(ledger_id = id, level_type = %level_str, "corrupt ledger row, skipping");
        return None;
    };
    let kind_str: String = row.get("commission_kind");
    let Some(kind) = CommissionKind::decode(&kind_str) else {
        warn!(ledger_id = id, commission_kind = %kind_str, "corrupt ledger row, skipping");
        return None;
    };
    let beneficiary_type_str: String = row.get("beneficiary_type");
    let Some(beneficiary_type) = BeneficiaryType::decode(&beneficiary_type_str) else {
        warn!(ledger_id = id, beneficiary_type = %beneficiary_type_str, "corrupt ledger row, skipping");
        return None;
    };
    let status_str: String = row.get("status");
    let Some(status) = CommissionStatus::decode(&status_str) else {
        warn!(ledger_id = id, status = %status_str, "corrupt ledger row, skipping");
        return None;
    };

    let rate_str: String = row.get("commission_rate");
    let rate = Decimal::from_str(&rate_str).unwrap_or_else(|e| {
        warn!(ledger_id = id, commission_rate = %rate_str, error = %e, "unparseable rate, using default");
        Decimal::default()
    });
    let amount_str: String = row.get("commission_amount");
    let amount = Decimal::from_str(&amount_str).unwrap_or_else(|e| {
        warn!(ledger_id = id, commission_amount = %amount_str, error = %e, "unparseable amount, using default");
        Decimal::default()
    });

    Some(CommissionRecord {
        id,
        entry_key: row.get("entry_key"),
        order_id: OrderId::new(row.get::<String, _>("order_id")),
        line_index: row.get::<i64, _>("line_index") as u32,
        product_id: ProductId::new(row.get::<String, _>("product_id")),
        beneficiary_id: row.get("beneficiary_id"),
        beneficiary_type,
        level,
        kind,
        rate,
        amount,
        status,
        applied_template_id: TemplateId::new(row.get("applied_template_id")),
        created_ms: TimeMs::new(row.get("created_ms")),
        paid_ms: row.get::<Option<i64>, _>("paid_ms").map(TimeMs::new),
    })
}
