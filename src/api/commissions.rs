use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::db::SummaryFilter;
use crate::domain::{CommissionRecord, CommissionStatus, TimeMs};
use crate::error::AppError;

/// Ledger row as exposed over HTTP. Monetary fields are canonical decimal
/// strings to keep clients away from float parsing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRecordDto {
    pub id: i64,
    pub order_id: String,
    pub line_index: u32,
    pub product_id: String,
    pub beneficiary_id: String,
    pub beneficiary_type: String,
    pub level_type: String,
    pub commission_kind: String,
    pub rate: String,
    pub amount: String,
    pub status: String,
    pub applied_template_id: i64,
    pub created_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_ms: Option<i64>,
}

impl From<&CommissionRecord> for CommissionRecordDto {
    fn from(r: &CommissionRecord) -> Self {
        CommissionRecordDto {
            id: r.id,
            order_id: r.order_id.as_str().to_string(),
            line_index: r.line_index,
            product_id: r.product_id.as_str().to_string(),
            beneficiary_id: r.beneficiary_id.clone(),
            beneficiary_type: r.beneficiary_type.encode().to_string(),
            level_type: r.level.encode(),
            commission_kind: r.kind.encode().to_string(),
            rate: r.rate.to_canonical_string(),
            amount: r.amount.to_canonical_string(),
            status: r.status.encode().to_string(),
            applied_template_id: r.applied_template_id.as_i64(),
            created_ms: r.created_ms.as_i64(),
            paid_ms: r.paid_ms.map(|t| t.as_i64()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub user: String,
    pub status: Option<String>,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub user: String,
    pub total_pending: String,
    pub total_approved: String,
    pub total_paid: String,
    pub commission_count: usize,
    pub commissions: Vec<CommissionRecordDto>,
}

pub async fn get_summary(
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let user = params.user.trim().to_string();
    if user.is_empty() {
        return Err(AppError::BadRequest("user must not be empty".to_string()));
    }

    let status = params
        .status
        .as_deref()
        .map(|s| {
            CommissionStatus::decode(s)
                .ok_or_else(|| AppError::BadRequest(format!("invalid status: {}", s)))
        })
        .transpose()?;

    if let (Some(from), Some(to)) = (params.from_ms, params.to_ms) {
        if from > to {
            return Err(AppError::BadRequest("fromMs must be <= toMs".to_string()));
        }
    }

    let filter = SummaryFilter {
        status,
        from_ms: params.from_ms.map(TimeMs::new),
        to_ms: params.to_ms.map(TimeMs::new),
    };

    let summary = state.repo.user_commission_summary(&user, &filter).await?;

    Ok(Json(SummaryResponse {
        user,
        total_pending: summary.total_pending.to_canonical_string(),
        total_approved: summary.total_approved.to_canonical_string(),
        total_paid: summary.total_paid.to_canonical_string(),
        commission_count: summary.commissions.len(),
        commissions: summary.commissions.iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    /// Rows actually transitioned; rows already past the source status are
    /// skipped, not errors.
    pub updated: u64,
    pub records: Vec<CommissionRecordDto>,
}

pub async fn approve(
    State(state): State<AppState>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }

    let updated = state.repo.approve_commissions(&req.ids).await?;
    let records = state.repo.get_commissions_by_ids(&req.ids).await?;

    Ok(Json(TransitionResponse {
        updated,
        records: records.iter().map(Into::into).collect(),
    }))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }

    let updated = state
        .repo
        .mark_commissions_paid(&req.ids, TimeMs::now())
        .await?;
    let records = state.repo.get_commissions_by_ids(&req.ids).await?;

    Ok(Json(TransitionResponse {
        updated,
        records: records.iter().map(Into::into).collect(),
    }))
}
