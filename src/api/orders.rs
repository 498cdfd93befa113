use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::commissions::CommissionRecordDto;
use crate::api::AppState;
use crate::domain::Order;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// False when this was a redelivery and the existing records are returned.
    pub generated: bool,
    pub record_count: usize,
    pub records: Vec<CommissionRecordDto>,
}

/// Generate commissions for a completed order.
///
/// Idempotent: redelivering the same order returns the existing records.
/// This endpoint is called by the order-completion handler after the order
/// itself is already confirmed; an error here never unwinds the order.
pub async fn generate_commissions(
    State(state): State<AppState>,
    Json(order): Json<Order>,
) -> Result<Json<GenerateResponse>, AppError> {
    validate_order(&order)?;

    let outcome = state.generator.generate_for_order(&order).await?;

    Ok(Json(GenerateResponse {
        generated: outcome.generated,
        record_count: outcome.records.len(),
        records: outcome.records.iter().map(Into::into).collect(),
    }))
}

fn validate_order(order: &Order) -> Result<(), AppError> {
    if order.id.as_str().trim().is_empty() {
        return Err(AppError::BadRequest("order id must not be empty".to_string()));
    }
    if order.buyer_id.as_str().trim().is_empty() {
        return Err(AppError::BadRequest("buyerId must not be empty".to_string()));
    }
    for (i, item) in order.line_items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(AppError::BadRequest(format!(
                "lineItems[{}].quantity must be >= 1",
                i
            )));
        }
        if item.unit_price < crate::domain::Decimal::zero() {
            return Err(AppError::BadRequest(format!(
                "lineItems[{}].unitPrice must not be negative",
                i
            )));
        }
    }
    Ok(())
}
