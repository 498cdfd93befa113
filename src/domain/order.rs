//! Order input model.
//!
//! Orders are produced by the host order-placement pipeline; this engine
//! consumes them as read-only facts and never mutates or vetoes them.

use crate::domain::{Decimal, OrderId, ProductId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// One purchased product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// Line total: unit price x quantity. Fixed-amount rules ignore this.
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity as i64)
    }
}

/// A completed order, as delivered by the order-confirmation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    /// Transaction time; the reference instant for override resolution.
    pub placed_ms: TimeMs,
    pub line_items: Vec<LineItem>,
}

/// A platform member in the referral graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub customer_type: crate::domain::CustomerType,
    /// Referrer link; acyclic by business rule, never trusted by the tracer.
    pub upline_id: Option<UserId>,
}

/// A catalog product, reduced to what commission resolution needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub default_template_id: Option<crate::domain::TemplateId>,
    pub partner_company_id: Option<crate::domain::CompanyId>,
}
