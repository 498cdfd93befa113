//! Commission ledger model: beneficiaries, drafts, and persisted records.

use crate::domain::{
    CommissionKind, CommissionLevel, Decimal, OrderId, ProductId, TemplateId, TimeMs, UserId,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One rung of the buyer's referral chain, produced by the tracer.
///
/// Ephemeral: never persisted. Level 0 is always the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub user_id: UserId,
    pub level: u8,
}

/// Who a ledger entry pays out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeneficiaryType {
    User,
    Company,
}

impl BeneficiaryType {
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "user" => Some(BeneficiaryType::User),
            "company" => Some(BeneficiaryType::Company),
            _ => None,
        }
    }

    pub fn encode(&self) -> &'static str {
        match self {
            BeneficiaryType::User => "user",
            BeneficiaryType::Company => "company",
        }
    }
}

/// Ledger entry lifecycle. Forward-only: pending -> approved -> paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
}

impl CommissionStatus {
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CommissionStatus::Pending),
            "approved" => Some(CommissionStatus::Approved),
            "paid" => Some(CommissionStatus::Paid),
            _ => None,
        }
    }

    pub fn encode(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Paid => "paid",
        }
    }
}

/// An unsaved commission computed by the calculator.
///
/// The amount is already rounded to currency precision; emitting a draft is
/// the persistence boundary for rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionDraft {
    pub order_id: OrderId,
    pub line_index: u32,
    pub product_id: ProductId,
    pub beneficiary_id: String,
    pub beneficiary_type: BeneficiaryType,
    pub level: CommissionLevel,
    pub kind: CommissionKind,
    /// The rule value: a percentage for percentage rules, the flat amount
    /// for fixed rules.
    pub rate: Decimal,
    pub amount: Decimal,
    pub applied_template_id: TemplateId,
}

impl CommissionDraft {
    /// Content-derived idempotency key. Two generation runs over the same
    /// order produce the same keys, so redelivered webhooks collapse onto the
    /// existing rows via the ledger's unique index.
    pub fn entry_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.order_id.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.line_index.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.beneficiary_id.as_bytes());
        hasher.update(b"|");
        hasher.update(self.level.encode().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A persisted ledger row. Mutated only by approve/pay, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRecord {
    pub id: i64,
    pub entry_key: String,
    pub order_id: OrderId,
    pub line_index: u32,
    pub product_id: ProductId,
    pub beneficiary_id: String,
    pub beneficiary_type: BeneficiaryType,
    pub level: CommissionLevel,
    pub kind: CommissionKind,
    pub rate: Decimal,
    pub amount: Decimal,
    pub status: CommissionStatus,
    pub applied_template_id: TemplateId,
    pub created_ms: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_ms: Option<TimeMs>,
}
