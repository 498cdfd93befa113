//! Commission template model: templates, per-level rules, and time-window
//! overrides.
//!
//! Level types are decoded into a tagged enum once, when a template is loaded
//! from the store; rule matching never re-parses strings.

use crate::domain::{Decimal, ProductId, TemplateId, TimeMs};
use serde::{Deserialize, Serialize};

/// Which rung of the referral ladder a rule pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionLevel {
    /// The buyer themself (level 0).
    Direct,
    /// The Nth-degree upline referrer (N >= 1).
    Upline(u8),
    /// The product's partner company.
    PartnerCompany,
}

impl CommissionLevel {
    /// Decode a stored level type string ("direct", "upline_3",
    /// "partner_company"). Returns None for anything else.
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(CommissionLevel::Direct),
            "partner_company" => Some(CommissionLevel::PartnerCompany),
            _ => {
                let n = s.strip_prefix("upline_")?.parse::<u8>().ok()?;
                (n >= 1).then_some(CommissionLevel::Upline(n))
            }
        }
    }

    /// Canonical stored form.
    pub fn encode(&self) -> String {
        match self {
            CommissionLevel::Direct => "direct".to_string(),
            CommissionLevel::Upline(n) => format!("upline_{}", n),
            CommissionLevel::PartnerCompany => "partner_company".to_string(),
        }
    }

    /// Depth in the referral chain this rule targets, where applicable.
    /// Partner company rules are not positioned on the chain.
    pub fn chain_depth(&self) -> Option<u8> {
        match self {
            CommissionLevel::Direct => Some(0),
            CommissionLevel::Upline(n) => Some(*n),
            CommissionLevel::PartnerCompany => None,
        }
    }
}

impl std::fmt::Display for CommissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Buyer classification a rule is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Regular,
    Vip,
    Wholesale,
    /// Applies to every buyer; loses to a type-specific rule for the same level.
    All,
}

impl CustomerType {
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(CustomerType::Regular),
            "vip" => Some(CustomerType::Vip),
            "wholesale" => Some(CustomerType::Wholesale),
            "all" => Some(CustomerType::All),
            _ => None,
        }
    }

    pub fn encode(&self) -> &'static str {
        match self {
            CustomerType::Regular => "regular",
            CustomerType::Vip => "vip",
            CustomerType::Wholesale => "wholesale",
            CustomerType::All => "all",
        }
    }
}

/// How a rule's value is applied to a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionKind {
    /// `value` percent of the line item total (unit price x quantity).
    Percentage,
    /// `value` flat; does not scale with quantity or item total.
    Fixed,
}

impl CommissionKind {
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(CommissionKind::Percentage),
            "fixed" => Some(CommissionKind::Fixed),
            _ => None,
        }
    }

    pub fn encode(&self) -> &'static str {
        match self {
            CommissionKind::Percentage => "percentage",
            CommissionKind::Fixed => "fixed",
        }
    }
}

/// Template availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Active,
    Inactive,
}

impl TemplateStatus {
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TemplateStatus::Active),
            "inactive" => Some(TemplateStatus::Inactive),
            _ => None,
        }
    }

    pub fn encode(&self) -> &'static str {
        match self {
            TemplateStatus::Active => "active",
            TemplateStatus::Inactive => "inactive",
        }
    }
}

/// One payout rule row of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub level: CommissionLevel,
    pub customer_type: CustomerType,
    pub kind: CommissionKind,
    pub value: Decimal,
}

/// A named ruleset attached to products, directly or via a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTemplate {
    pub id: TemplateId,
    pub template_code: String,
    pub template_name: String,
    pub status: TemplateStatus,
    /// Rules in template order; order is the final tie-break for duplicates.
    pub rules: Vec<CommissionRule>,
}

impl CommissionTemplate {
    /// Rules that apply to a buyer of the given type, at most one per level.
    ///
    /// A rule applies when its customer type equals the buyer's or is `All`.
    /// When both target the same level, the type-specific rule wins; among
    /// equal-specificity duplicates the first in template order wins.
    pub fn effective_rules(&self, buyer_type: CustomerType) -> Vec<&CommissionRule> {
        let mut selected: Vec<&CommissionRule> = Vec::new();

        for rule in &self.rules {
            if rule.customer_type != buyer_type && rule.customer_type != CustomerType::All {
                continue;
            }

            match selected.iter().position(|r| r.level == rule.level) {
                Some(i) => {
                    let held = selected[i];
                    if held.customer_type == CustomerType::All
                        && rule.customer_type != CustomerType::All
                    {
                        selected[i] = rule;
                    }
                }
                None => selected.push(rule),
            }
        }

        selected
    }
}

/// A time-bounded template override for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowOverride {
    pub id: i64,
    pub product_id: ProductId,
    pub template_id: TemplateId,
    pub start_ms: TimeMs,
    pub end_ms: TimeMs,
    pub priority: i32,
    pub status: TemplateStatus,
    pub created_ms: TimeMs,
}

impl TimeWindowOverride {
    /// True when the override covers `at` and is active. Both window bounds
    /// are inclusive.
    pub fn covers(&self, at: TimeMs) -> bool {
        self.status == TemplateStatus::Active && self.start_ms <= at && at <= self.end_ms
    }
}
