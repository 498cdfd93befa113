//! Core domain types for the commission engine.

pub mod commission;
pub mod decimal;
pub mod order;
pub mod primitives;
pub mod template;

pub use commission::{
    Beneficiary, BeneficiaryType, CommissionDraft, CommissionRecord, CommissionStatus,
};
pub use decimal::Decimal;
pub use order::{LineItem, Order, Product, User};
pub use primitives::{CompanyId, OrderId, ProductId, TemplateId, TimeMs, UserId};
pub use template::{
    CommissionKind, CommissionLevel, CommissionRule, CommissionTemplate, CustomerType,
    TemplateStatus, TimeWindowOverride,
};
